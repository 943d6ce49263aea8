/// Archive normalization.
///
/// Turns the raw export into per-chat, chronologically ordered message
/// timelines: resolves text shape, sender identity, outgoing classification,
/// media flags and the best-known display name of every chat.
use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info};

use crate::archive::{RawArchive, RawChat, RawMessage, RecordKind};
use crate::error::{ArchiveError, Result};
use crate::progress::ScanObserver;

/// What to do with messages that carry media.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MediaPolicy {
    /// Keep them with `is_media = true`: counted, but left out of the median length.
    #[default]
    KeepFlagged,
    /// Drop them from the chat entirely.
    Exclude,
}

/// What to do with records that are neither `message` nor `service`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownRecordPolicy {
    #[default]
    Skip,
    /// Emit them with no sender identity.
    Keep,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizerConfig {
    pub media: MediaPolicy,
    pub unknown_records: UnknownRecordPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMessage {
    pub text: String,
    pub date: DateTime<Utc>,
    pub is_outgoing: bool,
    pub is_media: bool,
    pub has_actionables: bool,
}

/// One chat after normalization, messages sorted by date.
#[derive(Debug, Clone)]
pub struct ChatTimeline {
    pub key: String,
    pub raw_name: Option<String>,
    pub display_name: String,
    pub messages: Vec<NormalizedMessage>,
}

#[derive(Debug, Clone)]
pub struct NormalizedArchive {
    pub owner_name: String,
    /// Latest message instant seen anywhere in the archive.
    pub archive_as_of: Option<DateTime<Utc>>,
    /// Keyed by chat key, in archive order.
    pub chats: IndexMap<String, ChatTimeline>,
}

/// One item of a structured text run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    /// Link, mention, hashtag and the like. Only the display text is kept.
    Actionable { kind: String, text: String },
}

/// Shape of a message's `text` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextBody {
    Plain(String),
    Structured(Vec<Fragment>),
}

impl Fragment {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Fragment::Text(s.clone())),
            Value::Object(obj) => {
                let text = obj.get("text")?.as_str()?;
                let kind = obj
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                Some(Fragment::Actionable {
                    kind: kind.to_string(),
                    text: text.to_string(),
                })
            }
            _ => None,
        }
    }

    fn text(&self) -> &str {
        match self {
            Fragment::Text(text) => text,
            Fragment::Actionable { text, .. } => text,
        }
    }
}

impl TextBody {
    /// Classifies a raw `text` value. A missing (null) value is an empty plain string.
    pub fn from_value(value: &Value) -> std::result::Result<Self, String> {
        match value {
            Value::Null => Ok(TextBody::Plain(String::new())),
            Value::String(s) => Ok(TextBody::Plain(s.clone())),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(pos, item)| {
                    Fragment::from_value(item)
                        .ok_or_else(|| format!("unrecognized text fragment at position {}", pos))
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(TextBody::Structured),
            Value::Bool(_) => Err("unrecognized text shape: boolean".to_string()),
            Value::Number(_) => Err("unrecognized text shape: number".to_string()),
            Value::Object(_) => Err("unrecognized text shape: object".to_string()),
        }
    }

    /// Flattens to `(text, has_actionables)`.
    pub fn resolve(self) -> (String, bool) {
        match self {
            TextBody::Plain(text) => (text, false),
            TextBody::Structured(fragments) => {
                let text = fragments.iter().map(Fragment::text).collect::<String>();
                (text, true)
            }
        }
    }
}

/// Parses an export timestamp. Timestamps without an offset are taken as UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// One promotion step: a sender whose first word is the whole current name,
/// and who is longer, replaces it. Never shortens.
pub fn promote(current: String, sender: &str) -> String {
    let first_word = sender.split_whitespace().next();
    if first_word == Some(current.as_str()) && sender.chars().count() > current.chars().count() {
        sender.to_string()
    } else {
        current
    }
}

/// Final display name of a chat: a left fold of [`promote`] over its incoming senders.
pub fn resolve_display_name<'a>(
    initial: String,
    messages: impl IntoIterator<Item = &'a RawMessage>,
    owner_name: &str,
) -> String {
    messages
        .into_iter()
        .filter_map(RawMessage::sender)
        .filter(|sender| *sender != owner_name)
        .fold(initial, promote)
}

fn malformed(chat: &str, index: usize, reason: String) -> ArchiveError {
    ArchiveError::MalformedRecord {
        chat: chat.to_string(),
        index,
        reason,
    }
}

/// Validates and converts one raw record. Returns `None` for records the policy drops.
fn normalize_message(
    raw: &RawMessage,
    chat_label: &str,
    index: usize,
    owner_name: &str,
    config: &NormalizerConfig,
) -> Result<(DateTime<Utc>, Option<NormalizedMessage>)> {
    let raw_date = match &raw.date {
        Value::String(s) => s.as_str(),
        Value::Null => return Err(malformed(chat_label, index, "missing date".to_string())),
        _ => {
            return Err(malformed(
                chat_label,
                index,
                "unrecognized date shape".to_string(),
            ))
        }
    };
    let date = parse_date(raw_date).ok_or_else(|| {
        malformed(
            chat_label,
            index,
            format!("unparseable date '{}'", raw_date),
        )
    })?;
    let body =
        TextBody::from_value(&raw.text).map_err(|reason| malformed(chat_label, index, reason))?;
    if raw.has_malformed_sender() {
        return Err(malformed(
            chat_label,
            index,
            "unrecognized sender shape".to_string(),
        ));
    }

    if raw.kind == RecordKind::Other && config.unknown_records == UnknownRecordPolicy::Skip {
        return Ok((date, None));
    }

    let is_media = raw.has_media();
    if is_media && config.media == MediaPolicy::Exclude {
        return Ok((date, None));
    }

    let (text, has_actionables) = body.resolve();
    let message = NormalizedMessage {
        text,
        date,
        is_outgoing: raw.sender() == Some(owner_name),
        is_media,
        has_actionables,
    };
    Ok((date, Some(message)))
}

/// Scans one chat. Returns its final display name, its sorted messages and
/// the latest instant among all of its records.
fn normalize_chat(
    raw: &RawChat,
    initial_name: String,
    owner_name: &str,
    config: &NormalizerConfig,
) -> Result<(String, Vec<NormalizedMessage>, Option<DateTime<Utc>>)> {
    let mut messages = Vec::with_capacity(raw.messages.len());
    let mut latest: Option<DateTime<Utc>> = None;

    for (index, raw_message) in raw.messages.iter().enumerate() {
        let (date, message) =
            normalize_message(raw_message, &initial_name, index, owner_name, config)?;
        latest = Some(latest.map_or(date, |seen| seen.max(date)));
        if let Some(message) = message {
            messages.push(message);
        }
    }

    // Export order is not guaranteed to be chronological
    messages.sort_by_key(|m| m.date);

    let display_name = resolve_display_name(initial_name, &raw.messages, owner_name);
    Ok((display_name, messages, latest))
}

/// Normalizes the whole archive. Any malformed record aborts the run.
pub fn normalize(
    archive: &RawArchive,
    config: &NormalizerConfig,
    observer: &mut dyn ScanObserver,
) -> Result<NormalizedArchive> {
    let owner_name = archive.owner_full_name()?;
    let total = archive.chats.list.len();
    let mut chats: IndexMap<String, ChatTimeline> = IndexMap::with_capacity(total);
    let mut archive_as_of: Option<DateTime<Utc>> = None;
    let mut deleted_accounts = 0;

    for (position, raw_chat) in archive.chats.list.iter().enumerate() {
        let initial_name = match raw_chat.name.as_deref() {
            Some(name) => name.to_string(),
            None => {
                deleted_accounts += 1;
                format!("Deleted account {}", deleted_accounts)
            }
        };

        let base_key = raw_chat.id_key().unwrap_or_else(|| initial_name.clone());
        let mut key = base_key.clone();
        let mut suffix = position + 1;
        // A suffixed key may already belong to a chat literally named that way
        while chats.contains_key(&key) {
            key = format!("{}#{}", base_key, suffix);
            suffix += 1;
        }
        if key != base_key {
            debug!(chat_key = %key, "Chat key collision, disambiguated by position");
        }

        let (display_name, messages, latest) =
            normalize_chat(raw_chat, initial_name, &owner_name, config)?;

        if let Some(ts) = latest {
            archive_as_of = Some(archive_as_of.map_or(ts, |seen| seen.max(ts)));
        }

        debug!(
            chat_key = %key,
            display_name = %display_name,
            messages = messages.len(),
            "Normalized chat"
        );
        observer.chat_scanned(position + 1, total, &display_name);

        chats.insert(
            key.clone(),
            ChatTimeline {
                key,
                raw_name: raw_chat.name.clone(),
                display_name,
                messages,
            },
        );
    }
    observer.finish();

    info!(
        owner = %owner_name,
        chats = chats.len(),
        "Archive normalized"
    );

    Ok(NormalizedArchive {
        owner_name,
        archive_as_of,
        chats,
    })
}
