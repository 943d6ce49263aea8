/// Raw chat-export archive as it appears on disk.
///
/// Only the parts of the export the analysis reads are modeled. Fields whose
/// shape is validated during normalization (`date`, `text`, profile names) are
/// kept loosely typed so that problems surface as [`ArchiveError`] values that
/// name the offending chat and message.
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::error::ArchiveError;

/// Keys whose presence on a message marks it as carrying media.
pub const MEDIA_KEYS: &[&str] = &["photo", "file", "media_type", "mime_type", "sticker_emoji"];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawArchive {
    #[serde(default)]
    pub personal_information: Option<PersonalInformation>,
    #[serde(default)]
    pub chats: ChatList,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PersonalInformation {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatList {
    #[serde(default)]
    pub list: Vec<RawChat>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawChat {
    /// Absent (or null) for chats with deleted accounts.
    #[serde(default)]
    pub name: Option<String>,
    /// Usually an integer; strings are accepted too.
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub messages: Vec<RawMessage>,
}

/// Record discriminant. Anything other than `message` or `service` maps to `Other`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Message,
    Service,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawMessage {
    #[serde(rename = "type", default)]
    pub kind: RecordKind,
    /// Null for deleted accounts.
    #[serde(default)]
    pub from: Value,
    #[serde(default)]
    pub actor: Value,
    #[serde(default)]
    pub date: Value,
    /// Plain string or a list of strings / fragment objects. Missing means empty.
    #[serde(default)]
    pub text: Value,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl RawArchive {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read archive file: {}", path.display()))?;

        Self::from_json_str(&content)
            .with_context(|| format!("Failed to parse JSON from: {}", path.display()))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let archive: RawArchive = serde_json::from_str(content)?;
        Ok(archive)
    }

    /// Owner's full name: first name, plus a space and the last name when it is non-empty.
    pub fn owner_full_name(&self) -> Result<String, ArchiveError> {
        let info = self
            .personal_information
            .as_ref()
            .ok_or(ArchiveError::MissingProfileField {
                field: "first_name",
            })?;
        let first = info
            .first_name
            .as_deref()
            .ok_or(ArchiveError::MissingProfileField {
                field: "first_name",
            })?;

        match info.last_name.as_deref() {
            Some(last) if !last.is_empty() => Ok(format!("{} {}", first, last)),
            _ => Ok(first.to_string()),
        }
    }
}

impl RawChat {
    /// Stable key from `id`: integers and strings qualify, anything else does not.
    pub fn id_key(&self) -> Option<String> {
        match &self.id {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl RawMessage {
    fn sender_field(&self) -> Option<&Value> {
        match self.kind {
            RecordKind::Message => Some(&self.from),
            RecordKind::Service => Some(&self.actor),
            RecordKind::Other => None,
        }
    }

    /// Sender identity: `from` for messages, `actor` for service events, nothing otherwise.
    pub fn sender(&self) -> Option<&str> {
        self.sender_field().and_then(Value::as_str)
    }

    /// True when the sender field holds something other than a string or null.
    pub fn has_malformed_sender(&self) -> bool {
        self.sender_field()
            .is_some_and(|v| !v.is_null() && !v.is_string())
    }

    pub fn has_media(&self) -> bool {
        MEDIA_KEYS.iter().any(|key| self.extra.contains_key(*key))
    }
}
