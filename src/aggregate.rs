/// Statistics aggregation.
///
/// Folds normalized chat timelines into per-chat statistics and a global
/// total, then ranks chats by volume. Pure over its inputs: re-running with
/// the same configuration yields identical results, so callers can vary
/// `top_n` or the exclusion set without re-parsing the archive.
use chrono::{DateTime, Duration, TimeZone, Utc};
use indexmap::IndexSet;
use tracing::{debug, info, warn};

use crate::normalize::{ChatTimeline, NormalizedArchive, NormalizedMessage};
use crate::report::{ChatStats, GlobalStats, Report, TimeBucket, Warning, SCHEMA_VERSION};

pub const DEFAULT_TOP_N: usize = 30;

/// Width of one time bucket.
pub const BUCKET_WIDTH_DAYS: i64 = 30;

/// 2013-08-14T00:00:00Z, the public launch of Telegram.
const DEFAULT_BUCKET_ANCHOR_TS: i64 = 1_376_438_400;

pub fn default_bucket_anchor() -> DateTime<Utc> {
    Utc.timestamp_opt(DEFAULT_BUCKET_ANCHOR_TS, 0)
        .single()
        .unwrap_or_default()
}

/// Aggregation parameters. Construct a fresh value per run.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateConfig {
    /// Maximum number of ranked chats in the output.
    pub top_n: usize,
    /// Chat keys or names to leave out of both the ranking and the totals.
    pub exclude_chats: IndexSet<String>,
    /// Whether to build per-chat time-bucket histograms.
    pub timebuckets: bool,
    /// Start of the first bucket. Messages before it are not binned.
    pub bucket_anchor: DateTime<Utc>,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            exclude_chats: IndexSet::new(),
            timebuckets: false,
            bucket_anchor: default_bucket_anchor(),
        }
    }
}

impl AggregateConfig {
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn excluding<I, S>(mut self, chats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_chats.extend(chats.into_iter().map(Into::into));
        self
    }

    pub fn with_timebuckets(mut self, enabled: bool) -> Self {
        self.timebuckets = enabled;
        self
    }

    pub fn with_bucket_anchor(mut self, anchor: DateTime<Utc>) -> Self {
        self.bucket_anchor = anchor;
        self
    }

    /// A chat is excluded when its key, raw name or display name is listed.
    fn is_excluded(&self, chat: &ChatTimeline) -> bool {
        self.exclude_chats.contains(&chat.key)
            || self.exclude_chats.contains(&chat.display_name)
            || chat
                .raw_name
                .as_ref()
                .is_some_and(|name| self.exclude_chats.contains(name))
    }
}

/// Median text length (in characters) over plain-text, non-media messages; 0 when none qualify.
pub fn median_message_length(messages: &[NormalizedMessage]) -> f64 {
    let mut lengths: Vec<usize> = messages
        .iter()
        .filter(|m| !m.has_actionables && !m.is_media)
        .map(|m| m.text.chars().count())
        .collect();
    if lengths.is_empty() {
        return 0.0;
    }

    lengths.sort_unstable();
    let mid = lengths.len() / 2;
    if lengths.len() % 2 == 1 {
        lengths[mid] as f64
    } else {
        (lengths[mid - 1] + lengths[mid]) as f64 / 2.0
    }
}

/// Histogram of chronologically sorted messages over fixed-width windows.
///
/// The anchor bucket is always present; later buckets are created only once a
/// message lands in them.
pub fn build_timebuckets(messages: &[NormalizedMessage], anchor: DateTime<Utc>) -> Vec<TimeBucket> {
    let width = Duration::days(BUCKET_WIDTH_DAYS);
    let mut buckets = vec![TimeBucket {
        start: anchor,
        count: 0,
    }];
    let mut window_start = anchor;

    for message in messages.iter().filter(|m| m.date >= anchor) {
        while message.date >= window_start + width {
            window_start = window_start + width;
        }
        match buckets.last_mut() {
            Some(bucket) if bucket.start == window_start => bucket.count += 1,
            _ => buckets.push(TimeBucket {
                start: window_start,
                count: 1,
            }),
        }
    }

    buckets
}

/// Statistics of a single chat.
pub fn chat_stats(chat: &ChatTimeline, config: &AggregateConfig) -> ChatStats {
    ChatStats {
        key: chat.key.clone(),
        name: chat.display_name.clone(),
        count_messages_total: chat.messages.len(),
        count_messages_outgoing: chat.messages.iter().filter(|m| m.is_outgoing).count(),
        median_message_length: median_message_length(&chat.messages),
        timebuckets: config
            .timebuckets
            .then(|| build_timebuckets(&chat.messages, config.bucket_anchor)),
    }
}

/// Ranks chats by total message count, descending. Ties keep archive order.
fn rank_chats(chats: &mut [ChatStats]) {
    chats.sort_by(|a, b| b.count_messages_total.cmp(&a.count_messages_total));
}

/// Builds the report: per-chat stats for included chats, global totals over
/// all of them, and the ranking truncated to `top_n`.
pub fn aggregate(archive: &NormalizedArchive, config: &AggregateConfig) -> Report {
    let mut global = GlobalStats::default();
    let mut chats: Vec<ChatStats> = Vec::with_capacity(archive.chats.len());

    for chat in archive.chats.values() {
        if config.is_excluded(chat) {
            debug!(chat_key = %chat.key, name = %chat.display_name, "Excluded chat");
            continue;
        }

        let stats = chat_stats(chat, config);
        global.count_messages_total += stats.count_messages_total;
        global.count_messages_outgoing += stats.count_messages_outgoing;
        chats.push(stats);
    }

    // Totals are complete at this point; truncation only affects the ranking
    rank_chats(&mut chats);
    let included = chats.len();
    chats.truncate(config.top_n);

    let mut warnings = Vec::new();
    if global.count_messages_total == 0 {
        warn!(included_chats = included, "No messages left to aggregate");
        warnings.push(Warning::EmptyResult);
    }

    info!(
        included_chats = included,
        ranked_chats = chats.len(),
        total = global.count_messages_total,
        outgoing = global.count_messages_outgoing,
        "Aggregated archive"
    );

    Report {
        schema_version: SCHEMA_VERSION,
        owner_name: archive.owner_name.clone(),
        archive_as_of: archive.archive_as_of,
        global,
        chats,
        warnings,
    }
}
