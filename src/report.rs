use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
use anyhow::{anyhow, bail};
#[cfg(test)]
use std::path::Path;
#[cfg(test)]
use jsonschema::{Draft, JSONSchema};

use crate::timefmt::format_date;

pub const SCHEMA_VERSION: i32 = 1;

/// Everything a renderer needs to title and label the ranked chart.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Report {
    pub schema_version: i32,
    pub owner_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_as_of: Option<DateTime<Utc>>,
    pub global: GlobalStats,
    /// Ranked by total messages, descending.
    pub chats: Vec<ChatStats>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GlobalStats {
    pub count_messages_total: usize,
    pub count_messages_outgoing: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChatStats {
    pub key: String,
    pub name: String,
    pub count_messages_total: usize,
    pub count_messages_outgoing: usize,
    pub median_message_length: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timebuckets: Option<Vec<TimeBucket>>,
}

/// Message count of one fixed-width window starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeBucket {
    pub start: DateTime<Utc>,
    pub count: usize,
}

/// Non-fatal conditions worth surfacing next to the numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Warning {
    /// No chats or no messages left after exclusion.
    EmptyResult,
}

impl ChatStats {
    /// Outgoing messages as a percentage of this chat's total.
    pub fn outgoing_percentage(&self) -> f64 {
        percentage(self.count_messages_outgoing, self.count_messages_total)
    }

    /// This chat's total as a percentage of the global total.
    pub fn share_of_total(&self, global: &GlobalStats) -> f64 {
        percentage(self.count_messages_total, global.count_messages_total)
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

impl Report {
    #[cfg(test)]
    /// Read a report back from its JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read report file: {}", path.display()))?;

        let report: Report = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON from: {}", path.display()))?;

        Ok(report)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report")
    }

    /// Output file name for `extension`, derived from the archive date.
    pub fn default_filename(&self, extension: &str) -> String {
        match self.archive_as_of {
            Some(ts) => format!("tgstats-{}.{}", format_date(ts), extension),
            None => format!("tgstats-undated.{}", extension),
        }
    }

    #[cfg(test)]
    /// Validate report JSON against the JSON schema
    pub fn validate_with_schema(
        report_json: &serde_json::Value,
        schema: &JSONSchema,
    ) -> Result<()> {
        match schema.validate(report_json) {
            Ok(_) => Ok(()),
            Err(errors) => {
                let error_messages: Vec<String> = errors
                    .map(|e| format!("  - {}: {}", e.instance_path, e))
                    .collect();
                bail!("Report validation failed:\n{}", error_messages.join("\n"))
            }
        }
    }

    #[cfg(test)]
    /// Load and compile the JSON schema
    pub fn load_schema(schema_path: &Path) -> Result<JSONSchema> {
        let schema_content = std::fs::read_to_string(schema_path)
            .with_context(|| format!("Failed to read schema file: {}", schema_path.display()))?;

        let schema_json: serde_json::Value =
            serde_json::from_str(&schema_content).with_context(|| {
                format!(
                    "Failed to parse schema JSON from: {}",
                    schema_path.display()
                )
            })?;

        JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema_json)
            .map_err(|e| anyhow!("Failed to compile JSON schema: {}", e))
    }
}
