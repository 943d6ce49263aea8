use thiserror::Error;

/// Fatal problems found while normalizing an archive.
///
/// Any of these aborts the whole run: there is no per-chat recovery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    #[error("Missing profile field: personal_information.{field}")]
    MissingProfileField { field: &'static str },

    #[error("Malformed record in chat '{chat}', message #{index}: {reason}")]
    MalformedRecord {
        chat: String,
        index: usize,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
