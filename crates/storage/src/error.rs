#![forbid(unsafe_code)]

use jm_core::ids::JobId;

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    /// The database cannot be opened, is corrupt, or stayed locked past the
    /// bounded retry budget. Fatal to the calling process; retrying is the
    /// caller's decision.
    Unavailable(rusqlite::Error),
    /// The value is not representable as a JSON document.
    Serialization(serde_json::Error),
    UnknownJob(JobId),
    InvalidInput(&'static str),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Unavailable(err) => write!(f, "store unavailable: {err}"),
            Self::Serialization(err) => write!(f, "serialization: {err}"),
            Self::UnknownJob(id) => write!(f, "unknown job id {id}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Unavailable(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}
