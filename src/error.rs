use thiserror::Error;

/// Errors surfaced by the fallible edges of the crate: configuration, snapshot
/// loading and criteria validation. The analytics reducers themselves never
/// fail.
#[derive(Error, Debug)]
pub enum JournalError {
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: i64, end: i64 },

    #[error("unknown time zone '{0}'")]
    UnknownTimezone(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse journal data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("journal source unavailable: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, JournalError>;
