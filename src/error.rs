use thiserror::Error;

/// Failures reading an uploaded or seed file as a whole
/// Individual bad rows are never reported here
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),
}

/// Failures raised by a reading store backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode reading: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("journal line {line} is corrupt: {source}")]
    CorruptJournal {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type ParseResult<T> = std::result::Result<T, ParseError>;

pub type StoreResult<T> = std::result::Result<T, StoreError>;
