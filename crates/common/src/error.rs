//! Error types for tablecheck wire decoding

use thiserror::Error;

/// Result type alias using the tablecheck wire Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while decoding service bodies
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed {what} body: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing field: {0}")]
    MissingField(String),
}
