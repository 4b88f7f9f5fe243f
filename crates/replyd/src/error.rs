//! Error types for the suggestion pipeline.

use thiserror::Error;

/// Failures from the external completion call.
///
/// Every variant converts the request to the rules-fallback path when it
/// occurs on the primary call; inside a shadow task it is only recorded.
#[derive(Error, Debug, Clone)]
pub enum CompletionError {
    /// Missing or unusable client configuration (no API key).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network or timeout failure talking to the completion endpoint.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed, incomplete, or miscounted structured output.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Failures parsing the inbound request body. Surfaced to the caller as a
/// client error before any generation work happens.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("invalid request body: {0}")]
    Validation(String),
}
