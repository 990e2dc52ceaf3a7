//! Unified error type.

/// Boxed error used at collaborator seams (body streams, principal lookup).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type returned by reqtrail's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: binding a port, draining a request body, or a
/// logging configuration that cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to capture request body: {0}")]
    CaptureFailed(#[source] BoxError),

    #[error("request body has not been captured yet")]
    BodyNotCaptured,

    #[error("invalid logging config: {0}")]
    InvalidConfig(String),

    #[error("could not parse logging config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
