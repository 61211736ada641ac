use thiserror::Error;

/// Failure taxonomy for map operations.
///
/// Primary operations (save, open, generate, expand, delete, rename) surface
/// these to the user through the [`Notifier`](crate::render::Notifier);
/// best-effort secondary paths (the incremental update during an expansion,
/// the list refresh after a rename) log and continue. No variant is fatal:
/// every failure leaves the session in a previously-valid state.
#[derive(Debug, Error)]
pub enum MapError {
    /// Empty or missing root content. Blocks the save before any backend is
    /// touched.
    #[error("invalid map: {0}")]
    Validation(String),

    /// Missing or rejected credential.
    #[error("not authorized: {0}")]
    Auth(String),

    /// The requested document key does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Could not reach the remote store or expansion service.
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    /// The remote side answered with a non-success status.
    #[error("server error ({status}): {body}")]
    Server { status: u16, body: String },

    /// Document present but no recognizable content shape.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// Local cache failure.
    #[error("cache error: {0}")]
    Cache(#[from] rusqlite::Error),

    /// Local filesystem failure (cache directory, export target).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MapResult<T> = Result<T, MapError>;
