/// Errors that can occur across the Vigil engine.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the host process converts at its own boundary.
///
/// # Examples
///
/// ```
/// use vigil_core::VigilError;
///
/// let err = VigilError::Config("missing poll interval".into());
/// assert!(err.to_string().contains("missing poll interval"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum VigilError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// GitHub collaborator (API) failure.
    #[error("GitHub error: {0}")]
    GitHub(String),

    /// Notification sink failure.
    #[error("notification error: {0}")]
    Notify(String),

    /// An in-flight operation was cancelled.
    ///
    /// Kept distinct from [`VigilError::GitHub`] so callers can tell an
    /// aborted delayed reply apart from a collaborator failure.
    #[error("operation cancelled")]
    Cancelled,

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
