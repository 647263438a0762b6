//! Error types for hq-content

/// Result type for hq-content operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hq-content operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("List `{key}` not found")]
    ListNotFound { key: String },

    #[error("List `{key}` uses inline flow syntax and cannot be extended line by line")]
    InlineList { key: String },
}
