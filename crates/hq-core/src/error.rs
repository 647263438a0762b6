//! Error types for hq-core

use std::path::PathBuf;

/// Result type for hq-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hq-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Installation root missing or not a directory
    #[error("No installation at {path}")]
    NotAnInstallation { path: PathBuf },

    /// The fetched template is too small to be trusted
    #[error("Template at {path} has {found} files, expected at least {minimum}")]
    TemplateTooSmall {
        path: PathBuf,
        found: usize,
        minimum: usize,
    },

    /// Template provider could not produce a tree
    #[error("Template fetch failed: {message}")]
    TemplateFetch { message: String },

    /// A strategy pattern failed to compile
    #[error("Invalid pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Backup directory could not be created or populated
    #[error("Backup failed at {path}: {message}")]
    BackupFailed { path: PathBuf, message: String },

    /// Backup directory or manifest not found
    #[error("Backup not found: {path}")]
    BackupNotFound { path: PathBuf },

    /// Manifest present but failing validation
    #[error("Invalid backup manifest at {path}: {}", errors.join("; "))]
    InvalidManifest { path: PathBuf, errors: Vec<String> },

    /// A merge strategy could not prove user content was preserved
    #[error("Merge of {path} failed: {reason}")]
    MergeFailed { path: String, reason: String },

    /// Mirrored entry count after a snapshot is outside tolerance
    #[error("Backup verification failed: expected {expected} entries, found {actual}")]
    VerificationFailed { expected: usize, actual: usize },

    /// Some entries could not be copied into the backup
    #[error("{failed} of {attempted} entries could not be backed up")]
    BackupIncomplete { failed: usize, attempted: usize },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from hq-fs
    #[error(transparent)]
    Fs(#[from] hq_fs::Error),

    /// Content error from hq-content
    #[error(transparent)]
    Content(#[from] hq_content::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
