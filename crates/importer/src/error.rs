use thiserror::Error;

pub type Result<T> = std::result::Result<T, ImportError>;

/// Fatal import errors. Per-row problems (bad amount, unparseable date,
/// negative, duplicate) are not errors: the row stays in the preview and is
/// simply not upload-eligible.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Unsupported or unreadable file: {0}")]
    UnsupportedFormat(String),

    #[error("Missing required columns: {0}")]
    MissingRequiredColumns(String),

    #[error("No authenticated user; sign in before uploading")]
    Unauthenticated,

    #[error("No valid rows selected for upload")]
    EmptySubmission,
}
