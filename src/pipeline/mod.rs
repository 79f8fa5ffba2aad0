pub mod entities;
pub mod generative;
pub mod scan;
pub mod validation;

use thiserror::Error;

use entities::TaggingError;

/// Everything that can end a scan before drafts reach the buffer.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Receipt file could not be read: {0}")]
    FileAccess(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedMedia(String),

    #[error("No fenced JSON block found in generated response: {0}")]
    Format(String),

    #[error("Fenced JSON block is not valid: {0}")]
    Parse(String),

    #[error("Generative service is not reachable at {0}")]
    ServiceConnection(String),

    #[error("Generative service returned error (status {status}): {body}")]
    ServiceError { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Entity tagging failed: {0}")]
    Tagging(#[from] TaggingError),

    #[error("Extraction source not configured: {0}")]
    SourceUnavailable(String),
}
