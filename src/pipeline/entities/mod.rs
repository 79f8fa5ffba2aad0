//! Entity stream reconstruction.
//!
//! A document-understanding service tags fragments of the receipt as
//! `Quantity`, `Amount` or `Item` (plus whatever else its processor emits).
//! This module folds that ordered stream back into draft line items.

pub mod document_ai;
pub mod reconstruct;
pub mod types;

pub use document_ai::*;
pub use reconstruct::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaggingError {
    #[error("Entity tagging service is not reachable at {0}")]
    Connection(String),

    #[error("Entity tagging service returned error (status {status}): {body}")]
    ServiceError { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}
