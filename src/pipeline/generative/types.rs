use serde::{Deserialize, Serialize};

use crate::models::LineItemDraft;
use crate::pipeline::ExtractionError;

/// Structured receipt recovered from a generated response. Immutable once
/// produced; the buffer works on copies of `items`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub vendor_name: Option<String>,
    pub date: Option<String>,
    pub items: Vec<LineItemDraft>,
    pub subtotal: Option<f64>,
    pub tax: Option<f64>,
    pub total: Option<f64>,
}

/// Parsed response plus anything the lenient parser had to skip.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExtraction {
    pub result: ExtractionResult,
    pub warnings: Vec<String>,
}

/// Vision chat client abstraction (allows mocking).
pub trait VisionClient: Send + Sync {
    /// Send a prompt with base64-encoded images; returns the reply text.
    fn chat_with_images(
        &self,
        model: &str,
        prompt: &str,
        images: &[String],
        system: Option<&str>,
    ) -> Result<String, ExtractionError>;
}
