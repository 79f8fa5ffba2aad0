//! Generative extraction: a vision-capable model reads the receipt image and
//! answers in free text around one fenced JSON block.

pub mod ollama;
pub mod parser;
pub mod prompt;
pub mod types;

pub use ollama::*;
pub use parser::*;
pub use prompt::*;
pub use types::*;
