//! One receipt scan: stage the upload, run the selected source, normalize.

pub mod orchestrator;
pub mod upload;

pub use orchestrator::*;
pub use upload::*;
