//! HTTP API.
//!
//! Exposes receipt scanning, scan sessions and the pantry store as JSON
//! endpoints under `/api/`. `api_router()` returns a `Router` that can be
//! mounted on any axum server; `server` runs it on its own listener.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{start_api_server_on, ApiServer, ServerError};
pub use types::ApiContext;
