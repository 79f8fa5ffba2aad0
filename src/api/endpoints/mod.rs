//! API endpoint handlers, one module per resource.

pub mod health;
pub mod items;
pub mod owners;
pub mod receipts;
pub mod sessions;
