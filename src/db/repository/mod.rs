//! Repository layer: entity-scoped database operations.
//!
//! Every function takes a borrowed `Connection`; callers decide whether the
//! work runs inside a transaction.

mod owner;
mod pantry_item;

pub use owner::*;
pub use pantry_item::*;
