pub mod draft;
pub mod enums;
pub mod owner;
pub mod pantry_item;

pub use draft::*;
pub use owner::*;
pub use pantry_item::*;
