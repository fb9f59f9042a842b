//! Core types - pure abstractions shared across the codebase.

mod format;
mod mode;
mod root;

pub use format::Format;
pub use mode::BuildMode;
pub use root::{default_root, set_default_root};
