//! Small helpers shared across modules.

pub mod exec;
pub mod hash;
pub mod path;
