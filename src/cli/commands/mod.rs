//! CLI command implementations.

pub mod deploy;
pub mod members;
pub mod peers;
pub mod render;
pub mod status;
