//! One module per CLI subcommand.

pub mod export;
pub mod play;
pub mod verify;
