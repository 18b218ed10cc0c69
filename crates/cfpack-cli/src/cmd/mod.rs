//! Subcommand implementations.

pub mod check;
pub mod pack;
pub mod platforms;
pub mod push;
pub mod resolve;
