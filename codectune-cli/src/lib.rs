//! Library portion of the codectune CLI.
//!
//! Contains argument definitions and command logic, kept out of main.rs so
//! integration tests can drive the commands directly.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod passthrough;

pub use cli::{BdrateArgs, BestArgs, Cli, Commands, LsArgs};
pub use passthrough::PassthroughCodec;
