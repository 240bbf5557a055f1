//! Command-line surface of the controller

pub mod args;
pub mod commands;
pub mod router;

pub use args::{Application, Cli, Commands};
pub use router::execute_command;
