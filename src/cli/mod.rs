//! CLI layer for ragpipe.
//!
//! Provides the command-line interface using clap, with the demo pipeline
//! as default command and subcommands for indexing, searching, asking and
//! managing the persisted collection.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands, DemoArgs, GenerationArgs};
