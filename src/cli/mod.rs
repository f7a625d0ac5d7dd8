//! Command-line interface for corporatica.

mod commands;

pub use commands::{is_verbose, run};
