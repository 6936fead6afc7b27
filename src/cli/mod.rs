//! CLI module for sonarchat
//!
//! Handles command-line argument parsing.

pub mod args;

pub use args::{Args, Commands, ConfigCommand, Verbosity};
