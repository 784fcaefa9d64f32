//! Reporting utilities: terminal tables for every subcommand.

pub mod format;

pub use format::*;
