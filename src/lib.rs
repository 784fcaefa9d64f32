//! `betascope` library crate.
//!
//! The binary (`betascope`) is a thin wrapper around this library so that:
//!
//! - the aggregation core is testable without spawning processes
//! - data sources can be swapped (web, local directory, fixtures)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod beta;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod metrics;
pub mod report;
