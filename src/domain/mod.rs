//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - data-set coordinates (`Region`, `Period`)
//! - unit-tagged ratios (`Ratio`, `RatioUnit`)
//! - typed observations and their unique-key container (`BetaRecord`, `BetaRecordSet`)

pub mod types;

pub use types::*;
