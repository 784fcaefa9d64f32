//! Sector beta aggregation.
//!
//! A pure, stateless transformation over a `BetaRecordSet`:
//!
//! - Hamada re-levering (`relever`)
//! - grouping + (firm-weighted) averaging (`aggregate`)
//! - per-observation detail (`analysis`)
//! - cross-sector comparison (`compare`)
//!
//! No I/O happens here; data sets are fetched and mapped to typed records by
//! `crate::data` and `crate::io::ingest`.

pub mod aggregate;
pub mod analysis;
pub mod compare;
pub mod error;
pub mod relever;

pub use aggregate::*;
pub use analysis::*;
pub use compare::*;
pub use error::{BetaError, DatasetId};
pub use relever::*;
