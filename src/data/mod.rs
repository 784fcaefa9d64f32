//! External data sources.
//!
//! - Damodaran beta workbooks over HTTPS (`damodaran`) or from disk (`local`)
//! - FRED exchange-rate series (`fred`)
//! - spreadsheet/CSV decoding into untyped grids (`sheet`)

use rayon::prelude::*;

use crate::beta::DatasetId;

pub mod damodaran;
pub mod error;
pub mod fred;
pub mod local;
pub mod sheet;

pub use damodaran::DamodaranClient;
pub use error::DataError;
pub use fred::FredClient;
pub use local::LocalSource;
pub use sheet::RawTable;

/// Something that can produce the raw table of one `(region, period)` data set.
///
/// Implementations return text cells only; typing happens at ingestion.
pub trait BetaSource: Sync {
    fn fetch(&self, id: DatasetId) -> error::Result<RawTable>;

    /// Where the data set comes from (URL or path), for messages.
    fn describe(&self, id: DatasetId) -> String;
}

/// Fetch every data set in parallel; results keep the order of `ids`.
pub fn fetch_all<S: BetaSource + ?Sized>(
    source: &S,
    ids: &[DatasetId],
) -> Vec<(DatasetId, error::Result<RawTable>)> {
    ids.par_iter().map(|&id| (id, source.fetch(id))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Period, Region};

    struct Fixed;

    impl BetaSource for Fixed {
        fn fetch(&self, id: DatasetId) -> error::Result<RawTable> {
            match id.region {
                Region::US => Ok(RawTable::new(vec![vec![id.period.to_string()]])),
                _ => Err(DataError::NotFound(self.describe(id))),
            }
        }

        fn describe(&self, id: DatasetId) -> String {
            format!("fixed://{}", id.region.file_name(id.period))
        }
    }

    #[test]
    fn fetch_all_preserves_request_order() {
        let ids: Vec<DatasetId> = (2018..2025)
            .map(|y| DatasetId::new(Region::US, Period::Year(y)))
            .chain([DatasetId::new(Region::Japan, Period::Current)])
            .collect();

        let out = fetch_all(&Fixed, &ids);
        assert_eq!(out.len(), ids.len());
        for ((id, result), expected) in out.iter().zip(&ids) {
            assert_eq!(id, expected);
            assert_eq!(result.is_ok(), id.region == Region::US);
        }
        assert_eq!(out[0].1.as_ref().unwrap().rows[0][0], "2018");
    }
}
