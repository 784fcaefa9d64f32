//! Data sets read from a local directory (offline runs, fixtures).
//!
//! For `(Europe, 2024)` the source looks for `betaEurope24.xls`, then the same
//! stem with `.xlsx` and `.csv`.

use std::path::{Path, PathBuf};

use crate::beta::DatasetId;
use crate::data::BetaSource;
use crate::data::error::{DataError, Result};
use crate::data::sheet::{RawTable, TableFormat, read_table};

const EXTENSIONS: [&str; 3] = ["xls", "xlsx", "csv"];

#[derive(Debug, Clone)]
pub struct LocalSource {
    dir: PathBuf,
}

impl LocalSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First existing file for a data set.
    pub fn path_for(&self, id: DatasetId) -> Option<PathBuf> {
        let file_name = id.region.file_name(id.period);
        let stem = file_name.trim_end_matches(".xls");
        EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{stem}.{ext}")))
            .find(|p| p.is_file())
    }
}

impl BetaSource for LocalSource {
    fn fetch(&self, id: DatasetId) -> Result<RawTable> {
        let path = self.path_for(id).ok_or_else(|| {
            DataError::NotFound(format!(
                "no {} file for {id} in '{}'",
                EXTENSIONS.join("/"),
                self.dir.display()
            ))
        })?;
        let bytes = std::fs::read(&path)?;
        read_table(bytes, TableFormat::from_name(&path.to_string_lossy()))
    }

    fn describe(&self, id: DatasetId) -> String {
        match self.path_for(id) {
            Some(p) => p.display().to_string(),
            None => format!("{}/{}", self.dir.display(), id.region.file_name(id.period)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Period, Region};

    #[test]
    fn reads_csv_with_the_archive_stem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("betaEurope24.csv"), "Industry Name,Beta\nBanking,0.9\n").unwrap();

        let source = LocalSource::new(dir.path());
        let table = source.fetch(DatasetId::new(Region::Europe, Period::Year(2024))).unwrap();
        assert_eq!(table.rows[1], vec!["Banking", "0.9"]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = LocalSource::new(dir.path());
        let err = source.fetch(DatasetId::new(Region::US, Period::Current)).unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));
    }
}
