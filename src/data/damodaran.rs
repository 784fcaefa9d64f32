//! NYU Stern (Damodaran) industry beta data sets over HTTPS.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::beta::DatasetId;
use crate::data::BetaSource;
use crate::data::error::{DataError, Result};
use crate::data::sheet::{RawTable, TableFormat, read_table};
use crate::domain::Period;

const DATASETS_URL: &str = "https://pages.stern.nyu.edu/~adamodar/pc/datasets/";
const ARCHIVES_URL: &str = "https://pages.stern.nyu.edu/~adamodar/pc/archives/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking client for the current and archived beta workbooks.
#[derive(Debug, Clone)]
pub struct DamodaranClient {
    client: Client,
    datasets_url: String,
    archives_url: String,
}

impl DamodaranClient {
    pub fn new(datasets_url: impl Into<String>, archives_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("betascope/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            datasets_url: with_trailing_slash(datasets_url.into()),
            archives_url: with_trailing_slash(archives_url.into()),
        })
    }

    /// Build a client, honouring `BETASCOPE_DATASETS_URL` / `BETASCOPE_ARCHIVES_URL`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let datasets = std::env::var("BETASCOPE_DATASETS_URL").unwrap_or_else(|_| DATASETS_URL.to_string());
        let archives = std::env::var("BETASCOPE_ARCHIVES_URL").unwrap_or_else(|_| ARCHIVES_URL.to_string());
        Self::new(datasets, archives)
    }

    /// URL of the workbook for a data set.
    pub fn url_for(&self, id: DatasetId) -> String {
        let base = match id.period {
            Period::Current => &self.datasets_url,
            Period::Year(_) => &self.archives_url,
        };
        format!("{base}{}", id.region.file_name(id.period))
    }
}

impl BetaSource for DamodaranClient {
    fn fetch(&self, id: DatasetId) -> Result<RawTable> {
        let url = self.url_for(id);
        let resp = self.client.get(&url).send()?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::NotFound(url));
        }
        if !status.is_success() {
            return Err(DataError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let bytes = resp.bytes()?.to_vec();
        read_table(bytes, TableFormat::from_name(&url))
    }

    fn describe(&self, id: DatasetId) -> String {
        self.url_for(id)
    }
}

fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}
