//! FRED (Federal Reserve Economic Data) exchange-rate series.
//!
//! With `FRED_API_KEY` set (environment or `.env`) the JSON observations API
//! is used; without a key the public `fredgraph.csv` download is used instead.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::data::error::{DataError, Result};

const API_URL: &str = "https://api.stlouisfed.org/fred/series/observations";
const GRAPH_CSV_URL: &str = "https://fred.stlouisfed.org/graph/fredgraph.csv";
const OBS_LIMIT: usize = 10000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// U.S. dollars per one euro, daily.
pub const SERIES_USD_PER_EUR: &str = "DEXUSEU";

pub struct FredClient {
    client: Client,
    api_key: Option<String>,
}

impl FredClient {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, api_key })
    }

    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("FRED_API_KEY").ok().filter(|k| !k.trim().is_empty());
        Self::new(api_key)
    }

    pub fn uses_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Observations of `series_id`, sorted by date ascending, missing values skipped.
    pub fn fetch_series(&self, series_id: &str) -> Result<Vec<(NaiveDate, f64)>> {
        let mut obs = match &self.api_key {
            Some(key) => self.fetch_json(series_id, key)?,
            None => self.fetch_csv(series_id)?,
        };
        obs.sort_by_key(|(d, _)| *d);
        obs.dedup_by_key(|(d, _)| *d);

        if obs.is_empty() {
            return Err(DataError::Parse(format!(
                "series {series_id} is empty after cleaning"
            )));
        }
        Ok(obs)
    }

    fn fetch_json(&self, series_id: &str, api_key: &str) -> Result<Vec<(NaiveDate, f64)>> {
        let limit = OBS_LIMIT.to_string();
        let resp = self
            .client
            .get(API_URL)
            .query(&[
                ("series_id", series_id),
                ("api_key", api_key),
                ("file_type", "json"),
                ("sort_order", "desc"),
                ("limit", limit.as_str()),
            ])
            .send()?;

        if !resp.status().is_success() {
            return Err(DataError::Status {
                url: API_URL.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let body: ObservationsResponse = resp.json()?;

        let mut out = Vec::with_capacity(body.observations.len());
        for obs in body.observations {
            let Some(value) = parse_value(&obs.value) else {
                continue;
            };
            let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d")
                .map_err(|e| DataError::Parse(format!("invalid FRED date '{}': {e}", obs.date)))?;
            out.push((date, value));
        }
        Ok(out)
    }

    fn fetch_csv(&self, series_id: &str) -> Result<Vec<(NaiveDate, f64)>> {
        let resp = self.client.get(GRAPH_CSV_URL).query(&[("id", series_id)]).send()?;

        if !resp.status().is_success() {
            return Err(DataError::Status {
                url: GRAPH_CSV_URL.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let text = resp.text()?;
        if !content_type.to_ascii_lowercase().contains("csv") {
            let sample: String = text.chars().take(200).collect::<String>().replace('\n', " ");
            return Err(DataError::Parse(format!(
                "unexpected FRED response (content-type: {content_type:?}, sample: {sample:?})"
            )));
        }

        parse_graph_csv(&text, series_id)
    }
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

/// Parse a `fredgraph.csv` body: a date column plus one column named after the series.
pub fn parse_graph_csv(text: &str, series_id: &str) -> Result<Vec<(NaiveDate, f64)>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let lowered: Vec<String> = headers.iter().map(|h| h.to_ascii_lowercase()).collect();

    let date_idx = lowered
        .iter()
        .position(|h| h == "date" || h == "observation_date")
        .ok_or_else(|| {
            DataError::Parse(format!(
                "date column not found in FRED CSV; columns: {:?}",
                headers.iter().collect::<Vec<_>>()
            ))
        })?;
    let series_lower = series_id.to_ascii_lowercase();
    let value_idx = lowered
        .iter()
        .position(|h| h.starts_with(&series_lower))
        .ok_or_else(|| {
            DataError::Parse(format!(
                "column {series_id} not found in FRED CSV; columns: {:?}",
                headers.iter().collect::<Vec<_>>()
            ))
        })?;

    let mut out = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(date) = record
            .get(date_idx)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        else {
            continue;
        };
        if let Some(value) = record.get(value_idx).and_then(parse_value) {
            out.push((date, value));
        }
    }
    Ok(out)
}

fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed == "." || trimmed.is_empty() {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
