//! Shared domain types.
//!
//! These types are intentionally kept small and serializable so they can be:
//!
//! - built once at the ingestion boundary from untyped tables
//! - aggregated without re-inspecting raw headers
//! - exported to CSV/JSON

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Damodaran data-set geography.
///
/// Variants are declared alphabetically so the derived ordering matches the
/// sort order of the region labels in every output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    China,
    Emerging,
    Europe,
    Global,
    India,
    Japan,
    /// Australia, New Zealand and Canada.
    Rest,
    #[value(name = "us")]
    US,
}

impl Region {
    pub const ALL: [Region; 8] = [
        Region::China,
        Region::Emerging,
        Region::Europe,
        Region::Global,
        Region::India,
        Region::Japan,
        Region::Rest,
        Region::US,
    ];

    /// Human-readable label for terminal output and exports.
    pub fn label(self) -> &'static str {
        match self {
            Region::China => "China",
            Region::Emerging => "Emerging",
            Region::Europe => "Europe",
            Region::Global => "Global",
            Region::India => "India",
            Region::Japan => "Japan",
            Region::Rest => "Rest",
            Region::US => "US",
        }
    }

    /// File stem of the data set, e.g. `betaEurope` for `betaEurope.xls`.
    ///
    /// Archived years append a two-digit year (`betaEurope24.xls`).
    pub fn file_stem(self) -> &'static str {
        match self {
            Region::China => "indregChina",
            Region::Emerging => "betaemerg",
            Region::Europe => "betaEurope",
            Region::Global => "betaGlobal",
            Region::India => "betaIndia",
            Region::Japan => "betaJapan",
            Region::Rest => "betaRest",
            Region::US => "betas",
        }
    }

    /// Spreadsheet file name for a period.
    pub fn file_name(self, period: Period) -> String {
        match period {
            Period::Current => format!("{}.xls", self.file_stem()),
            Period::Year(year) => format!("{}{:02}.xls", self.file_stem(), year.rem_euclid(100)),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Observation vintage: an archived year or the current (latest) file.
///
/// Every year orders before `Current`. Serialized as a bare year or `"current"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Period {
    Year(i32),
    Current,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Year(year) => write!(f, "{year}"),
            Period::Current => f.write_str("current"),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("current") || s.eq_ignore_ascii_case("latest") {
            return Ok(Period::Current);
        }
        s.parse::<i32>()
            .map(Period::Year)
            .map_err(|_| format!("Invalid period '{s}'. Expected a year (e.g. 2024) or `current`."))
    }
}

impl Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Period::Year(year) => serializer.serialize_i32(*year),
            Period::Current => serializer.serialize_str("current"),
        }
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PeriodVisitor;

        impl serde::de::Visitor<'_> for PeriodVisitor {
            type Value = Period;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a year or \"current\"")
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Period, E> {
                i32::try_from(v).map(Period::Year).map_err(E::custom)
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Period, E> {
                i32::try_from(v).map(Period::Year).map_err(E::custom)
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Period, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(PeriodVisitor)
    }
}

/// Unit a ratio was expressed in by its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatioUnit {
    /// Already a fraction (`0.25`).
    Fraction,
    /// Read as a percentage (`25` or `25%`) and divided by 100.
    Percent,
}

/// How a ratio column (D/E, tax rate, cash/firm value) is interpreted at ingest.
///
/// Cells suffixed with `%` are always read as percentages; the policy decides
/// what a bare number means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UnitPolicy {
    /// Infer the unit of bare numbers from the column (deterministic):
    /// - if the largest bare number exceeds `1.0`, bare numbers are percentages
    ///   and divided by 100.
    /// - otherwise they are fractions.
    ///
    /// `%`-suffixed cells are never rescaled a second time.
    #[default]
    Auto,
    /// Bare numbers are fractions (`0.25`).
    Fraction,
    /// Bare numbers are percentages (`25`).
    Percent,
}

/// A ratio stored as a fraction, tagged with the unit it was read in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ratio {
    value: f64,
    unit: RatioUnit,
}

impl Ratio {
    pub fn fraction(value: f64) -> Self {
        Self {
            value,
            unit: RatioUnit::Fraction,
        }
    }

    /// Build from a percentage figure (`25.0` → `0.25`).
    pub fn from_percent(percent: f64) -> Self {
        Self {
            value: percent / 100.0,
            unit: RatioUnit::Percent,
        }
    }

    /// Value as a fraction.
    pub fn value(self) -> f64 {
        self.value
    }

    pub fn unit(self) -> RatioUnit {
        self.unit
    }
}

/// How the per-group average is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Weighting {
    /// Arithmetic mean of the present values.
    #[default]
    Simple,
    /// Mean weighted by the number of firms in each observation.
    FirmCount,
}

/// Which unlevered beta feeds the Hamada re-levering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum UnleverBasis {
    /// The plain unlevered beta.
    #[default]
    Unlevered,
    /// The unlevered beta corrected for cash, when the data set carries it.
    CashAdjusted,
}

/// One observed (region, industry, period) row after schema mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetaRecord {
    pub region: Region,
    pub industry: String,
    pub period: Period,
    pub levered_beta: Option<f64>,
    pub unlevered_beta: Option<f64>,
    pub cash_adjusted_unlevered_beta: Option<f64>,
    pub debt_to_equity: Option<Ratio>,
    pub tax_rate: Option<Ratio>,
    pub cash_to_firm_value: Option<Ratio>,
    pub firm_count: Option<u32>,
}

impl BetaRecord {
    /// A record with only its key set.
    pub fn new(region: Region, industry: impl Into<String>, period: Period) -> Self {
        Self {
            region,
            industry: industry.into(),
            period,
            levered_beta: None,
            unlevered_beta: None,
            cash_adjusted_unlevered_beta: None,
            debt_to_equity: None,
            tax_rate: None,
            cash_to_firm_value: None,
            firm_count: None,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            region: self.region,
            industry: self.industry.clone(),
            period: self.period,
        }
    }
}

/// Identity of an observation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub region: Region,
    pub industry: String,
    pub period: Period,
}

/// A set of observations with unique `(region, industry, period)` keys.
///
/// Inserting a key twice never overwrites: the entry becomes the average of
/// every row seen for that key.
#[derive(Debug, Clone, Default)]
pub struct BetaRecordSet {
    records: BTreeMap<RecordKey, BetaRecord>,
    duplicates: BTreeMap<RecordKey, Vec<BetaRecord>>,
}

impl BetaRecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = BetaRecord>) -> Self {
        let mut set = Self::new();
        set.extend(records);
        set
    }

    pub fn insert(&mut self, record: BetaRecord) {
        let key = record.key();
        let Some(existing) = self.records.get(&key) else {
            self.records.insert(key, record);
            return;
        };

        let sources = self
            .duplicates
            .entry(key.clone())
            .or_insert_with(|| vec![existing.clone()]);
        sources.push(record);
        let merged = merge_duplicates(sources);
        self.records.insert(key, merged);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = BetaRecord>) {
        for record in records {
            self.insert(record);
        }
    }

    pub fn merge(&mut self, other: BetaRecordSet) {
        self.extend(other.into_records());
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in key order (region, industry, period).
    pub fn iter(&self) -> impl Iterator<Item = &BetaRecord> {
        self.records.values()
    }

    pub fn get(&self, key: &RecordKey) -> Option<&BetaRecord> {
        self.records.get(key)
    }

    /// Number of source rows merged into `key` (1 when it was never duplicated).
    pub fn source_count(&self, key: &RecordKey) -> usize {
        match self.duplicates.get(key) {
            Some(sources) => sources.len(),
            None => usize::from(self.records.contains_key(key)),
        }
    }

    pub fn into_records(self) -> Vec<BetaRecord> {
        self.records.into_values().collect()
    }
}

impl FromIterator<BetaRecord> for BetaRecordSet {
    fn from_iter<I: IntoIterator<Item = BetaRecord>>(iter: I) -> Self {
        Self::from_records(iter)
    }
}

/// Mean of the present values; `None` when every value is missing.
pub fn mean_present(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 { None } else { Some(sum / n as f64) }
}

fn merge_duplicates(sources: &[BetaRecord]) -> BetaRecord {
    let first = &sources[0];
    let mean_ratio = |pick: fn(&BetaRecord) -> Option<Ratio>| -> Option<Ratio> {
        let unit = sources.iter().find_map(pick)?.unit();
        let value = mean_present(sources.iter().map(|r| pick(r).map(Ratio::value)))?;
        Some(Ratio { value, unit })
    };

    BetaRecord {
        region: first.region,
        industry: first.industry.clone(),
        period: first.period,
        levered_beta: mean_present(sources.iter().map(|r| r.levered_beta)),
        unlevered_beta: mean_present(sources.iter().map(|r| r.unlevered_beta)),
        cash_adjusted_unlevered_beta: mean_present(sources.iter().map(|r| r.cash_adjusted_unlevered_beta)),
        debt_to_equity: mean_ratio(|r| r.debt_to_equity),
        tax_rate: mean_ratio(|r| r.tax_rate),
        cash_to_firm_value: mean_ratio(|r| r.cash_to_firm_value),
        firm_count: mean_present(sources.iter().map(|r| r.firm_count.map(f64::from)))
            .map(|v| v.round() as u32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(beta: Option<f64>, firms: Option<u32>) -> BetaRecord {
        BetaRecord {
            levered_beta: beta,
            firm_count: firms,
            ..BetaRecord::new(Region::US, "Banking", Period::Year(2024))
        }
    }

    #[test]
    fn archive_file_names_use_two_digit_years() {
        assert_eq!(Region::US.file_name(Period::Year(2023)), "betas23.xls");
        assert_eq!(Region::Europe.file_name(Period::Year(2005)), "betaEurope05.xls");
        assert_eq!(Region::China.file_name(Period::Current), "indregChina.xls");
    }

    #[test]
    fn current_orders_after_every_year() {
        assert!(Period::Year(2030) < Period::Current);
        assert_eq!("current".parse::<Period>().unwrap(), Period::Current);
        assert_eq!("2021".parse::<Period>().unwrap(), Period::Year(2021));
        assert!("twenty".parse::<Period>().is_err());
    }

    #[test]
    fn periods_serialize_as_year_or_current() {
        assert_eq!(serde_json::to_string(&Period::Year(2024)).unwrap(), "2024");
        assert_eq!(serde_json::to_string(&Period::Current).unwrap(), "\"current\"");
        assert_eq!(serde_json::from_str::<Period>("2019").unwrap(), Period::Year(2019));
        assert_eq!(serde_json::from_str::<Period>("\"current\"").unwrap(), Period::Current);
        assert_eq!(serde_json::to_string(&Region::US).unwrap(), "\"us\"");
    }

    #[test]
    fn duplicate_keys_are_averaged_not_overwritten() {
        let set = BetaRecordSet::from_records([
            record(Some(0.8), Some(10)),
            record(Some(1.2), None),
            record(None, Some(20)),
        ]);

        assert_eq!(set.len(), 1);
        let merged = set.iter().next().unwrap();
        assert!((merged.levered_beta.unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(merged.firm_count, Some(15));
        assert_eq!(set.source_count(&merged.key()), 3);
    }

    #[test]
    fn mean_present_ignores_missing() {
        assert_eq!(mean_present([None, None]), None);
        assert_eq!(mean_present([Some(2.0), None, Some(4.0)]), Some(3.0));
    }

    #[test]
    fn ratio_keeps_its_source_unit() {
        let r = Ratio::from_percent(25.0);
        assert!((r.value() - 0.25).abs() < 1e-12);
        assert_eq!(r.unit(), RatioUnit::Percent);
    }
}
