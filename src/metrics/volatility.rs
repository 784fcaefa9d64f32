//! Historical volatility of a daily price series.

use chrono::NaiveDate;
use serde::Serialize;

use crate::metrics::MetricsError;

pub const DEFAULT_WINDOW: usize = 90;
pub const TRADING_DAYS: u32 = 252;
const CALENDAR_DAYS: u32 = 365;

/// One daily log return, dated at the later observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogReturn {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilityReport {
    pub window: usize,
    pub obs_count: usize,
    /// Date of the first return in the window.
    pub start_date: NaiveDate,
    /// Date of the last return in the window.
    pub end_date: NaiveDate,
    pub last_spot_date: NaiveDate,
    pub last_spot: f64,
    pub stdev_daily: f64,
    pub trading_days: u32,
    /// `stdev_daily × √trading_days`.
    pub vol_annualized: f64,
    /// `stdev_daily × √365`.
    pub vol_annualized_calendar: f64,
}

/// A price inside the volatility window, for export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowRow {
    pub date: NaiveDate,
    pub price: f64,
    pub log_return: Option<f64>,
}

/// Daily log returns `ln(p_t / p_{t-1})` of a date-sorted series.
///
/// Pairs with a non-positive price are skipped.
pub fn log_returns(series: &[(NaiveDate, f64)]) -> Vec<LogReturn> {
    series
        .windows(2)
        .filter_map(|pair| {
            let (_, prev) = pair[0];
            let (date, curr) = pair[1];
            (prev > 0.0 && curr > 0.0).then(|| LogReturn {
                date,
                value: (curr / prev).ln(),
            })
        })
        .collect()
}

/// Sample standard deviation (n − 1 denominator).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Annualized volatility over the last `window` daily log returns.
pub fn annualized_volatility(
    series: &[(NaiveDate, f64)],
    window: usize,
    trading_days: u32,
) -> Result<VolatilityReport, MetricsError> {
    if window < 2 {
        return Err(MetricsError::InvalidWindow(window));
    }

    let returns = log_returns(series);
    if returns.len() < window {
        return Err(MetricsError::InsufficientData {
            needed: window,
            available: returns.len(),
        });
    }

    let used = &returns[returns.len() - window..];
    let values: Vec<f64> = used.iter().map(|r| r.value).collect();
    let stdev_daily = sample_std(&values).ok_or(MetricsError::InvalidWindow(window))?;

    // `returns` is non-empty here, so the series has at least two points.
    let (last_spot_date, last_spot) = series[series.len() - 1];

    Ok(VolatilityReport {
        window,
        obs_count: used.len(),
        start_date: used[0].date,
        end_date: used[used.len() - 1].date,
        last_spot_date,
        last_spot,
        stdev_daily,
        trading_days,
        vol_annualized: stdev_daily * f64::from(trading_days).sqrt(),
        vol_annualized_calendar: stdev_daily * f64::from(CALENDAR_DAYS).sqrt(),
    })
}

/// Prices dated within the report's return window, with their log returns.
pub fn window_rows(series: &[(NaiveDate, f64)], report: &VolatilityReport) -> Vec<WindowRow> {
    let mut rows = Vec::new();
    let mut prev: Option<f64> = None;
    for &(date, price) in series {
        if date >= report.start_date && date <= report.end_date {
            let log_return = prev
                .filter(|p| *p > 0.0 && price > 0.0)
                .map(|p| (price / p).ln());
            rows.push(WindowRow { date, price, log_return });
        }
        prev = Some(price);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Duration::days(n)
    }

    #[test]
    fn constant_series_has_zero_vol() {
        let series: Vec<_> = (0..10).map(|i| (day(i), 1.08)).collect();
        let report = annualized_volatility(&series, 5, TRADING_DAYS).unwrap();
        assert!(report.stdev_daily.abs() < 1e-12);
        assert_eq!(report.obs_count, 5);
        assert_eq!(report.start_date, day(5));
        assert_eq!(report.end_date, day(9));
    }

    #[test]
    fn known_alternating_series() {
        // 100 -> 110 -> 100: returns ±ln(1.1), mean 0, std = ln(1.1) * √2.
        let series = vec![(day(0), 100.0), (day(1), 110.0), (day(2), 100.0)];
        let report = annualized_volatility(&series, 2, TRADING_DAYS).unwrap();
        let expected = 1.1f64.ln() * 2f64.sqrt();
        assert!((report.stdev_daily - expected).abs() < 1e-12);
        assert!((report.vol_annualized - expected * 252f64.sqrt()).abs() < 1e-12);
        assert!((report.vol_annualized_calendar - expected * 365f64.sqrt()).abs() < 1e-12);
        assert_eq!(report.last_spot, 100.0);
    }

    #[test]
    fn too_few_returns_is_an_error() {
        let series = vec![(day(0), 1.0), (day(1), 1.1), (day(2), 1.2)];
        assert!(matches!(
            annualized_volatility(&series, 90, TRADING_DAYS),
            Err(MetricsError::InsufficientData { needed: 90, available: 2 })
        ));
        assert!(matches!(
            annualized_volatility(&series, 1, TRADING_DAYS),
            Err(MetricsError::InvalidWindow(1))
        ));
    }

    #[test]
    fn non_positive_prices_are_skipped() {
        let series = vec![(day(0), 1.0), (day(1), 0.0), (day(2), 1.1), (day(3), 1.2)];
        let returns = log_returns(&series);
        assert_eq!(returns.len(), 1);
        assert_eq!(returns[0].date, day(3));
    }

    #[test]
    fn window_rows_cover_the_return_dates() {
        let series: Vec<_> = (0..6).map(|i| (day(i), 1.0 + i as f64 / 100.0)).collect();
        let report = annualized_volatility(&series, 3, TRADING_DAYS).unwrap();
        let rows = window_rows(&series, &report);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, day(3));
        assert!(rows.iter().all(|r| r.log_return.is_some()));
    }
}
