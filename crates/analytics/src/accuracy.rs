//! Forecast accuracy tracking.
//!
//! Forecasts from earlier runs are scored once the period they forecast has
//! been fully observed in the current window.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::{Period, SkuId};
use stockwise_inventory::UsageSeries;

use crate::forecast::DemandForecast;
use crate::stats::mean;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRecord {
    pub sku: SkuId,
    pub period: Period,
    pub forecast: f64,
    pub actual: f64,
    pub absolute_error: f64,
    /// `None` when nothing sold in the period.
    pub percentage_error: Option<f64>,
    /// Whether the actual fell inside the forecast band.
    pub within_band: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub records: Vec<AccuracyRecord>,
    /// Mean absolute error over all scored forecasts.
    pub mae: Option<f64>,
    /// Mean absolute percentage error over periods with sales.
    pub mape: Option<f64>,
}

impl AccuracyReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Score `previous` forecasts against observed sales.
///
/// Forecasts without a period, for periods not yet over at `as_of`, or outside
/// the current window are skipped.
pub fn evaluate_accuracy(
    previous: &[DemandForecast],
    series: &BTreeMap<SkuId, UsageSeries>,
    as_of: DateTime<Utc>,
) -> AccuracyReport {
    let mut records: Vec<AccuracyRecord> = previous
        .iter()
        .filter_map(|f| {
            let period = f.forecast_period?;
            if period.end > as_of {
                return None;
            }
            let observed = series.get(&f.sku)?.record_starting_at(period.start)?;
            if observed.period_end != period.end {
                return None;
            }

            let actual = observed.quantity_sold as f64;
            let absolute_error = (f.point_estimate - actual).abs();
            Some(AccuracyRecord {
                sku: f.sku.clone(),
                period,
                forecast: f.point_estimate,
                actual,
                absolute_error,
                percentage_error: (actual > 0.0).then(|| absolute_error / actual),
                within_band: f.lower_bound <= actual && actual <= f.upper_bound,
            })
        })
        .collect();
    records.sort_by(|a, b| a.sku.cmp(&b.sku).then_with(|| a.period.start.cmp(&b.period.start)));

    let errors: Vec<f64> = records.iter().map(|r| r.absolute_error).collect();
    let pct: Vec<f64> = records.iter().filter_map(|r| r.percentage_error).collect();

    AccuracyReport {
        mae: (!errors.is_empty()).then(|| mean(&errors)),
        mape: (!pct.is_empty()).then(|| mean(&pct)),
        records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{ForecastModel, ModelConfidence};
    use chrono::{Duration, TimeZone};
    use stockwise_core::PeriodGranularity;
    use stockwise_inventory::UsageRecord;

    fn sku(s: &str) -> SkuId {
        SkuId::new(s).unwrap()
    }

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap()
    }

    fn series_of(s: &str, sold: &[u64]) -> UsageSeries {
        let window = PeriodGranularity::Week.trailing_window(as_of(), sold.len() as u32).unwrap();
        UsageSeries {
            sku: sku(s),
            granularity: PeriodGranularity::Week,
            records: window
                .into_iter()
                .zip(sold)
                .map(|(p, q)| UsageRecord {
                    quantity_sold: *q,
                    ..UsageRecord::empty(sku(s), p, 1.0)
                })
                .collect(),
            insufficient_history: false,
        }
    }

    fn forecast_for(s: &str, period: Period, point: f64) -> DemandForecast {
        DemandForecast {
            sku: sku(s),
            forecast_period: Some(period),
            granularity: PeriodGranularity::Week,
            horizon: 1,
            point_estimate: point,
            lower_bound: point - 2.0,
            upper_bound: point + 2.0,
            model_confidence: ModelConfidence::Medium,
            model: ForecastModel::HistoricalMean,
            confidence_level: 0.9,
            residual_std_dev: 1.0,
            in_sample_mae: 1.0,
        }
    }

    #[test]
    fn scores_only_completed_periods() {
        let s = series_of("S1", &[10, 8, 12]);
        let periods: Vec<Period> = s.records.iter().map(UsageRecord::period).collect();
        let mut map = BTreeMap::new();
        map.insert(sku("S1"), s);

        let previous = vec![
            forecast_for("S1", periods[0], 9.0),
            forecast_for("S1", periods[1], 12.0),
            // The current period is still open at as_of.
            forecast_for("S1", periods[2], 12.0),
        ];
        let report = evaluate_accuracy(&previous, &map, as_of());

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].absolute_error, 1.0);
        assert!(report.records[0].within_band);
        assert_eq!(report.records[1].absolute_error, 4.0);
        assert!(!report.records[1].within_band);
        assert_eq!(report.mae, Some(2.5));
        let mape = report.mape.unwrap();
        assert!((mape - (0.1 + 0.5) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn zero_actuals_are_excluded_from_mape() {
        let s = series_of("S1", &[0, 5, 5]);
        let first = s.records[0].period();
        let mut map = BTreeMap::new();
        map.insert(sku("S1"), s);

        let report = evaluate_accuracy(&[forecast_for("S1", first, 3.0)], &map, as_of());
        assert_eq!(report.mae, Some(3.0));
        assert_eq!(report.mape, None);
        assert_eq!(report.records[0].percentage_error, None);
    }

    #[test]
    fn unknown_skus_and_foreign_periods_are_skipped() {
        let s = series_of("S1", &[4, 4, 4]);
        let shifted = Period {
            start: s.records[0].period_start + Duration::days(1),
            end: s.records[0].period_end + Duration::days(1),
        };
        let known = s.records[0].period();
        let mut map = BTreeMap::new();
        map.insert(sku("S1"), s);

        let report = evaluate_accuracy(
            &[forecast_for("S1", shifted, 4.0), forecast_for("S9", known, 4.0)],
            &map,
            as_of(),
        );
        assert!(report.is_empty());
        assert_eq!(report.mae, None);
    }
}
