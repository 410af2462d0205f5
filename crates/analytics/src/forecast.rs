//! Demand forecasting.
//!
//! Model:
//! - Holt's linear (double exponential) smoothing on units sold per period.
//! - Smoothing constants are fixed or picked from a grid by minimising the
//!   in-sample one-step-ahead mean absolute error.
//! - The confidence band is `point ± z * σ`, where σ is the sample standard
//!   deviation of the one-step-ahead errors.
//!
//! Sparse series fall back to the historical mean with a wide band.

use serde::{Deserialize, Serialize};

use stockwise_core::{AnalyticsResult, Period, PeriodGranularity, SkuId};
use stockwise_inventory::UsageSeries;

use crate::config::{AnalyticsConfig, SmoothingParam};
use crate::stats::{mean, mean_absolute, stddev_sample, two_sided_z};

/// Forecasting model actually used for a SKU.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecastModel {
    /// Double exponential smoothing with level (`alpha`) and trend (`beta`) constants.
    Holt { alpha: f64, beta: f64 },
    /// Degenerate model for sparse history: the mean of the window.
    HistoricalMean,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelConfidence {
    Low,
    Medium,
    High,
}

/// Forward-looking demand estimate for one SKU.
///
/// Superseded (never mutated) by the next run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandForecast {
    pub sku: SkuId,
    /// The period being forecast. `None` only for an empty input series.
    pub forecast_period: Option<Period>,
    pub granularity: PeriodGranularity,
    pub horizon: u32,
    /// Expected units sold in `forecast_period`.
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub model_confidence: ModelConfidence,
    pub model: ForecastModel,
    pub confidence_level: f64,
    pub residual_std_dev: f64,
    pub in_sample_mae: f64,
}

impl DemandForecast {
    /// Days covered by one forecast period.
    pub fn period_days(&self) -> f64 {
        self.forecast_period
            .map(|p| p.length_days())
            .filter(|d| *d > 0.0)
            .unwrap_or_else(|| self.granularity.nominal_days())
    }

    /// Per-period standard deviation recovered from the band width.
    pub fn implied_std_dev(&self) -> f64 {
        let z = two_sided_z(self.confidence_level);
        if z > 0.0 {
            ((self.upper_bound - self.point_estimate) / z).max(0.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct Forecaster {
    alpha: SmoothingParam,
    beta: SmoothingParam,
    grid: Vec<f64>,
    confidence_level: f64,
    z: f64,
}

impl Forecaster {
    /// Build a forecaster from a configuration.
    ///
    /// Validates the configuration, so out-of-range smoothing constants fail here
    /// rather than on every call.
    pub fn from_config(config: &AnalyticsConfig) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(Self {
            alpha: config.alpha,
            beta: config.beta,
            grid: config.smoothing_grid.clone(),
            confidence_level: config.confidence_level,
            z: two_sided_z(config.confidence_level),
        })
    }

    /// Forecast demand `horizon_periods` periods after the end of `series`.
    ///
    /// A horizon of 0 is treated as 1. Never fails: sparse or empty series get the
    /// degenerate mean forecast.
    pub fn forecast(&self, series: &UsageSeries, horizon_periods: u32) -> DemandForecast {
        let horizon = horizon_periods.max(1);
        let y = series.sold_quantities();
        let forecast_period = series
            .last_period()
            .and_then(|last| series.granularity.shift(&last, i64::from(horizon)).ok());

        let nonzero = y.iter().filter(|v| **v > 0.0).count();
        let (model, point, sigma, mae, confidence) = if series.insufficient_history || nonzero < 2 {
            self.mean_model(&y)
        } else {
            self.holt_model(&y, horizon)
        };

        let point = point.max(0.0);
        let half_width = self.z * sigma;

        DemandForecast {
            sku: series.sku.clone(),
            forecast_period,
            granularity: series.granularity,
            horizon,
            point_estimate: point,
            lower_bound: (point - half_width).max(0.0),
            upper_bound: point + half_width,
            model_confidence: confidence,
            model,
            confidence_level: self.confidence_level,
            residual_std_dev: sigma,
            in_sample_mae: mae,
        }
    }

    fn mean_model(&self, y: &[f64]) -> (ForecastModel, f64, f64, f64, ModelConfidence) {
        let m = mean(y);
        let sd = stddev_sample(y, m);
        let deviations: Vec<f64> = y.iter().map(|v| v - m).collect();
        // Wide band: never narrower than the mean itself.
        (
            ForecastModel::HistoricalMean,
            m,
            sd.max(m),
            mean_absolute(&deviations),
            ModelConfidence::Low,
        )
    }

    fn holt_model(&self, y: &[f64], horizon: u32) -> (ForecastModel, f64, f64, f64, ModelConfidence) {
        let alphas = candidates(self.alpha, &self.grid);
        let betas = candidates(self.beta, &self.grid);

        let mut best: Option<(f64, f64, HoltFit)> = None;
        for &alpha in &alphas {
            for &beta in &betas {
                let fit = holt_fit(y, alpha, beta);
                let better = match &best {
                    Some((_, _, b)) => fit.mae < b.mae,
                    None => true,
                };
                if better {
                    best = Some((alpha, beta, fit));
                }
            }
        }

        let Some((alpha, beta, fit)) = best else {
            return self.mean_model(y);
        };

        let sigma = stddev_sample(&fit.errors, mean(&fit.errors));
        let point = fit.level + f64::from(horizon) * fit.trend;
        let scale = mean(y);
        let relative = if scale > 0.0 { sigma / scale } else { f64::INFINITY };
        let confidence = if relative <= 0.25 {
            ModelConfidence::High
        } else if relative <= 0.75 {
            ModelConfidence::Medium
        } else {
            ModelConfidence::Low
        };

        (ForecastModel::Holt { alpha, beta }, point, sigma, fit.mae, confidence)
    }
}

fn candidates(param: SmoothingParam, grid: &[f64]) -> Vec<f64> {
    match param {
        SmoothingParam::Fixed(v) => vec![v],
        SmoothingParam::Auto => grid.to_vec(),
    }
}

#[derive(Debug, Clone)]
struct HoltFit {
    level: f64,
    trend: f64,
    /// One-step-ahead errors for periods 1..n.
    errors: Vec<f64>,
    mae: f64,
}

/// Fit Holt's method. Requires `y.len() >= 2`.
fn holt_fit(y: &[f64], alpha: f64, beta: f64) -> HoltFit {
    let mut level = y[0];
    let mut trend = y[1] - y[0];
    let mut errors = Vec::with_capacity(y.len() - 1);

    for &actual in &y[1..] {
        let predicted = level + trend;
        errors.push(actual - predicted);

        let prev_level = level;
        level = alpha * actual + (1.0 - alpha) * (level + trend);
        trend = beta * (level - prev_level) + (1.0 - beta) * trend;
    }

    let mae = mean_absolute(&errors);
    HoltFit {
        level,
        trend,
        errors,
        mae,
    }
}
