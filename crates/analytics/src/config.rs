//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document (or none at all) is a
//! valid configuration. Range checks run once in [`AnalyticsConfig::validate`],
//! which [`crate::AnalyticsEngine::new`] calls before any run.

use serde::{Deserialize, Serialize};

use stockwise_core::{AnalyticsError, AnalyticsResult, PeriodGranularity};

use crate::classify::AbcClass;

/// A smoothing constant: fixed, or tuned per SKU by grid search.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "SmoothingRepr", into = "SmoothingRepr")]
pub enum SmoothingParam {
    #[default]
    Auto,
    Fixed(f64),
}

/// Wire form: a number, or the string `"auto"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum SmoothingRepr {
    Fixed(f64),
    Keyword(String),
}

impl TryFrom<SmoothingRepr> for SmoothingParam {
    type Error = String;

    fn try_from(value: SmoothingRepr) -> Result<Self, Self::Error> {
        match value {
            SmoothingRepr::Fixed(v) => Ok(SmoothingParam::Fixed(v)),
            SmoothingRepr::Keyword(k) if k.eq_ignore_ascii_case("auto") => Ok(SmoothingParam::Auto),
            SmoothingRepr::Keyword(k) => Err(format!("expected a number or \"auto\", got \"{k}\"")),
        }
    }
}

impl From<SmoothingParam> for SmoothingRepr {
    fn from(value: SmoothingParam) -> Self {
        match value {
            SmoothingParam::Auto => SmoothingRepr::Keyword("auto".to_string()),
            SmoothingParam::Fixed(v) => SmoothingRepr::Fixed(v),
        }
    }
}

impl core::str::FromStr for SmoothingParam {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(SmoothingParam::Auto);
        }
        s.parse::<f64>()
            .map(SmoothingParam::Fixed)
            .map_err(|e| AnalyticsError::configuration(format!("invalid smoothing constant '{s}': {e}")))
    }
}

/// Cumulative revenue-share cut-offs for ABC classes.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbcThresholds {
    /// SKUs ranked before this cumulative share are class A.
    pub a: f64,
    /// SKUs ranked before this cumulative share (and after `a`) are class B.
    pub b: f64,
}

impl Default for AbcThresholds {
    fn default() -> Self {
        Self { a: 0.80, b: 0.95 }
    }
}

/// Coefficient-of-variation cut-offs for XYZ classes.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XyzThresholds {
    pub x: f64,
    pub y: f64,
}

impl Default for XyzThresholds {
    fn default() -> Self {
        Self { x: 0.5, y: 1.0 }
    }
}

/// Default service-level z per ABC class.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceLevels {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Default for ServiceLevels {
    fn default() -> Self {
        // 95%, 90% and 80% one-sided.
        Self {
            a: 1.645,
            b: 1.282,
            c: 0.842,
        }
    }
}

impl ServiceLevels {
    pub fn for_class(&self, class: AbcClass) -> f64 {
        match class {
            AbcClass::A => self.a,
            AbcClass::B => self.b,
            AbcClass::C => self.c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub window_periods: u32,
    pub period_granularity: PeriodGranularity,
    /// Minimum number of periods with sales before a smoothing model is fitted.
    pub min_history_periods: u32,
    pub forecast_horizon: u32,
    pub alpha: SmoothingParam,
    pub beta: SmoothingParam,
    /// Candidate values for `auto` smoothing constants.
    pub smoothing_grid: Vec<f64>,
    pub confidence_level: f64,
    pub abc_thresholds: AbcThresholds,
    pub xyz_thresholds: XyzThresholds,
    pub service_levels: ServiceLevels,
    pub review_period_days: u32,
    /// Lead time used for SKUs without an explicit one.
    pub default_lead_time_days: u32,
    pub overstock_multiplier: f64,
    pub slow_moving_periods: u32,
    pub stale_after_days: u32,
    /// Worker threads for per-SKU work. `None` = available cores.
    pub max_workers: Option<usize>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            window_periods: 52,
            period_granularity: PeriodGranularity::Week,
            min_history_periods: 3,
            forecast_horizon: 1,
            alpha: SmoothingParam::Auto,
            beta: SmoothingParam::Auto,
            smoothing_grid: vec![0.1, 0.3, 0.5, 0.7, 0.9],
            confidence_level: 0.90,
            abc_thresholds: AbcThresholds::default(),
            xyz_thresholds: XyzThresholds::default(),
            service_levels: ServiceLevels::default(),
            review_period_days: 30,
            default_lead_time_days: 14,
            overstock_multiplier: 3.0,
            slow_moving_periods: 3,
            stale_after_days: 180,
            max_workers: None,
        }
    }
}

impl AnalyticsConfig {
    pub fn with_window_periods(mut self, periods: u32) -> Self {
        self.window_periods = periods;
        self
    }

    pub fn with_granularity(mut self, granularity: PeriodGranularity) -> Self {
        self.period_granularity = granularity;
        self
    }

    pub fn with_smoothing(mut self, alpha: SmoothingParam, beta: SmoothingParam) -> Self {
        self.alpha = alpha;
        self.beta = beta;
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }

    /// Worker count after resolving `None` against the machine.
    pub fn effective_workers(&self) -> usize {
        self.max_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.window_periods == 0 {
            return Err(AnalyticsError::configuration("window_periods must be >= 1"));
        }
        if self.min_history_periods == 0 || self.min_history_periods > self.window_periods {
            return Err(AnalyticsError::configuration(format!(
                "min_history_periods must be in [1, window_periods={}], got {}",
                self.window_periods, self.min_history_periods
            )));
        }
        if self.forecast_horizon == 0 {
            return Err(AnalyticsError::configuration("forecast_horizon must be >= 1"));
        }

        validate_smoothing("alpha", self.alpha)?;
        validate_smoothing("beta", self.beta)?;
        let needs_grid = self.alpha == SmoothingParam::Auto || self.beta == SmoothingParam::Auto;
        if needs_grid {
            if self.smoothing_grid.is_empty() {
                return Err(AnalyticsError::configuration(
                    "smoothing_grid cannot be empty when alpha or beta is auto",
                ));
            }
            for v in &self.smoothing_grid {
                validate_smoothing("smoothing_grid value", SmoothingParam::Fixed(*v))?;
            }
        }

        if !open_unit(self.confidence_level) {
            return Err(AnalyticsError::configuration(format!(
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }

        let abc = self.abc_thresholds;
        if !(open_unit(abc.a) && open_unit(abc.b) && abc.a < abc.b) {
            return Err(AnalyticsError::configuration(format!(
                "abc thresholds must satisfy 0 < a < b < 1, got a={}, b={}",
                abc.a, abc.b
            )));
        }

        let xyz = self.xyz_thresholds;
        if !(xyz.x.is_finite() && xyz.y.is_finite() && 0.0 < xyz.x && xyz.x < xyz.y) {
            return Err(AnalyticsError::configuration(format!(
                "xyz thresholds must satisfy 0 < x < y, got x={}, y={}",
                xyz.x, xyz.y
            )));
        }

        let levels = self.service_levels;
        for (name, z) in [("a", levels.a), ("b", levels.b), ("c", levels.c)] {
            if !(z.is_finite() && z >= 0.0) {
                return Err(AnalyticsError::configuration(format!(
                    "service level z for class {name} must be finite and >= 0, got {z}"
                )));
            }
        }

        if self.review_period_days == 0 {
            return Err(AnalyticsError::configuration("review_period_days must be >= 1"));
        }
        if self.default_lead_time_days == 0 {
            return Err(AnalyticsError::configuration("default_lead_time_days must be >= 1"));
        }
        if !(self.overstock_multiplier.is_finite() && self.overstock_multiplier > 0.0) {
            return Err(AnalyticsError::configuration(format!(
                "overstock_multiplier must be finite and > 0, got {}",
                self.overstock_multiplier
            )));
        }
        if self.slow_moving_periods == 0 {
            return Err(AnalyticsError::configuration("slow_moving_periods must be >= 1"));
        }
        if self.stale_after_days == 0 {
            return Err(AnalyticsError::configuration("stale_after_days must be >= 1"));
        }
        if self.max_workers == Some(0) {
            return Err(AnalyticsError::configuration("max_workers must be >= 1 when set"));
        }

        Ok(())
    }
}

fn open_unit(v: f64) -> bool {
    v.is_finite() && 0.0 < v && v < 1.0
}

fn validate_smoothing(name: &str, param: SmoothingParam) -> AnalyticsResult<()> {
    match param {
        SmoothingParam::Auto => Ok(()),
        SmoothingParam::Fixed(v) if open_unit(v) => Ok(()),
        SmoothingParam::Fixed(v) => Err(AnalyticsError::configuration(format!(
            "{name} must be in (0, 1), got {v}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        AnalyticsConfig::default().validate().unwrap();
    }

    #[test]
    fn out_of_range_smoothing_fails_fast() {
        let cfg = AnalyticsConfig::default().with_smoothing(SmoothingParam::Fixed(1.0), SmoothingParam::Auto);
        assert!(matches!(cfg.validate(), Err(AnalyticsError::Configuration(_))));

        let cfg = AnalyticsConfig::default().with_smoothing(SmoothingParam::Fixed(0.5), SmoothingParam::Fixed(-0.1));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn thresholds_must_be_ordered_and_inside_unit_interval() {
        let mut cfg = AnalyticsConfig::default();
        cfg.abc_thresholds = AbcThresholds { a: 0.95, b: 0.80 };
        assert!(cfg.validate().is_err());

        let mut cfg = AnalyticsConfig::default();
        cfg.abc_thresholds = AbcThresholds { a: 0.80, b: 1.2 };
        assert!(cfg.validate().is_err());

        let mut cfg = AnalyticsConfig::default();
        cfg.confidence_level = 1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn smoothing_defaults_to_auto() {
        assert_eq!(SmoothingParam::default(), SmoothingParam::Auto);
        assert_eq!(AnalyticsConfig::default().alpha, SmoothingParam::Auto);
    }

    #[test]
    fn zero_window_is_rejected() {
        let cfg = AnalyticsConfig::default().with_window_periods(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults_and_accepts_auto_keyword() {
        let cfg: AnalyticsConfig = serde_json::from_str(
            r#"{ "window_periods": 26, "period_granularity": "month", "alpha": 0.3, "beta": "auto" }"#,
        )
        .unwrap();
        assert_eq!(cfg.window_periods, 26);
        assert_eq!(cfg.period_granularity, PeriodGranularity::Month);
        assert_eq!(cfg.alpha, SmoothingParam::Fixed(0.3));
        assert_eq!(cfg.beta, SmoothingParam::Auto);
        assert_eq!(cfg.abc_thresholds, AbcThresholds::default());
    }

    #[test]
    fn unknown_smoothing_keyword_is_a_parse_error() {
        let res: Result<AnalyticsConfig, _> = serde_json::from_str(r#"{ "alpha": "fast" }"#);
        assert!(res.is_err());
    }

    #[test]
    fn smoothing_round_trips_through_json() {
        let json = serde_json::to_string(&SmoothingParam::Auto).unwrap();
        assert_eq!(json, "\"auto\"");
        let back: SmoothingParam = serde_json::from_str("0.7").unwrap();
        assert_eq!(back, SmoothingParam::Fixed(0.7));
    }
}
