//! Reorder policy: safety stock, reorder point and suggested order quantity.
//!
//! - safety stock  = z · σ_day · √L
//! - reorder point = d_day · L + safety stock
//! - order qty     = d_day · review period, rounded up to the case pack
//!
//! σ_day is recovered from the forecast band; d_day is the point estimate
//! spread over the forecast period. Outputs are whole units, rounded up.

use serde::{Deserialize, Serialize};

use stockwise_core::{AnalyticsError, AnalyticsResult, SkuId};

use crate::classify::Classification;
use crate::config::{AnalyticsConfig, ServiceLevels};
use crate::forecast::DemandForecast;

/// Largest quantity representable exactly in an f64.
const MAX_EXACT_UNITS: f64 = 9_007_199_254_740_992.0;

/// Invariant: `reorder_point >= safety_stock >= 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderPolicy {
    pub sku: SkuId,
    pub reorder_point: u64,
    pub safety_stock: u64,
    pub suggested_order_qty: u64,
    pub lead_time_days: u32,
    pub service_level_z: f64,
    pub daily_demand: f64,
}

#[derive(Debug, Clone)]
pub struct ReorderCalculator {
    review_period_days: u32,
    service_levels: ServiceLevels,
}

impl ReorderCalculator {
    pub fn new(review_period_days: u32, service_levels: ServiceLevels) -> Self {
        Self {
            review_period_days,
            service_levels,
        }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::new(config.review_period_days, config.service_levels)
    }

    /// Class-dependent default service level.
    pub fn default_service_level(&self, classification: &Classification) -> f64 {
        self.service_levels.for_class(classification.abc_class)
    }

    /// Derive the reorder policy of one SKU.
    ///
    /// `service_level_z` overrides the class default when set. Invalid inputs are
    /// rejected before any computation.
    pub fn compute_policy(
        &self,
        forecast: &DemandForecast,
        classification: &Classification,
        lead_time_days: i64,
        service_level_z: Option<f64>,
        case_pack_size: Option<u32>,
    ) -> AnalyticsResult<ReorderPolicy> {
        let sku = &forecast.sku;
        if &classification.sku != sku {
            return Err(AnalyticsError::validation(format!(
                "forecast for {sku} paired with classification for {}",
                classification.sku
            )));
        }
        if lead_time_days <= 0 {
            return Err(AnalyticsError::validation(format!(
                "lead time must be positive (sku={sku}, lead_time_days={lead_time_days})"
            )));
        }
        let lead_time = u32::try_from(lead_time_days).map_err(|_| {
            AnalyticsError::validation(format!("lead time too large (sku={sku}, lead_time_days={lead_time_days})"))
        })?;
        if !(forecast.point_estimate.is_finite() && forecast.point_estimate >= 0.0) {
            return Err(AnalyticsError::validation(format!(
                "forecast demand must be finite and non-negative (sku={sku}, demand={})",
                forecast.point_estimate
            )));
        }
        if !(forecast.upper_bound.is_finite() && forecast.upper_bound >= forecast.point_estimate) {
            return Err(AnalyticsError::validation(format!(
                "forecast band is malformed (sku={sku}, point={}, upper={})",
                forecast.point_estimate, forecast.upper_bound
            )));
        }
        let z = service_level_z.unwrap_or_else(|| self.default_service_level(classification));
        if !(z.is_finite() && z >= 0.0) {
            return Err(AnalyticsError::validation(format!(
                "service level z must be finite and non-negative (sku={sku}, z={z})"
            )));
        }
        if case_pack_size == Some(0) {
            return Err(AnalyticsError::validation(format!("case pack size cannot be zero (sku={sku})")));
        }

        let period_days = forecast.period_days();
        let daily_demand = forecast.point_estimate / period_days;
        let daily_std = forecast.implied_std_dev() / period_days.sqrt();
        let lead = f64::from(lead_time);

        let safety_stock = whole_units(sku, "safety stock", z * daily_std * lead.sqrt())?;
        let reorder_point = whole_units(sku, "reorder point", daily_demand * lead + safety_stock as f64)?;
        let review_demand = whole_units(sku, "order quantity", daily_demand * f64::from(self.review_period_days))?;

        let suggested_order_qty = match case_pack_size {
            Some(pack) => review_demand
                .div_ceil(u64::from(pack))
                .checked_mul(u64::from(pack))
                .ok_or_else(|| AnalyticsError::computation(format!("order quantity overflowed (sku={sku})")))?,
            None => review_demand,
        };

        Ok(ReorderPolicy {
            sku: sku.clone(),
            reorder_point: reorder_point.max(safety_stock),
            safety_stock,
            suggested_order_qty,
            lead_time_days: lead_time,
            service_level_z: z,
            daily_demand,
        })
    }
}

fn whole_units(sku: &SkuId, what: &str, value: f64) -> AnalyticsResult<u64> {
    if !value.is_finite() || value > MAX_EXACT_UNITS {
        return Err(AnalyticsError::computation(format!("{what} is out of range (sku={sku}, value={value})")));
    }
    Ok(value.max(0.0).ceil() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{AbcClass, XyzClass};
    use crate::forecast::{ForecastModel, ModelConfidence};
    use crate::stats::two_sided_z;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use stockwise_core::{Period, PeriodGranularity};

    fn sku() -> SkuId {
        SkuId::new("S1").unwrap()
    }

    fn week() -> Period {
        PeriodGranularity::Week
            .period_containing(Utc.with_ymd_and_hms(2024, 4, 3, 0, 0, 0).unwrap())
            .unwrap()
    }

    fn forecast(point: f64, sigma: f64) -> DemandForecast {
        let z = two_sided_z(0.90);
        DemandForecast {
            sku: sku(),
            forecast_period: Some(week()),
            granularity: PeriodGranularity::Week,
            horizon: 1,
            point_estimate: point,
            lower_bound: (point - z * sigma).max(0.0),
            upper_bound: point + z * sigma,
            model_confidence: ModelConfidence::Medium,
            model: ForecastModel::Holt { alpha: 0.5, beta: 0.1 },
            confidence_level: 0.90,
            residual_std_dev: sigma,
            in_sample_mae: sigma,
        }
    }

    fn classification(abc: AbcClass) -> Classification {
        Classification {
            sku: sku(),
            abc_class: abc,
            xyz_class: XyzClass::X,
            revenue_share: 1.0,
            coefficient_of_variation: Some(0.1),
            total_revenue: 100.0,
            rank: 1,
        }
    }

    fn calculator() -> ReorderCalculator {
        ReorderCalculator::new(30, ServiceLevels::default())
    }

    #[test]
    fn computes_textbook_policy() {
        // 70 units/week = 10/day, σ_week = √7 · 2 → σ_day = 2.
        let f = forecast(70.0, 2.0 * 7f64.sqrt());
        let p = calculator()
            .compute_policy(&f, &classification(AbcClass::A), 9, None, None)
            .unwrap();

        // safety = 1.645 · 2 · 3 = 9.87 → 10; rop = 90 + 10 = 100; qty = 300.
        assert_eq!(p.safety_stock, 10);
        assert_eq!(p.reorder_point, 100);
        assert_eq!(p.suggested_order_qty, 300);
        assert_eq!(p.service_level_z, 1.645);
        assert!((p.daily_demand - 10.0).abs() < 1e-9);
    }

    #[test]
    fn c_class_uses_lower_service_level_than_a_class() {
        let f = forecast(35.0, 10.0);
        let a = calculator().compute_policy(&f, &classification(AbcClass::A), 14, None, None).unwrap();
        let c = calculator().compute_policy(&f, &classification(AbcClass::C), 14, None, None).unwrap();
        assert!(a.safety_stock > c.safety_stock);
        assert_eq!(c.service_level_z, 0.842);
    }

    #[test]
    fn explicit_service_level_overrides_class_default() {
        let f = forecast(35.0, 10.0);
        let p = calculator()
            .compute_policy(&f, &classification(AbcClass::C), 14, Some(2.33), None)
            .unwrap();
        assert_eq!(p.service_level_z, 2.33);
    }

    #[test]
    fn order_quantity_rounds_up_to_case_pack() {
        let f = forecast(7.0, 0.0); // 1/day → 30 per review period
        let p = calculator()
            .compute_policy(&f, &classification(AbcClass::B), 7, None, Some(12))
            .unwrap();
        assert_eq!(p.suggested_order_qty, 36);
        assert_eq!(p.safety_stock, 0);
        assert_eq!(p.reorder_point, 7);
    }

    #[test]
    fn zero_or_negative_lead_time_is_rejected() {
        let f = forecast(10.0, 1.0);
        for lead in [0, -3] {
            let err = calculator()
                .compute_policy(&f, &classification(AbcClass::A), lead, None, None)
                .unwrap_err();
            assert!(matches!(err, AnalyticsError::InputValidation(_)));
        }
    }

    #[test]
    fn negative_demand_and_z_are_rejected() {
        let mut f = forecast(10.0, 1.0);
        f.point_estimate = -1.0;
        assert!(calculator().compute_policy(&f, &classification(AbcClass::A), 5, None, None).is_err());

        let f = forecast(10.0, 1.0);
        assert!(calculator()
            .compute_policy(&f, &classification(AbcClass::A), 5, Some(-1.0), None)
            .is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: every computed policy satisfies reorder_point >= safety_stock >= 0.
        #[test]
        fn reorder_point_dominates_safety_stock(
            point in 0.0f64..5_000.0,
            sigma in 0.0f64..2_000.0,
            lead in 1i64..365,
            z in 0.0f64..4.0,
            pack in prop::option::of(1u32..48)
        ) {
            let f = forecast(point, sigma);
            let p = calculator()
                .compute_policy(&f, &classification(AbcClass::B), lead, Some(z), pack)
                .unwrap();
            prop_assert!(p.reorder_point >= p.safety_stock);
            if let Some(pack) = pack {
                prop_assert_eq!(p.suggested_order_qty % u64::from(pack), 0);
            }
        }
    }
}
