//! Stock alerts.
//!
//! Each run produces a complete snapshot of alerts. No deduplication against
//! earlier runs happens here; consumers diff successive snapshots.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::SkuId;

use crate::classify::{Classification, XyzClass};
use crate::config::AnalyticsConfig;
use crate::reorder::ReorderPolicy;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    LowStock,
    Overstock,
    SlowMoving,
    Stale,
}

/// Ordered from least to most urgent.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub sku: SkuId,
    pub kind: AlertKind,
    pub severity: Severity,
    pub current_stock: i64,
    /// Threshold the stock was compared against (units, periods or days by kind).
    pub threshold: f64,
    pub raised_at: DateTime<Utc>,
    pub message: String,
}

/// Everything the generator looks at for one run.
#[derive(Debug, Clone, Copy)]
pub struct AlertInputs<'a> {
    pub current_stock: &'a BTreeMap<SkuId, i64>,
    pub policies: &'a BTreeMap<SkuId, ReorderPolicy>,
    pub classifications: &'a BTreeMap<SkuId, Classification>,
    pub last_movement: &'a BTreeMap<SkuId, DateTime<Utc>>,
    /// Trailing periods without a sale, per SKU.
    pub periods_without_sales: &'a BTreeMap<SkuId, usize>,
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AlertGenerator {
    overstock_multiplier: f64,
    slow_moving_periods: u32,
    stale_after_days: u32,
}

impl AlertGenerator {
    pub fn new(overstock_multiplier: f64, slow_moving_periods: u32, stale_after_days: u32) -> Self {
        Self {
            overstock_multiplier,
            slow_moving_periods,
            stale_after_days,
        }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::new(
            config.overstock_multiplier,
            config.slow_moving_periods,
            config.stale_after_days,
        )
    }

    /// Evaluate every SKU with a known stock level.
    ///
    /// Output is ordered by severity (critical first), then SKU, then kind.
    pub fn generate_alerts(&self, inputs: &AlertInputs<'_>) -> Vec<Alert> {
        let mut alerts = Vec::new();

        for (sku, &stock) in inputs.current_stock {
            let raise = |kind: AlertKind, severity: Severity, threshold: f64, message: String| Alert {
                sku: sku.clone(),
                kind,
                severity,
                current_stock: stock,
                threshold,
                raised_at: inputs.as_of,
                message,
            };

            if let Some(policy) = inputs.policies.get(sku) {
                if stock < policy.reorder_point as i64 {
                    let severity = if stock < policy.safety_stock as i64 {
                        Severity::Critical
                    } else {
                        Severity::Warning
                    };
                    alerts.push(raise(
                        AlertKind::LowStock,
                        severity,
                        policy.reorder_point as f64,
                        format!(
                            "{sku}: {stock} on hand is below the reorder point of {} (safety stock {})",
                            policy.reorder_point, policy.safety_stock
                        ),
                    ));
                }

                let ceiling = policy.suggested_order_qty as f64 * self.overstock_multiplier;
                if stock as f64 > ceiling {
                    alerts.push(raise(
                        AlertKind::Overstock,
                        Severity::Info,
                        ceiling,
                        format!(
                            "{sku}: {stock} on hand exceeds {:.1}x the suggested order quantity of {}",
                            self.overstock_multiplier, policy.suggested_order_qty
                        ),
                    ));
                }
            }

            let erratic = inputs
                .classifications
                .get(sku)
                .is_some_and(|c| c.xyz_class == XyzClass::Z);
            let idle_periods = inputs.periods_without_sales.get(sku).copied();
            if let (true, Some(idle)) = (erratic, idle_periods) {
                if idle >= self.slow_moving_periods as usize {
                    alerts.push(raise(
                        AlertKind::SlowMoving,
                        Severity::Warning,
                        f64::from(self.slow_moving_periods),
                        format!("{sku}: erratic demand and no sales in the last {idle} periods"),
                    ));
                }
            }

            if let Some(last) = inputs.last_movement.get(sku) {
                let idle_days = (inputs.as_of - *last).num_days();
                if idle_days >= i64::from(self.stale_after_days) {
                    alerts.push(raise(
                        AlertKind::Stale,
                        Severity::Info,
                        f64::from(self.stale_after_days),
                        format!("{sku}: no stock movement for {idle_days} days"),
                    ));
                }
            }
        }

        alerts.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.sku.cmp(&b.sku))
                .then_with(|| a.kind.cmp(&b.kind))
        });
        alerts
    }
}
