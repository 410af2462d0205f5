use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::{Period, PeriodGranularity, SkuId};

/// Usage of one SKU over one period.
///
/// Immutable once aggregated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub sku: SkuId,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub quantity_sold: u64,
    pub quantity_received: u64,
    /// Net signed adjustment for the period.
    pub quantity_adjusted: i64,
    pub unit_revenue: f64,
}

impl UsageRecord {
    /// Zero-quantity record for a period without transactions.
    pub fn empty(sku: SkuId, period: Period, unit_revenue: f64) -> Self {
        Self {
            sku,
            period_start: period.start,
            period_end: period.end,
            quantity_sold: 0,
            quantity_received: 0,
            quantity_adjusted: 0,
            unit_revenue,
        }
    }

    pub fn period(&self) -> Period {
        Period {
            start: self.period_start,
            end: self.period_end,
        }
    }

    pub fn revenue(&self) -> f64 {
        self.quantity_sold as f64 * self.unit_revenue
    }
}

/// Chronological, gap-free usage of one SKU over the analysis window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSeries {
    pub sku: SkuId,
    pub granularity: PeriodGranularity,
    pub records: Vec<UsageRecord>,
    /// Too few non-zero sales periods to fit a smoothing model.
    pub insufficient_history: bool,
}

impl UsageSeries {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Units sold per period, oldest first.
    pub fn sold_quantities(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.quantity_sold as f64).collect()
    }

    pub fn total_sold(&self) -> u64 {
        self.records.iter().fold(0u64, |acc, r| acc.saturating_add(r.quantity_sold))
    }

    pub fn total_received(&self) -> u64 {
        self.records
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.quantity_received))
    }

    pub fn total_adjusted(&self) -> i64 {
        self.records
            .iter()
            .fold(0i64, |acc, r| acc.saturating_add(r.quantity_adjusted))
    }

    pub fn total_revenue(&self) -> f64 {
        self.records.iter().map(UsageRecord::revenue).sum()
    }

    pub fn nonzero_sales_periods(&self) -> usize {
        self.records.iter().filter(|r| r.quantity_sold > 0).count()
    }

    /// Number of most recent consecutive periods without a sale.
    ///
    /// Equals the series length when the SKU never sold in the window.
    pub fn trailing_periods_without_sales(&self) -> usize {
        self.records
            .iter()
            .rev()
            .take_while(|r| r.quantity_sold == 0)
            .count()
    }

    pub fn last_period(&self) -> Option<Period> {
        self.records.last().map(UsageRecord::period)
    }

    /// Record whose period starts at `start`, if it is inside the window.
    pub fn record_starting_at(&self, start: DateTime<Utc>) -> Option<&UsageRecord> {
        self.records
            .binary_search_by(|r| r.period_start.cmp(&start))
            .ok()
            .map(|idx| &self.records[idx])
    }
}
