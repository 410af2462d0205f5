//! Transaction aggregation: raw movements → per-SKU, per-period usage series.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use stockwise_core::{AnalyticsError, AnalyticsResult, Period, PeriodGranularity, SkuId};

use crate::catalog::BookMetadata;
use crate::transaction::{InventoryTransaction, TransactionKind};
use crate::usage::{UsageRecord, UsageSeries};

/// Output of a whole-population aggregation.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub series: BTreeMap<SkuId, UsageSeries>,
    /// SKUs whose transactions could not be aggregated, with the reason.
    pub rejected: BTreeMap<SkuId, AnalyticsError>,
}

/// Rolls transactions into fixed-length usage series.
///
/// Deterministic and side-effect free: the same transactions, `as_of` and
/// settings always yield the same series.
#[derive(Debug, Clone)]
pub struct Aggregator {
    granularity: PeriodGranularity,
    window_periods: u32,
    min_history_periods: u32,
}

impl Aggregator {
    pub fn new(granularity: PeriodGranularity, window_periods: u32) -> Self {
        Self {
            granularity,
            window_periods,
            min_history_periods: 3,
        }
    }

    pub fn with_min_history_periods(mut self, periods: u32) -> Self {
        self.min_history_periods = periods;
        self
    }

    pub fn granularity(&self) -> PeriodGranularity {
        self.granularity
    }

    /// The analysis window ending with the period that contains `as_of`.
    pub fn window(&self, as_of: DateTime<Utc>) -> AnalyticsResult<Vec<Period>> {
        self.granularity.trailing_window(as_of, self.window_periods)
    }

    /// Aggregate every SKU found in `transactions` or `catalog`.
    ///
    /// Per-SKU failures are collected in [`Aggregation::rejected`]; only a window
    /// that cannot be computed fails the whole call.
    pub fn aggregate(
        &self,
        transactions: &[InventoryTransaction],
        as_of: DateTime<Utc>,
        catalog: &BTreeMap<SkuId, BookMetadata>,
    ) -> AnalyticsResult<Aggregation> {
        let window = self.window(as_of)?;
        let mut by_sku = group_by_sku(transactions);
        for sku in catalog.keys() {
            by_sku.entry(sku.clone()).or_default();
        }

        let mut out = Aggregation::default();
        for (sku, txs) in by_sku {
            let list_price = catalog.get(&sku).map(|b| b.list_price);
            match self.aggregate_sku(&sku, &txs, &window, as_of, list_price) {
                Ok(series) => {
                    out.series.insert(sku, series);
                }
                Err(e) => {
                    out.rejected.insert(sku, e);
                }
            }
        }
        Ok(out)
    }

    /// Build the usage series of one SKU over a precomputed `window`.
    ///
    /// Transactions outside the window or after `as_of` are ignored. Transactions
    /// belonging to another SKU are a caller bug and rejected.
    pub fn aggregate_sku(
        &self,
        sku: &SkuId,
        transactions: &[&InventoryTransaction],
        window: &[Period],
        as_of: DateTime<Utc>,
        list_price: Option<f64>,
    ) -> AnalyticsResult<UsageSeries> {
        for tx in transactions {
            if &tx.sku != sku {
                return Err(AnalyticsError::validation(format!(
                    "transaction for sku {} passed to aggregation of sku {sku}",
                    tx.sku
                )));
            }
            tx.validate()?;
        }

        let mut sorted: Vec<&InventoryTransaction> = transactions.to_vec();
        sorted.sort_by_key(|tx| tx.occurred_at);

        let mut buckets: Vec<Bucket> = vec![Bucket::default(); window.len()];
        let mut cursor = 0usize;

        for tx in sorted {
            if tx.occurred_at > as_of {
                break;
            }
            while cursor < window.len() && window[cursor].end <= tx.occurred_at {
                cursor += 1;
            }
            if cursor == window.len() {
                break;
            }
            if !window[cursor].contains(tx.occurred_at) {
                // Before the window start.
                continue;
            }
            buckets[cursor].add(tx).map_err(|what| {
                AnalyticsError::computation(format!(
                    "{what} overflowed in period starting {} (sku={sku})",
                    window[cursor].start
                ))
            })?;
        }

        let fallback_price = list_price.unwrap_or(0.0);
        let records: Vec<UsageRecord> = window
            .iter()
            .zip(buckets)
            .map(|(period, bucket)| UsageRecord {
                quantity_sold: bucket.sold,
                quantity_received: bucket.received,
                quantity_adjusted: bucket.adjusted,
                unit_revenue: bucket.unit_revenue().unwrap_or(fallback_price),
                ..UsageRecord::empty(sku.clone(), *period, fallback_price)
            })
            .collect();

        let nonzero = records.iter().filter(|r| r.quantity_sold > 0).count();
        Ok(UsageSeries {
            sku: sku.clone(),
            granularity: self.granularity,
            records,
            insufficient_history: nonzero < self.min_history_periods as usize,
        })
    }
}

/// Group transactions per SKU, preserving input order within a SKU.
pub fn group_by_sku(transactions: &[InventoryTransaction]) -> BTreeMap<SkuId, Vec<&InventoryTransaction>> {
    let mut by_sku: BTreeMap<SkuId, Vec<&InventoryTransaction>> = BTreeMap::new();
    for tx in transactions {
        by_sku.entry(tx.sku.clone()).or_default().push(tx);
    }
    by_sku
}

/// Latest stock movement per SKU at or before `as_of`, over the full history.
pub fn latest_movements(
    transactions: &[InventoryTransaction],
    as_of: DateTime<Utc>,
) -> BTreeMap<SkuId, DateTime<Utc>> {
    let mut latest: BTreeMap<SkuId, DateTime<Utc>> = BTreeMap::new();
    for tx in transactions.iter().filter(|tx| tx.is_movement() && tx.occurred_at <= as_of) {
        latest
            .entry(tx.sku.clone())
            .and_modify(|at| *at = (*at).max(tx.occurred_at))
            .or_insert(tx.occurred_at);
    }
    latest
}

#[derive(Debug, Clone, Default)]
struct Bucket {
    sold: u64,
    received: u64,
    adjusted: i64,
    priced_units: u64,
    priced_revenue: f64,
}

impl Bucket {
    fn add(&mut self, tx: &InventoryTransaction) -> Result<(), &'static str> {
        match tx.kind {
            TransactionKind::Sale => {
                let qty = tx.quantity.unsigned_abs();
                self.sold = self.sold.checked_add(qty).ok_or("quantity sold")?;
                if let Some(price) = tx.unit_price {
                    self.priced_units = self.priced_units.checked_add(qty).ok_or("priced units")?;
                    self.priced_revenue += price * qty as f64;
                }
            }
            TransactionKind::Receipt => {
                let qty = tx.quantity.unsigned_abs();
                self.received = self.received.checked_add(qty).ok_or("quantity received")?;
            }
            TransactionKind::Adjustment => {
                self.adjusted = self
                    .adjusted
                    .checked_add(tx.quantity)
                    .ok_or("quantity adjusted")?;
            }
        }
        Ok(())
    }

    /// Quantity-weighted realised price, if any sale in the bucket carried one.
    fn unit_revenue(&self) -> Option<f64> {
        (self.priced_units > 0).then(|| self.priced_revenue / self.priced_units as f64)
    }
}
