//! Collaborator boundary.
//!
//! The engine does not own storage: transaction history, stock levels and
//! book metadata come from readers supplied by the caller. Readers are
//! storage and runtime agnostic.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use thiserror::Error;

use stockwise_core::{AnalyticsError, SkuId};
use stockwise_inventory::{BookMetadata, InventoryTransaction};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("source returned invalid data: {0}")]
    InvalidData(String),
}

impl From<SourceError> for AnalyticsError {
    fn from(value: SourceError) -> Self {
        AnalyticsError::source(value.to_string())
    }
}

/// Which SKUs a run covers.
///
/// - `All`: every SKU the readers know about.
/// - `Only`: only the listed SKUs (partial reruns).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SkuScope {
    #[default]
    All,
    Only(BTreeSet<SkuId>),
}

impl SkuScope {
    pub fn allows(&self, sku: &SkuId) -> bool {
        match self {
            SkuScope::All => true,
            SkuScope::Only(skus) => skus.contains(sku),
        }
    }
}

/// Historical receipts, sales and adjustments.
pub trait TransactionHistoryReader: Send + Sync {
    /// Transactions with `from <= occurred_at <= to`.
    fn transactions(
        &self,
        scope: &SkuScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<InventoryTransaction>, SourceError>;
}

/// Current on-hand quantities and last movement dates.
pub trait StockLevelReader: Send + Sync {
    fn current_stock(&self, scope: &SkuScope) -> Result<BTreeMap<SkuId, i64>, SourceError>;

    fn last_movements(&self, scope: &SkuScope) -> Result<BTreeMap<SkuId, DateTime<Utc>>, SourceError>;
}

pub trait CatalogReader: Send + Sync {
    fn catalog(&self, scope: &SkuScope) -> Result<BTreeMap<SkuId, BookMetadata>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_filters_skus() {
        let s1 = SkuId::new("S1").unwrap();
        let s2 = SkuId::new("S2").unwrap();
        assert!(SkuScope::All.allows(&s1));

        let only = SkuScope::Only(BTreeSet::from([s1.clone()]));
        assert!(only.allows(&s1));
        assert!(!only.allows(&s2));
    }

    #[test]
    fn source_errors_convert_to_run_errors() {
        let err: AnalyticsError = SourceError::Unavailable("history store down".into()).into();
        assert!(matches!(err, AnalyticsError::Source(msg) if msg.contains("history store down")));
    }
}
