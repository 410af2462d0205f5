//! In-memory collaborators for tests, demos and the CLI.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use stockwise_analytics::{
    AnalyticsInput, CatalogReader, SkuScope, SourceError, StockLevelReader, TransactionHistoryReader,
};
use stockwise_core::SkuId;
use stockwise_inventory::{BookMetadata, InventoryTransaction, latest_movements};

#[derive(Debug, Default)]
struct Inner {
    transactions: Vec<InventoryTransaction>,
    stock: BTreeMap<SkuId, i64>,
    last_movements: BTreeMap<SkuId, DateTime<Utc>>,
    catalog: BTreeMap<SkuId, BookMetadata>,
}

/// Thread-safe in-memory store implementing every reader trait.
#[derive(Debug, Default)]
pub struct InMemoryInventorySource {
    inner: RwLock<Inner>,
}

impl InMemoryInventorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a materialised run input.
    pub fn from_input(input: &AnalyticsInput) -> Self {
        let source = Self::new();
        {
            let mut inner = source.write();
            inner.transactions = input.transactions.clone();
            inner.stock = input.current_stock.clone();
            inner.last_movements = input.last_movement.clone();
            inner.catalog = input.catalog.clone();
        }
        source
    }

    pub fn record(&self, tx: InventoryTransaction) {
        self.write().transactions.push(tx);
    }

    pub fn set_stock(&self, sku: SkuId, on_hand: i64) {
        self.write().stock.insert(sku, on_hand);
    }

    pub fn set_last_movement(&self, sku: SkuId, at: DateTime<Utc>) {
        self.write().last_movements.insert(sku, at);
    }

    pub fn upsert_book(&self, book: BookMetadata) {
        self.write().catalog.insert(book.sku.clone(), book);
    }

    pub fn transaction_count(&self) -> usize {
        self.read().transactions.len()
    }

    // A poisoned lock only means a writer panicked mid-update of plain data.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn scoped<V: Clone>(map: &BTreeMap<SkuId, V>, scope: &SkuScope) -> BTreeMap<SkuId, V> {
    map.iter()
        .filter(|(sku, _)| scope.allows(sku))
        .map(|(sku, v)| (sku.clone(), v.clone()))
        .collect()
}

impl TransactionHistoryReader for InMemoryInventorySource {
    fn transactions(
        &self,
        scope: &SkuScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<InventoryTransaction>, SourceError> {
        if from > to {
            return Err(SourceError::InvalidData(format!("empty time range {from}..{to}")));
        }
        Ok(self
            .read()
            .transactions
            .iter()
            .filter(|tx| scope.allows(&tx.sku) && from <= tx.occurred_at && tx.occurred_at <= to)
            .cloned()
            .collect())
    }
}

impl StockLevelReader for InMemoryInventorySource {
    fn current_stock(&self, scope: &SkuScope) -> Result<BTreeMap<SkuId, i64>, SourceError> {
        Ok(scoped(&self.read().stock, scope))
    }

    /// Explicit entries merged with the latest recorded movement per SKU.
    fn last_movements(&self, scope: &SkuScope) -> Result<BTreeMap<SkuId, DateTime<Utc>>, SourceError> {
        let inner = self.read();
        let mut merged = latest_movements(&inner.transactions, DateTime::<Utc>::MAX_UTC);
        for (sku, at) in &inner.last_movements {
            merged
                .entry(sku.clone())
                .and_modify(|current| *current = (*current).max(*at))
                .or_insert(*at);
        }
        merged.retain(|sku, _| scope.allows(sku));
        Ok(merged)
    }
}

impl CatalogReader for InMemoryInventorySource {
    fn catalog(&self, scope: &SkuScope) -> Result<BTreeMap<SkuId, BookMetadata>, SourceError> {
        Ok(scoped(&self.read().catalog, scope))
    }
}
