//! Inventory domain inputs for the analytics engine.
//!
//! This crate contains the raw movement and catalog types plus the
//! transaction aggregator, implemented as deterministic domain logic
//! (no IO, no storage).

pub mod aggregator;
pub mod catalog;
pub mod transaction;
pub mod usage;

pub use aggregator::{Aggregation, Aggregator, group_by_sku, latest_movements};
pub use catalog::BookMetadata;
pub use transaction::{InventoryTransaction, TransactionKind};
pub use usage::{UsageRecord, UsageSeries};
