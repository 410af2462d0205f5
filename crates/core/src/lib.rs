//! `stockwise-core`: shared building blocks for the analytics engine.
//!
//! This crate contains **pure** primitives (no IO, no runtime concerns).

pub mod error;
pub mod id;
pub mod period;

pub use error::{AnalyticsError, AnalyticsResult};
pub use id::{RunId, SkuId};
pub use period::{Period, PeriodGranularity};
