//! `stockwise-analytics`
//!
//! **Responsibility:** inventory analytics over usage series.
//!
//! - Demand forecasting (Holt smoothing, degenerate mean for sparse history)
//! - ABC/XYZ classification
//! - Reorder policies and stock alerts
//! - The [`AnalyticsEngine`] that runs them as one batch
//!
//! The engine owns no storage. Inputs arrive fully materialised or through
//! the reader traits in [`source`]; outputs are immutable snapshots.

pub mod accuracy;
pub mod alerts;
pub mod cancel;
pub mod classify;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod forecast;
pub mod pool;
pub mod reorder;
pub mod snapshot;
pub mod source;
pub mod stats;

pub use accuracy::{AccuracyRecord, AccuracyReport, evaluate_accuracy};
pub use alerts::{Alert, AlertGenerator, AlertInputs, AlertKind, Severity};
pub use cancel::CancellationToken;
pub use classify::{AbcClass, Classification, Classifier, SkuProfile, XyzClass};
pub use config::{AbcThresholds, AnalyticsConfig, ServiceLevels, SmoothingParam, XyzThresholds};
pub use diagnostics::{Diagnostic, DiagnosticKind, Stage};
pub use engine::{AnalyticsEngine, AnalyticsInput, RunRequest};
pub use forecast::{DemandForecast, ForecastModel, Forecaster, ModelConfidence};
pub use reorder::{ReorderCalculator, ReorderPolicy};
pub use snapshot::{AnalyticsSnapshot, ClassMatrix, RunReport};
pub use source::{CatalogReader, SkuScope, SourceError, StockLevelReader, TransactionHistoryReader};
