//! The analytics pipeline.
//!
//! transactions → per-SKU usage series → {forecast, statistics} → ABC/XYZ
//! ranking → reorder policies → alerts → snapshot.
//!
//! Per-SKU work fans out over the bounded worker pool. The ABC ranking is
//! population-wide and runs after the join. Per-SKU failures become
//! diagnostics; only configuration, source and cancellation errors fail a run.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Span, debug, info, instrument, warn};

use stockwise_core::{AnalyticsError, AnalyticsResult, Period, RunId, SkuId};
use stockwise_inventory::{Aggregator, BookMetadata, InventoryTransaction, UsageSeries, group_by_sku, latest_movements};

use crate::accuracy::evaluate_accuracy;
use crate::alerts::{AlertGenerator, AlertInputs};
use crate::cancel::CancellationToken;
use crate::classify::{Classification, Classifier, SkuProfile};
use crate::config::AnalyticsConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Stage};
use crate::forecast::{DemandForecast, Forecaster};
use crate::pool::fan_out;
use crate::reorder::{ReorderCalculator, ReorderPolicy};
use crate::snapshot::{AnalyticsSnapshot, ClassMatrix, RunReport};
use crate::source::{CatalogReader, SkuScope, StockLevelReader, TransactionHistoryReader};

/// Fully materialised input of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsInput {
    pub as_of: DateTime<Utc>,
    #[serde(default)]
    pub transactions: Vec<InventoryTransaction>,
    /// On-hand quantity per SKU. SKUs missing here are not evaluated for alerts.
    #[serde(default)]
    pub current_stock: BTreeMap<SkuId, i64>,
    /// Last stock movement per SKU, for movements older than the transaction history.
    #[serde(default)]
    pub last_movement: BTreeMap<SkuId, DateTime<Utc>>,
    #[serde(default)]
    pub catalog: BTreeMap<SkuId, BookMetadata>,
    /// Supplier lead time per SKU; the configured default applies otherwise.
    #[serde(default)]
    pub lead_time_days: BTreeMap<SkuId, i64>,
    /// Per-SKU service-level z replacing the class default.
    #[serde(default)]
    pub service_level_overrides: BTreeMap<SkuId, f64>,
    /// Forecasts from earlier runs, scored for accuracy.
    #[serde(default)]
    pub previous_forecasts: Vec<DemandForecast>,
}

impl AnalyticsInput {
    pub fn new(as_of: DateTime<Utc>) -> Self {
        Self {
            as_of,
            transactions: Vec::new(),
            current_stock: BTreeMap::new(),
            last_movement: BTreeMap::new(),
            catalog: BTreeMap::new(),
            lead_time_days: BTreeMap::new(),
            service_level_overrides: BTreeMap::new(),
            previous_forecasts: Vec::new(),
        }
    }

    pub fn with_transactions(mut self, transactions: Vec<InventoryTransaction>) -> Self {
        self.transactions = transactions;
        self
    }

    pub fn with_stock(mut self, sku: SkuId, on_hand: i64) -> Self {
        self.current_stock.insert(sku, on_hand);
        self
    }

    pub fn with_book(mut self, book: BookMetadata) -> Self {
        self.catalog.insert(book.sku.clone(), book);
        self
    }

    pub fn with_lead_time(mut self, sku: SkuId, days: i64) -> Self {
        self.lead_time_days.insert(sku, days);
        self
    }

    pub fn with_service_level(mut self, sku: SkuId, z: f64) -> Self {
        self.service_level_overrides.insert(sku, z);
        self
    }

    pub fn with_previous_forecasts(mut self, forecasts: Vec<DemandForecast>) -> Self {
        self.previous_forecasts = forecasts;
        self
    }

    /// Drop everything outside `scope`.
    pub fn restrict_to(&mut self, scope: &SkuScope) {
        if *scope == SkuScope::All {
            return;
        }
        self.transactions.retain(|tx| scope.allows(&tx.sku));
        self.current_stock.retain(|sku, _| scope.allows(sku));
        self.last_movement.retain(|sku, _| scope.allows(sku));
        self.catalog.retain(|sku, _| scope.allows(sku));
        self.lead_time_days.retain(|sku, _| scope.allows(sku));
        self.service_level_overrides.retain(|sku, _| scope.allows(sku));
        self.previous_forecasts.retain(|f| scope.allows(&f.sku));
    }
}

/// Per-run parameters when the input is pulled from collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub as_of: DateTime<Utc>,
    pub scope: SkuScope,
    pub lead_time_days: BTreeMap<SkuId, i64>,
    pub service_level_overrides: BTreeMap<SkuId, f64>,
    pub previous_forecasts: Vec<DemandForecast>,
}

impl RunRequest {
    pub fn new(as_of: DateTime<Utc>) -> Self {
        Self {
            as_of,
            scope: SkuScope::All,
            lead_time_days: BTreeMap::new(),
            service_level_overrides: BTreeMap::new(),
            previous_forecasts: Vec::new(),
        }
    }

    pub fn with_scope(mut self, scope: SkuScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_lead_times(mut self, lead_time_days: BTreeMap<SkuId, i64>) -> Self {
        self.lead_time_days = lead_time_days;
        self
    }

    pub fn with_previous_forecasts(mut self, forecasts: Vec<DemandForecast>) -> Self {
        self.previous_forecasts = forecasts;
        self
    }
}

/// Per-SKU output of the parallel stage.
struct SkuAnalysis {
    series: UsageSeries,
    forecast: DemandForecast,
    profile: SkuProfile,
}

type SkuOutcome = (SkuId, Result<SkuAnalysis, (Stage, AnalyticsError)>);

/// Batch analytics engine.
///
/// Holds only validated configuration; every run is an independent, pure
/// transform of its input.
#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    config: AnalyticsConfig,
    aggregator: Aggregator,
    forecaster: Forecaster,
    classifier: Classifier,
    reorder: ReorderCalculator,
    alerts: AlertGenerator,
}

impl AnalyticsEngine {
    /// Validate `config` and build the pipeline stages.
    pub fn new(config: AnalyticsConfig) -> AnalyticsResult<Self> {
        let forecaster = Forecaster::from_config(&config)?;
        Ok(Self {
            aggregator: Aggregator::new(config.period_granularity, config.window_periods)
                .with_min_history_periods(config.min_history_periods),
            classifier: Classifier::from_config(&config),
            reorder: ReorderCalculator::from_config(&config),
            alerts: AlertGenerator::from_config(&config),
            forecaster,
            config,
        })
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Run the full pipeline over a materialised input.
    #[instrument(
        name = "analytics_run",
        skip_all,
        fields(as_of = %input.as_of, run_id, skus),
        err
    )]
    pub fn run(&self, input: &AnalyticsInput, cancel: &CancellationToken) -> AnalyticsResult<RunReport> {
        let run_id = RunId::new();
        let span = Span::current();
        span.record("run_id", tracing::field::display(run_id));

        if cancel.is_cancelled() {
            return Err(AnalyticsError::Cancelled);
        }

        let as_of = input.as_of;
        let window = self.aggregator.window(as_of)?;
        let mut diagnostics = Vec::new();

        let excluded = self.validate_input(input, &mut diagnostics);

        let mut by_sku = group_by_sku(&input.transactions);
        for sku in input.catalog.keys().chain(input.current_stock.keys()) {
            by_sku.entry(sku.clone()).or_default();
        }
        by_sku.retain(|sku, _| !excluded.contains(sku));
        let work: Vec<(SkuId, Vec<&InventoryTransaction>)> = by_sku.into_iter().collect();

        span.record("skus", work.len());
        info!(
            run_id = %run_id,
            skus = work.len(),
            transactions = input.transactions.len(),
            periods = window.len(),
            "analytics run started"
        );

        // Per-SKU stage, then the barrier.
        let outcomes: Vec<SkuOutcome> = fan_out(&work, self.config.effective_workers(), cancel, |(sku, txs)| {
            let list_price = input.catalog.get(sku).map(|b| b.list_price);
            (sku.clone(), self.analyse_sku(sku, txs, &window, as_of, list_price))
        })?;

        let mut series = BTreeMap::new();
        let mut forecasts = BTreeMap::new();
        let mut profiles = Vec::with_capacity(outcomes.len());
        for (sku, outcome) in outcomes {
            match outcome {
                Ok(analysis) => {
                    if analysis.series.insufficient_history {
                        debug!(run_id = %run_id, sku = %sku, "insufficient history; using historical mean");
                        diagnostics.push(Diagnostic::insufficient_history(
                            sku.clone(),
                            analysis.series.nonzero_sales_periods(),
                            self.config.min_history_periods,
                        ));
                    }
                    profiles.push(analysis.profile);
                    forecasts.insert(sku.clone(), analysis.forecast);
                    series.insert(sku, analysis.series);
                }
                Err((stage, err)) => {
                    warn!(run_id = %run_id, sku = %sku, stage = ?stage, error = %err, "sku excluded from run");
                    diagnostics.push(Diagnostic::from_error(Some(sku), stage, &err));
                }
            }
        }

        let classifications = self.classifier.rank(profiles);

        let mut policies = BTreeMap::new();
        for (sku, forecast) in &forecasts {
            if cancel.is_cancelled() {
                return Err(AnalyticsError::Cancelled);
            }
            let Some(classification) = classifications.get(sku) else {
                continue;
            };
            match self.policy_for(input, forecast, classification) {
                Ok(policy) => {
                    policies.insert(sku.clone(), policy);
                }
                Err(err) => {
                    warn!(run_id = %run_id, sku = %sku, error = %err, "reorder policy could not be computed");
                    diagnostics.push(Diagnostic::from_error(Some(sku.clone()), Stage::Reorder, &err));
                }
            }
        }

        let current_stock: BTreeMap<SkuId, i64> = input
            .current_stock
            .iter()
            .filter(|(sku, _)| classifications.contains_key(*sku))
            .map(|(sku, qty)| (sku.clone(), *qty))
            .collect();
        for sku in policies.keys().filter(|sku| !current_stock.contains_key(*sku)) {
            diagnostics.push(Diagnostic::new(
                Some(sku.clone()),
                DiagnosticKind::MissingStockLevel,
                Stage::Alerts,
                "no current stock level; stock alerts not evaluated",
            ));
        }

        let last_movement = merge_last_movements(&input.last_movement, &input.transactions, as_of);
        let periods_without_sales: BTreeMap<SkuId, usize> = series
            .iter()
            .map(|(sku, s)| (sku.clone(), s.trailing_periods_without_sales()))
            .collect();
        let alerts = self.alerts.generate_alerts(&AlertInputs {
            current_stock: &current_stock,
            policies: &policies,
            classifications: &classifications,
            last_movement: &last_movement,
            periods_without_sales: &periods_without_sales,
            as_of,
        });

        let accuracy = evaluate_accuracy(&input.previous_forecasts, &series, as_of);

        if cancel.is_cancelled() {
            return Err(AnalyticsError::Cancelled);
        }

        diagnostics.sort_by(|a, b| {
            a.sku
                .cmp(&b.sku)
                .then_with(|| a.stage.cmp(&b.stage))
                .then_with(|| a.kind.cmp(&b.kind))
        });

        let snapshot = AnalyticsSnapshot {
            run_id,
            as_of,
            granularity: self.config.period_granularity,
            class_matrix: ClassMatrix::from_classifications(classifications.values()),
            forecasts,
            classifications,
            policies,
            alerts,
            accuracy,
        };

        info!(
            run_id = %run_id,
            forecasts = snapshot.forecasts.len(),
            policies = snapshot.policies.len(),
            alerts = snapshot.alerts.len(),
            critical = snapshot.critical_alerts(),
            diagnostics = diagnostics.len(),
            "analytics run completed"
        );

        Ok(RunReport { snapshot, diagnostics })
    }

    /// Pull the input from collaborators, then [`run`](Self::run).
    ///
    /// History is read from the start of the analysis window up to `as_of`.
    pub fn run_from_sources<H, S, C>(
        &self,
        request: &RunRequest,
        history: &H,
        stock: &S,
        catalog: &C,
        cancel: &CancellationToken,
    ) -> AnalyticsResult<RunReport>
    where
        H: TransactionHistoryReader + ?Sized,
        S: StockLevelReader + ?Sized,
        C: CatalogReader + ?Sized,
    {
        let window = self.aggregator.window(request.as_of)?;
        let from = window.first().map_or(request.as_of, |p| p.start);
        let scope = &request.scope;

        let mut input = AnalyticsInput {
            as_of: request.as_of,
            transactions: history.transactions(scope, from, request.as_of)?,
            current_stock: stock.current_stock(scope)?,
            last_movement: stock.last_movements(scope)?,
            catalog: catalog.catalog(scope)?,
            lead_time_days: request.lead_time_days.clone(),
            service_level_overrides: request.service_level_overrides.clone(),
            previous_forecasts: request.previous_forecasts.clone(),
        };
        input.restrict_to(scope);

        self.run(&input, cancel)
    }

    /// Reject malformed per-SKU inputs up front. Returns the SKUs to exclude.
    fn validate_input(&self, input: &AnalyticsInput, diagnostics: &mut Vec<Diagnostic>) -> BTreeSet<SkuId> {
        let mut excluded = BTreeSet::new();
        let mut reject = |sku: &SkuId, err: AnalyticsError| {
            warn!(sku = %sku, error = %err, "sku excluded from run");
            diagnostics.push(Diagnostic::from_error(Some(sku.clone()), Stage::Input, &err));
            excluded.insert(sku.clone());
        };

        for (sku, days) in &input.lead_time_days {
            if *days <= 0 {
                reject(
                    sku,
                    AnalyticsError::validation(format!("lead time must be positive (sku={sku}, lead_time_days={days})")),
                );
            }
        }
        for (sku, on_hand) in &input.current_stock {
            if *on_hand < 0 {
                reject(
                    sku,
                    AnalyticsError::validation(format!("current stock must be non-negative (sku={sku}, on_hand={on_hand})")),
                );
            }
        }
        for (sku, z) in &input.service_level_overrides {
            if !(z.is_finite() && *z >= 0.0) {
                reject(
                    sku,
                    AnalyticsError::validation(format!(
                        "service level z must be finite and non-negative (sku={sku}, z={z})"
                    )),
                );
            }
        }
        for (sku, book) in &input.catalog {
            if &book.sku != sku {
                reject(
                    sku,
                    AnalyticsError::validation(format!("catalog entry {sku} describes sku {}", book.sku)),
                );
            } else if let Err(err) = book.validate() {
                reject(sku, err);
            }
        }

        excluded
    }

    fn analyse_sku(
        &self,
        sku: &SkuId,
        transactions: &[&InventoryTransaction],
        window: &[Period],
        as_of: DateTime<Utc>,
        list_price: Option<f64>,
    ) -> Result<SkuAnalysis, (Stage, AnalyticsError)> {
        let series = self
            .aggregator
            .aggregate_sku(sku, transactions, window, as_of, list_price)
            .map_err(|e| (Stage::Aggregation, e))?;

        let forecast = self.forecaster.forecast(&series, self.config.forecast_horizon);
        if !(forecast.point_estimate.is_finite() && forecast.upper_bound.is_finite()) {
            return Err((
                Stage::Forecast,
                AnalyticsError::computation(format!("forecast is not finite (sku={sku})")),
            ));
        }

        let profile = SkuProfile::from_series(&series).map_err(|e| (Stage::Classification, e))?;
        Ok(SkuAnalysis {
            series,
            forecast,
            profile,
        })
    }

    fn policy_for(
        &self,
        input: &AnalyticsInput,
        forecast: &DemandForecast,
        classification: &Classification,
    ) -> AnalyticsResult<ReorderPolicy> {
        let sku = &forecast.sku;
        let lead_time = input
            .lead_time_days
            .get(sku)
            .copied()
            .unwrap_or_else(|| i64::from(self.config.default_lead_time_days));
        let service_level = input.service_level_overrides.get(sku).copied();
        let case_pack = input.catalog.get(sku).and_then(|b| b.case_pack_size);
        self.reorder
            .compute_policy(forecast, classification, lead_time, service_level, case_pack)
    }
}

/// Latest known movement per SKU from both the stock reader and the history.
fn merge_last_movements(
    known: &BTreeMap<SkuId, DateTime<Utc>>,
    transactions: &[InventoryTransaction],
    as_of: DateTime<Utc>,
) -> BTreeMap<SkuId, DateTime<Utc>> {
    let mut merged = latest_movements(transactions, as_of);
    for (sku, at) in known {
        merged
            .entry(sku.clone())
            .and_modify(|current| *current = (*current).max(*at))
            .or_insert(*at);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertKind;
    use crate::classify::AbcClass;
    use chrono::{Duration, TimeZone};

    fn sku(s: &str) -> SkuId {
        SkuId::new(s).unwrap()
    }

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 18, 0, 0).unwrap()
    }

    fn weekly_sales(s: &str, sold: &[i64], price: f64) -> Vec<InventoryTransaction> {
        let n = sold.len() as i64;
        sold.iter()
            .enumerate()
            .filter(|(_, q)| **q > 0)
            .map(|(i, q)| {
                let at = as_of() - Duration::weeks(n - 1 - i as i64);
                InventoryTransaction::sale(sku(s), *q, at).with_unit_price(price)
            })
            .collect()
    }

    fn engine() -> AnalyticsEngine {
        AnalyticsEngine::new(AnalyticsConfig::default().with_window_periods(10).with_max_workers(2)).unwrap()
    }

    #[test]
    fn invalid_config_fails_construction() {
        let err = AnalyticsEngine::new(AnalyticsConfig::default().with_window_periods(0)).unwrap_err();
        assert!(matches!(err, AnalyticsError::Configuration(_)));
    }

    #[test]
    fn every_analysed_sku_gets_forecast_classification_and_policy() {
        let mut txs = weekly_sales("S1", &[10, 12, 9, 11, 10, 13, 8, 10, 12, 11], 20.0);
        txs.extend(weekly_sales("S2", &[1, 2, 1, 2, 1, 2, 1, 2, 1, 2], 5.0));
        let input = AnalyticsInput::new(as_of())
            .with_transactions(txs)
            .with_stock(sku("S1"), 500)
            .with_stock(sku("S2"), 500);

        let report = engine().run(&input, &CancellationToken::new()).unwrap();
        let snap = &report.snapshot;
        for s in ["S1", "S2"] {
            assert!(snap.forecasts.contains_key(&sku(s)));
            assert!(snap.classifications.contains_key(&sku(s)));
            assert!(snap.policies.contains_key(&sku(s)));
        }
        assert_eq!(snap.classifications[&sku("S1")].abc_class, AbcClass::A);
        assert_eq!(snap.class_matrix.total(), 2);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn non_positive_lead_time_excludes_only_that_sku() {
        let mut txs = weekly_sales("GOOD", &[5; 10], 10.0);
        txs.extend(weekly_sales("BAD", &[5; 10], 10.0));
        let input = AnalyticsInput::new(as_of())
            .with_transactions(txs)
            .with_lead_time(sku("BAD"), 0)
            .with_stock(sku("BAD"), 0);

        let report = engine().run(&input, &CancellationToken::new()).unwrap();
        assert!(report.snapshot.policies.contains_key(&sku("GOOD")));
        assert!(!report.snapshot.forecasts.contains_key(&sku("BAD")));
        assert!(!report.snapshot.classifications.contains_key(&sku("BAD")));
        assert!(report.snapshot.alerts_for(&sku("BAD")).next().is_none());

        let target = sku("BAD");
        let diag: Vec<_> = report.diagnostics_for(&target).collect();
        assert_eq!(diag.len(), 1);
        assert_eq!(diag[0].kind, DiagnosticKind::InputValidation);
        assert_eq!(report.excluded_skus(), vec![&sku("BAD")]);
    }

    #[test]
    fn negative_stock_level_excludes_the_sku() {
        let input = AnalyticsInput::new(as_of())
            .with_transactions(vec![InventoryTransaction::sale(sku("NEG"), 5, as_of()).with_unit_price(4.0)])
            .with_stock(sku("NEG"), -7);

        let report = engine().run(&input, &CancellationToken::new()).unwrap();
        assert!(report.snapshot.alerts_for(&sku("NEG")).next().is_none());
        assert!(!report.snapshot.classifications.contains_key(&sku("NEG")));

        let target = sku("NEG");
        let diag: Vec<_> = report.diagnostics_for(&target).collect();
        assert_eq!(diag.len(), 1);
        assert_eq!((diag[0].stage, diag[0].kind), (Stage::Input, DiagnosticKind::InputValidation));
    }

    #[test]
    fn service_level_override_replaces_class_default() {
        let mut txs = weekly_sales("S1", &[10; 10], 20.0);
        txs.extend(weekly_sales("S2", &[10; 10], 20.0));
        let input = AnalyticsInput::new(as_of())
            .with_transactions(txs)
            .with_service_level(sku("S1"), 2.5)
            .with_service_level(sku("S2"), f64::NAN);

        let report = engine().run(&input, &CancellationToken::new()).unwrap();
        assert_eq!(report.snapshot.policies[&sku("S1")].service_level_z, 2.5);
        assert!(!report.snapshot.policies.contains_key(&sku("S2")));
        assert_eq!(report.excluded_skus(), vec![&sku("S2")]);
    }

    #[test]
    fn negative_sale_quantity_rejects_the_sku_during_aggregation() {
        let mut txs = weekly_sales("OK", &[3; 10], 10.0);
        txs.push(InventoryTransaction::sale(sku("NEG"), -4, as_of()));
        let report = engine()
            .run(&AnalyticsInput::new(as_of()).with_transactions(txs), &CancellationToken::new())
            .unwrap();

        let target = sku("NEG");
        let diag: Vec<_> = report.diagnostics_for(&target).collect();
        assert_eq!(diag[0].stage, Stage::Aggregation);
        assert_eq!(diag[0].kind, DiagnosticKind::InputValidation);
        assert!(report.snapshot.forecasts.contains_key(&sku("OK")));
    }

    #[test]
    fn stock_only_skus_are_analysed_with_empty_history() {
        let input = AnalyticsInput::new(as_of()).with_stock(sku("IDLE"), 7);
        let report = engine().run(&input, &CancellationToken::new()).unwrap();
        let c = &report.snapshot.classifications[&sku("IDLE")];
        assert_eq!(c.abc_class, AbcClass::C);
        assert!((c.revenue_share - 1.0).abs() < 1e-12);
        assert!(report
            .diagnostics_for(&sku("IDLE"))
            .any(|d| d.kind == DiagnosticKind::InsufficientHistory));
    }

    #[test]
    fn stale_alert_uses_history_and_known_movements() {
        let old = as_of() - Duration::days(400);
        let mut input = AnalyticsInput::new(as_of())
            .with_transactions(vec![InventoryTransaction::receipt(sku("OLD"), 10, old)])
            .with_stock(sku("OLD"), 10);
        let report = engine().run(&input, &CancellationToken::new()).unwrap();
        assert!(report.snapshot.has_alert(&sku("OLD"), AlertKind::Stale));

        input.last_movement.insert(sku("OLD"), as_of() - Duration::days(2));
        let report = engine().run(&input, &CancellationToken::new()).unwrap();
        assert!(!report.snapshot.has_alert(&sku("OLD"), AlertKind::Stale));
    }

    #[test]
    fn missing_stock_level_is_reported() {
        let input = AnalyticsInput::new(as_of()).with_transactions(weekly_sales("S1", &[4; 10], 3.0));
        let report = engine().run(&input, &CancellationToken::new()).unwrap();
        assert!(report
            .diagnostics_for(&sku("S1"))
            .any(|d| d.kind == DiagnosticKind::MissingStockLevel));
        assert!(report.snapshot.alerts.is_empty());
    }

    #[test]
    fn cancelled_run_returns_no_snapshot() {
        let token = CancellationToken::new();
        token.cancel();
        let input = AnalyticsInput::new(as_of()).with_transactions(weekly_sales("S1", &[4; 10], 3.0));
        assert_eq!(engine().run(&input, &token).unwrap_err(), AnalyticsError::Cancelled);
    }

    #[test]
    fn runs_are_deterministic_apart_from_run_id() {
        let mut txs = weekly_sales("S1", &[10, 0, 30, 5, 0, 12, 40, 0, 2, 9], 12.5);
        txs.extend(weekly_sales("S2", &[3, 3, 4, 3, 3, 4, 3, 3, 4, 3], 8.0));
        let input = AnalyticsInput::new(as_of()).with_transactions(txs).with_stock(sku("S1"), 1);

        let first = engine().run(&input, &CancellationToken::new()).unwrap();
        let mut second = engine().run(&input, &CancellationToken::new()).unwrap();
        assert_ne!(first.snapshot.run_id, second.snapshot.run_id);
        second.snapshot.run_id = first.snapshot.run_id;
        assert_eq!(first, second);
    }

    #[test]
    fn restrict_to_scope_drops_other_skus() {
        let mut input = AnalyticsInput::new(as_of())
            .with_transactions(weekly_sales("S1", &[1; 3], 1.0))
            .with_stock(sku("S1"), 1)
            .with_stock(sku("S2"), 1);
        input.restrict_to(&SkuScope::Only(BTreeSet::from([sku("S2")])));
        assert!(input.transactions.is_empty());
        assert_eq!(input.current_stock.len(), 1);
    }
}
