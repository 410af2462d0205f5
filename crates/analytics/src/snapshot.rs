use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::{PeriodGranularity, RunId, SkuId};

use crate::accuracy::AccuracyReport;
use crate::alerts::{Alert, AlertKind, Severity};
use crate::classify::{AbcClass, Classification, XyzClass};
use crate::diagnostics::Diagnostic;
use crate::forecast::DemandForecast;
use crate::reorder::ReorderPolicy;

/// SKU counts per ABC (rows) × XYZ (columns) class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMatrix {
    pub counts: [[usize; 3]; 3],
}

impl ClassMatrix {
    pub fn from_classifications<'a>(classifications: impl IntoIterator<Item = &'a Classification>) -> Self {
        let mut matrix = Self::default();
        for c in classifications {
            matrix.counts[c.abc_class.index()][c.xyz_class.index()] += 1;
        }
        matrix
    }

    pub fn count(&self, abc: AbcClass, xyz: XyzClass) -> usize {
        self.counts[abc.index()][xyz.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

/// Immutable result of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub run_id: RunId,
    pub as_of: DateTime<Utc>,
    pub granularity: PeriodGranularity,
    pub forecasts: BTreeMap<SkuId, DemandForecast>,
    pub classifications: BTreeMap<SkuId, Classification>,
    pub policies: BTreeMap<SkuId, ReorderPolicy>,
    /// Ordered by severity (critical first), then SKU, then kind.
    pub alerts: Vec<Alert>,
    pub class_matrix: ClassMatrix,
    pub accuracy: AccuracyReport,
}

impl AnalyticsSnapshot {
    pub fn alerts_for<'a>(&'a self, sku: &'a SkuId) -> impl Iterator<Item = &'a Alert> + 'a {
        self.alerts.iter().filter(move |a| &a.sku == sku)
    }

    pub fn has_alert(&self, sku: &SkuId, kind: AlertKind) -> bool {
        self.alerts_for(sku).any(|a| a.kind == kind)
    }

    pub fn critical_alerts(&self) -> usize {
        self.alerts.iter().filter(|a| a.severity == Severity::Critical).count()
    }
}

/// Snapshot plus everything excluded or degraded along the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub snapshot: AnalyticsSnapshot,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    pub fn diagnostics_for<'a>(&'a self, sku: &'a SkuId) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics.iter().filter(move |d| d.sku.as_ref() == Some(sku))
    }

    /// SKUs that were dropped from every output.
    pub fn excluded_skus(&self) -> Vec<&SkuId> {
        let mut skus: Vec<&SkuId> = self
            .diagnostics
            .iter()
            .filter_map(|d| d.sku.as_ref())
            .filter(|sku| !self.snapshot.classifications.contains_key(*sku))
            .collect();
        skus.sort();
        skus.dedup();
        skus
    }
}
