use serde::{Deserialize, Serialize};

use stockwise_core::{AnalyticsError, SkuId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    InputValidation,
    InsufficientHistory,
    Computation,
    MissingStockLevel,
}

/// Pipeline stage that produced a diagnostic.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Input,
    Aggregation,
    Forecast,
    Classification,
    Reorder,
    Alerts,
}

/// Why a SKU was excluded from (or degraded in) a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub sku: Option<SkuId>,
    pub kind: DiagnosticKind,
    pub stage: Stage,
    pub message: String,
}

impl Diagnostic {
    pub fn new(sku: Option<SkuId>, kind: DiagnosticKind, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            sku,
            kind,
            stage,
            message: message.into(),
        }
    }

    pub fn insufficient_history(sku: SkuId, nonzero_periods: usize, required: u32) -> Self {
        Self::new(
            Some(sku),
            DiagnosticKind::InsufficientHistory,
            Stage::Aggregation,
            format!("{nonzero_periods} periods with sales, {required} required; using historical mean"),
        )
    }

    /// Map an engine error onto a per-SKU diagnostic.
    pub fn from_error(sku: Option<SkuId>, stage: Stage, err: &AnalyticsError) -> Self {
        let kind = match err {
            AnalyticsError::InputValidation(_) | AnalyticsError::InvalidId(_) => DiagnosticKind::InputValidation,
            _ => DiagnosticKind::Computation,
        };
        Self::new(sku, kind, stage, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_input_validation() {
        let sku = SkuId::new("S1").unwrap();
        let d = Diagnostic::from_error(
            Some(sku.clone()),
            Stage::Reorder,
            &AnalyticsError::validation("lead time must be positive"),
        );
        assert_eq!(d.kind, DiagnosticKind::InputValidation);
        assert_eq!(d.sku, Some(sku));
        assert!(d.message.contains("lead time"));
    }

    #[test]
    fn computation_errors_map_to_computation() {
        let d = Diagnostic::from_error(None, Stage::Forecast, &AnalyticsError::computation("overflow"));
        assert_eq!(d.kind, DiagnosticKind::Computation);
    }

    #[test]
    fn serializes_with_snake_case_tags() {
        let d = Diagnostic::insufficient_history(SkuId::new("S1").unwrap(), 1, 3);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "insufficient_history");
        assert_eq!(json["stage"], "aggregation");
    }
}
