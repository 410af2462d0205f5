use serde::{Deserialize, Serialize};

use stockwise_core::{AnalyticsError, SkuId};

/// Book metadata supplied by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookMetadata {
    pub sku: SkuId,
    #[serde(default)]
    pub title: String,
    /// List price per unit, used as unit revenue when sales carry no price.
    pub list_price: f64,
    /// Supplier case/pack size; order quantities are rounded up to a multiple of it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_pack_size: Option<u32>,
}

impl BookMetadata {
    pub fn new(sku: SkuId, title: impl Into<String>, list_price: f64) -> Self {
        Self {
            sku,
            title: title.into(),
            list_price,
            case_pack_size: None,
        }
    }

    pub fn with_case_pack_size(mut self, size: u32) -> Self {
        self.case_pack_size = Some(size);
        self
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if !(self.list_price.is_finite() && self.list_price >= 0.0) {
            return Err(AnalyticsError::validation(format!(
                "list price must be a finite non-negative number (sku={}, price={})",
                self.sku, self.list_price
            )));
        }
        if self.case_pack_size == Some(0) {
            return Err(AnalyticsError::validation(format!(
                "case pack size cannot be zero (sku={})",
                self.sku
            )));
        }
        Ok(())
    }
}
