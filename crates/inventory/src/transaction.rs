use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::{AnalyticsError, SkuId};

/// Kind of stock movement recorded by the surrounding order/receiving system.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Goods received from a supplier (quantity >= 0).
    Receipt,
    /// Units sold to a customer (quantity >= 0).
    Sale,
    /// Signed stock correction (shrinkage, recount, damage).
    Adjustment,
}

/// Raw inventory transaction as read from the transaction history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub sku: SkuId,
    pub kind: TransactionKind,
    pub quantity: i64,
    /// Realised unit price for sales; falls back to the catalog list price when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    pub occurred_at: DateTime<Utc>,
}

impl InventoryTransaction {
    pub fn receipt(sku: SkuId, quantity: i64, occurred_at: DateTime<Utc>) -> Self {
        Self {
            sku,
            kind: TransactionKind::Receipt,
            quantity,
            unit_price: None,
            occurred_at,
        }
    }

    pub fn sale(sku: SkuId, quantity: i64, occurred_at: DateTime<Utc>) -> Self {
        Self {
            sku,
            kind: TransactionKind::Sale,
            quantity,
            unit_price: None,
            occurred_at,
        }
    }

    pub fn adjustment(sku: SkuId, delta: i64, occurred_at: DateTime<Utc>) -> Self {
        Self {
            sku,
            kind: TransactionKind::Adjustment,
            quantity: delta,
            unit_price: None,
            occurred_at,
        }
    }

    pub fn with_unit_price(mut self, unit_price: f64) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    /// True when the transaction changed on-hand stock.
    pub fn is_movement(&self) -> bool {
        self.quantity != 0
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        match self.kind {
            TransactionKind::Receipt | TransactionKind::Sale if self.quantity < 0 => {
                return Err(AnalyticsError::validation(format!(
                    "{:?} quantity cannot be negative (sku={}, quantity={}, at={})",
                    self.kind, self.sku, self.quantity, self.occurred_at
                )));
            }
            _ => {}
        }

        if let Some(price) = self.unit_price {
            if !(price.is_finite() && price >= 0.0) {
                return Err(AnalyticsError::validation(format!(
                    "unit price must be a finite non-negative number (sku={}, price={price})",
                    self.sku
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sku() -> SkuId {
        SkuId::new("978-1593278281").unwrap()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap()
    }

    #[test]
    fn negative_sales_and_receipts_are_rejected() {
        let err = InventoryTransaction::sale(sku(), -1, at()).validate().unwrap_err();
        assert!(matches!(err, AnalyticsError::InputValidation(_)));
        assert!(InventoryTransaction::receipt(sku(), -5, at()).validate().is_err());
    }

    #[test]
    fn adjustments_may_be_negative() {
        assert!(InventoryTransaction::adjustment(sku(), -3, at()).validate().is_ok());
    }

    #[test]
    fn non_finite_prices_are_rejected() {
        let tx = InventoryTransaction::sale(sku(), 1, at()).with_unit_price(f64::NAN);
        assert!(tx.validate().is_err());
    }
}
