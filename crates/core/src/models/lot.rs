use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transaction::Transaction;

/// Unsold remainder of one Buy transaction.
///
/// Lots only exist while analytics are being computed (and in the open
/// positions they produce); they are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub source_transaction_id: Uuid,
    pub instrument: String,
    /// Always > 0: a lot that reaches zero is dropped.
    pub remaining_quantity: u64,
    pub unit_price: Decimal,
    pub timestamp: NaiveDateTime,
}

impl Lot {
    /// Open a lot covering the whole of a Buy.
    pub fn from_buy(tx: &Transaction) -> Self {
        debug_assert!(tx.is_buy());
        Self {
            source_transaction_id: tx.id(),
            instrument: tx.instrument().to_string(),
            remaining_quantity: tx.quantity(),
            unit_price: tx.unit_price(),
            timestamp: tx.timestamp(),
        }
    }

    /// `remaining_quantity × unit_price`
    pub fn cost_basis(&self) -> Decimal {
        Decimal::from(self.remaining_quantity) * self.unit_price
    }

    /// Take up to `wanted` units off this lot. Returns how many were taken.
    pub fn consume(&mut self, wanted: u64) -> u64 {
        let taken = wanted.min(self.remaining_quantity);
        self.remaining_quantity -= taken;
        taken
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_quantity == 0
    }
}
