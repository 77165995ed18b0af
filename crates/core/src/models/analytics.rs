use chrono::NaiveDateTime;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::lot::Lot;

/// Aggregates derived from the full transaction list.
///
/// Rebuilt from scratch on every request; holds no identity between calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsResult {
    /// Number of transactions the result was computed from
    pub transaction_count: usize,

    /// Sum of gross amounts of all Buy transactions
    pub total_investment: Decimal,

    /// Sum of gross amounts of all Sell transactions
    pub total_returns: Decimal,

    /// Sum over all sells of proceeds minus FIFO-matched cost basis
    pub realized_profit_loss: Decimal,

    /// Instrument → shares still held, from unconsumed lots
    pub open_positions: BTreeMap<String, OpenPosition>,

    /// Per-instrument breakdown, ordered by instrument
    pub instruments: Vec<InstrumentSummary>,

    /// Sells (or parts of sells) that found no lot to consume
    pub unmatched_sells: Vec<UnmatchedSell>,
}

impl AnalyticsResult {
    /// Cost basis of everything still held.
    pub fn total_open_cost_basis(&self) -> Decimal {
        self.open_positions.values().map(|p| p.cost_basis).sum()
    }

    pub fn has_unmatched_sells(&self) -> bool {
        !self.unmatched_sells.is_empty()
    }

    /// Realized profit/loss as a percentage of the cost basis of the shares sold.
    /// `None` when nothing matched a lot, or when the ratio is too large to
    /// represent (a near-zero cost basis).
    pub fn return_pct(&self) -> Option<Decimal> {
        let sold_cost: Decimal = self.instruments.iter().map(|i| i.matched_cost_basis).sum();
        if sold_cost.is_zero() {
            return None;
        }
        self.realized_profit_loss
            .checked_div(sold_cost)?
            .checked_mul(Decimal::ONE_HUNDRED)
    }

    pub fn instrument(&self, instrument: &str) -> Option<&InstrumentSummary> {
        self.instruments
            .binary_search_by(|s| s.instrument.as_str().cmp(instrument))
            .ok()
            .map(|idx| &self.instruments[idx])
    }
}

/// Shares of one instrument still held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub instrument: String,

    /// Sum of remaining lot quantities
    pub quantity: u128,

    /// Sum of `remaining_quantity × unit_price` over the lots
    pub cost_basis: Decimal,

    /// Remaining lots, oldest first
    pub lots: Vec<Lot>,
}

impl OpenPosition {
    /// Build a position from remaining lots. `None` if no lots remain.
    pub fn from_lots(instrument: &str, lots: Vec<Lot>) -> Option<Self> {
        if lots.is_empty() {
            return None;
        }
        let quantity = lots.iter().map(|l| u128::from(l.remaining_quantity)).sum();
        let cost_basis = lots.iter().map(Lot::cost_basis).sum();
        Some(Self {
            instrument: instrument.to_string(),
            quantity,
            cost_basis,
            lots,
        })
    }

    /// Average cost per held share.
    pub fn average_cost(&self) -> Decimal {
        if self.quantity == 0 {
            return Decimal::ZERO;
        }
        Decimal::from_u128(self.quantity)
            .and_then(|q| self.cost_basis.checked_div(q))
            .unwrap_or(Decimal::ZERO)
    }
}

/// Cash flow and realized result for one instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSummary {
    pub instrument: String,

    /// Sum of Buy gross amounts
    pub invested: Decimal,

    /// Sum of Sell gross amounts
    pub returned: Decimal,

    /// Proceeds minus matched cost basis over this instrument's sells
    pub realized_profit_loss: Decimal,

    /// Cost basis of the lots consumed by sells
    pub matched_cost_basis: Decimal,

    pub bought_quantity: u128,
    pub sold_quantity: u128,

    /// Shares sold with no lot to match (counted at zero cost basis)
    pub unmatched_quantity: u128,
}

impl InstrumentSummary {
    pub fn new(instrument: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            ..Self::default()
        }
    }

    pub fn has_unmatched_sell(&self) -> bool {
        self.unmatched_quantity > 0
    }
}

/// A sell that exceeded the shares available to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedSell {
    pub transaction_id: Uuid,
    pub instrument: String,
    pub timestamp: NaiveDateTime,
    pub unmatched_quantity: u64,
}
