use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, VecDeque};

use crate::models::analytics::{AnalyticsResult, InstrumentSummary, OpenPosition, UnmatchedSell};
use crate::models::lot::Lot;
use crate::models::transaction::{Action, Transaction};

/// Computes portfolio analytics: cash flow totals, FIFO-matched realized
/// profit/loss, and open positions.
///
/// Pure business logic: no I/O and the input is never mutated. The result depends
/// only on which transactions are passed, never on their order in the slice:
/// each instrument's transactions are replayed by `(timestamp, id)`.
pub struct AnalyticsService;

impl AnalyticsService {
    pub fn new() -> Self {
        Self
    }

    /// Analytics over every transaction in the snapshot.
    pub fn compute(&self, transactions: &[Transaction]) -> AnalyticsResult {
        self.compute_from(transactions.iter())
    }

    /// Analytics over the transactions at or before `cutoff`.
    pub fn compute_as_of(
        &self,
        transactions: &[Transaction],
        cutoff: NaiveDateTime,
    ) -> AnalyticsResult {
        self.compute_from(transactions.iter().filter(|t| t.timestamp() <= cutoff))
    }

    fn compute_from<'a>(&self, transactions: impl Iterator<Item = &'a Transaction>) -> AnalyticsResult {
        // 1. Partition by instrument. BTreeMap keeps the visiting order fixed.
        let mut by_instrument: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
        let mut transaction_count = 0;
        for tx in transactions {
            transaction_count += 1;
            by_instrument.entry(tx.instrument()).or_default().push(tx);
        }

        let mut result = AnalyticsResult {
            transaction_count,
            ..AnalyticsResult::default()
        };

        for (instrument, mut group) in by_instrument {
            // 2. Replay in time order; the id breaks ties so equal timestamps
            //    are never reordered by price or by slice position.
            group.sort_by_key(|t| (t.timestamp(), t.id()));

            let mut queue = LotQueue::new(instrument);
            for tx in group {
                queue.apply(tx);
            }

            // 3. Fold the instrument into the totals
            let LotQueue {
                lots,
                summary,
                unmatched,
            } = queue;

            result.total_investment += summary.invested;
            result.total_returns += summary.returned;
            result.realized_profit_loss += summary.realized_profit_loss;
            if let Some(position) = OpenPosition::from_lots(instrument, lots.into()) {
                result.open_positions.insert(instrument.to_string(), position);
            }
            result.unmatched_sells.extend(unmatched);
            result.instruments.push(summary);
        }

        log::debug!(
            "analytics over {} transactions / {} instruments: invested {}, returned {}, realized {}",
            result.transaction_count,
            result.instruments.len(),
            result.total_investment,
            result.total_returns,
            result.realized_profit_loss,
        );

        result
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}

/// FIFO state for a single instrument while its transactions are replayed.
struct LotQueue {
    lots: VecDeque<Lot>,
    summary: InstrumentSummary,
    unmatched: Vec<UnmatchedSell>,
}

impl LotQueue {
    fn new(instrument: &str) -> Self {
        Self {
            lots: VecDeque::new(),
            summary: InstrumentSummary::new(instrument),
            unmatched: Vec::new(),
        }
    }

    fn apply(&mut self, tx: &Transaction) {
        match tx.action() {
            Action::Buy => {
                self.summary.invested += tx.gross_amount();
                self.summary.bought_quantity += u128::from(tx.quantity());
                self.lots.push_back(Lot::from_buy(tx));
            }
            Action::Sell => {
                self.summary.returned += tx.gross_amount();
                self.summary.sold_quantity += u128::from(tx.quantity());
                self.sell(tx);
            }
        }
    }

    /// Consume lots oldest-first. Whatever no lot covers is booked at zero
    /// cost basis and reported as an unmatched sell.
    fn sell(&mut self, tx: &Transaction) {
        let sell_price = tx.unit_price();
        let mut remaining = tx.quantity();

        while remaining > 0 {
            let Some(lot) = self.lots.front_mut() else {
                break;
            };
            let taken = lot.consume(remaining);
            let taken_dec = Decimal::from(taken);
            self.summary.matched_cost_basis += taken_dec * lot.unit_price;
            self.summary.realized_profit_loss += taken_dec * (sell_price - lot.unit_price);
            remaining -= taken;
            if lot.is_exhausted() {
                self.lots.pop_front();
            }
        }

        if remaining > 0 {
            self.summary.realized_profit_loss += Decimal::from(remaining) * sell_price;
            self.summary.unmatched_quantity += u128::from(remaining);
            log::warn!(
                "sell {} of {} {} on {} has no lot for {} shares; counted at zero cost basis",
                tx.id(),
                tx.quantity(),
                tx.instrument(),
                tx.timestamp(),
                remaining,
            );
            self.unmatched.push(UnmatchedSell {
                transaction_id: tx.id(),
                instrument: tx.instrument().to_string(),
                timestamp: tx.timestamp(),
                unmatched_quantity: remaining,
            });
        }
    }
}
