use std::cmp::Ordering;
use std::collections::HashSet;
use uuid::Uuid;

use crate::errors::{CoreError, Field};
use crate::models::ledger::Ledger;
use crate::models::transaction::{
    NewTransaction, SortDirection, Transaction, TransactionQuery, TransactionSortKey,
};

/// Manages the recorded transactions: validated append, removal, lookup and
/// listing.
///
/// Pure business logic with no I/O. Persistence is the facade's job.
pub struct LedgerService;

impl LedgerService {
    pub fn new() -> Self {
        Self
    }

    /// Validate a typed input and turn it into a transaction with a fresh id.
    pub fn validate(&self, input: NewTransaction) -> Result<Transaction, CoreError> {
        Transaction::new(input)
    }

    /// Append a new transaction. Returns its id.
    pub fn add_transaction(
        &self,
        ledger: &mut Ledger,
        input: NewTransaction,
    ) -> Result<Uuid, CoreError> {
        let tx = self.validate(input)?;
        let id = tx.id();
        self.insert(ledger, tx)?;
        Ok(id)
    }

    /// Append an already-built transaction (reload, import). Rejects ids that
    /// are already recorded.
    pub fn insert(&self, ledger: &mut Ledger, tx: Transaction) -> Result<(), CoreError> {
        if ledger.transactions.iter().any(|t| t.id() == tx.id()) {
            return Err(CoreError::validation(
                Field::Id,
                format!("transaction {} is already recorded", tx.id()),
            ));
        }
        ledger.transactions.push(tx);
        Ok(())
    }

    /// Append several transactions. All-or-nothing: if any is rejected the
    /// ledger is left untouched.
    pub fn insert_all(
        &self,
        ledger: &mut Ledger,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<Uuid>, CoreError> {
        let mut seen: HashSet<Uuid> = ledger.transactions.iter().map(Transaction::id).collect();
        for tx in &transactions {
            if !seen.insert(tx.id()) {
                return Err(CoreError::validation(
                    Field::Id,
                    format!("transaction {} is already recorded", tx.id()),
                ));
            }
        }

        let ids = transactions.iter().map(Transaction::id).collect();
        ledger.transactions.extend(transactions);
        Ok(ids)
    }

    /// Remove a transaction by id and hand it back.
    pub fn remove_transaction(
        &self,
        ledger: &mut Ledger,
        id: Uuid,
    ) -> Result<Transaction, CoreError> {
        let idx = ledger
            .transactions
            .iter()
            .position(|t| t.id() == id)
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))?;
        Ok(ledger.transactions.remove(idx))
    }

    pub fn get_transaction<'a>(&self, ledger: &'a Ledger, id: Uuid) -> Option<&'a Transaction> {
        ledger.transactions.iter().find(|t| t.id() == id)
    }

    /// Filter and sort for display. The sort is stable, so rows with equal
    /// keys keep the order they were recorded in.
    pub fn query<'a>(&self, ledger: &'a Ledger, query: &TransactionQuery) -> Vec<&'a Transaction> {
        let needle = query
            .instrument_filter
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_lowercase);

        let mut rows: Vec<&Transaction> = ledger
            .transactions
            .iter()
            .filter(|t| {
                needle
                    .as_deref()
                    .map_or(true, |n| t.instrument().to_lowercase().contains(n))
            })
            .filter(|t| query.action.map_or(true, |a| t.action() == a))
            .collect();

        rows.sort_by(|a, b| {
            let ord = Self::compare(a, b, query.sort_key);
            match query.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        rows
    }

    /// Distinct instruments, sorted.
    pub fn unique_instruments<'a>(&self, ledger: &'a Ledger) -> Vec<&'a str> {
        let mut instruments: Vec<&str> = ledger
            .transactions
            .iter()
            .map(Transaction::instrument)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        instruments.sort_unstable();
        instruments
    }

    fn compare(a: &Transaction, b: &Transaction, key: TransactionSortKey) -> Ordering {
        match key {
            TransactionSortKey::Instrument => a
                .instrument()
                .to_lowercase()
                .cmp(&b.instrument().to_lowercase()),
            TransactionSortKey::Action => a.action().cmp(&b.action()),
            TransactionSortKey::Quantity => a.quantity().cmp(&b.quantity()),
            TransactionSortKey::UnitPrice => a.unit_price().cmp(&b.unit_price()),
            TransactionSortKey::GrossAmount => a.gross_amount().cmp(&b.gross_amount()),
            TransactionSortKey::Timestamp => a.timestamp().cmp(&b.timestamp()),
        }
    }
}

impl Default for LedgerService {
    fn default() -> Self {
        Self::new()
    }
}
