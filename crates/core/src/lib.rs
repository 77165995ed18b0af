pub mod errors;
pub mod models;
pub mod services;
pub mod storage;

use chrono::NaiveDateTime;
use models::{
    analytics::AnalyticsResult,
    ledger::Ledger,
    settings::Settings,
    transaction::{Action, NewTransaction, Transaction, TransactionForm, TransactionQuery},
};
use services::{
    analytics_service::AnalyticsService, export_service::ExportService,
    ledger_service::LedgerService,
};
use storage::{backend::KeyValueStore, manager::StorageManager};
use uuid::Uuid;

use errors::CoreError;

/// Main entry point for the Stock Ledger core library.
///
/// An explicitly passed store handle: loads the transaction list from its
/// backend when opened and flushes it back after every mutation.
#[must_use]
pub struct StockLedger<B: KeyValueStore> {
    backend: B,
    settings: Settings,
    ledger: Ledger,
    ledger_service: LedgerService,
    analytics_service: AnalyticsService,
    export_service: ExportService,
    /// Set by a mutation, cleared by a successful flush.
    dirty: bool,
}

impl<B: KeyValueStore> std::fmt::Debug for StockLedger<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockLedger")
            .field("backend", &self.backend.name())
            .field("slot", &self.settings.storage_slot)
            .field("transactions", &self.ledger.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl<B: KeyValueStore> StockLedger<B> {
    /// Open the ledger stored in `backend` under the default slot.
    pub fn open(backend: B) -> Self {
        Self::open_with_settings(backend, Settings::default())
    }

    /// Open the ledger stored in `backend` under `settings.storage_slot`.
    /// Missing or unreadable data yields an empty ledger.
    pub fn open_with_settings(backend: B, settings: Settings) -> Self {
        let ledger = StorageManager::load(&backend, &settings.storage_slot);
        Self {
            backend,
            settings,
            ledger,
            ledger_service: LedgerService::new(),
            analytics_service: AnalyticsService::new(),
            export_service: ExportService::new(),
            dirty: false,
        }
    }

    // ── Transaction Management ──────────────────────────────────────

    /// Record a buy/sell. Validation failures leave the ledger untouched.
    pub fn add_transaction(&mut self, input: NewTransaction) -> Result<Uuid, CoreError> {
        let id = self.ledger_service.add_transaction(&mut self.ledger, input)?;
        self.mark_changed();
        Ok(id)
    }

    /// Parse raw form text and record it.
    pub fn add_from_form(&mut self, form: &TransactionForm) -> Result<Uuid, CoreError> {
        let input = form.parse()?;
        self.add_transaction(input)
    }

    /// Record several transactions at once (all-or-nothing).
    pub fn add_transactions(&mut self, inputs: Vec<NewTransaction>) -> Result<Vec<Uuid>, CoreError> {
        let transactions = inputs
            .into_iter()
            .map(|input| self.ledger_service.validate(input))
            .collect::<Result<Vec<_>, _>>()?;
        let ids = self
            .ledger_service
            .insert_all(&mut self.ledger, transactions)?;
        self.mark_changed();
        Ok(ids)
    }

    /// Delete a transaction. Corrections are delete + re-add.
    pub fn remove_transaction(&mut self, id: Uuid) -> Result<Transaction, CoreError> {
        let removed = self
            .ledger_service
            .remove_transaction(&mut self.ledger, id)?;
        self.mark_changed();
        Ok(removed)
    }

    /// Get a single transaction by its ID.
    #[must_use]
    pub fn get_transaction(&self, id: Uuid) -> Option<&Transaction> {
        self.ledger_service.get_transaction(&self.ledger, id)
    }

    /// All transactions in the order they were recorded.
    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        &self.ledger.transactions
    }

    /// Filtered and sorted listing for display.
    #[must_use]
    pub fn query(&self, query: &TransactionQuery) -> Vec<&Transaction> {
        self.ledger_service.query(&self.ledger, query)
    }

    /// Transactions of one side, newest first.
    #[must_use]
    pub fn transactions_by_action(&self, action: Action) -> Vec<&Transaction> {
        self.query(&TransactionQuery::new().with_action(action))
    }

    /// Distinct instruments, sorted.
    #[must_use]
    pub fn unique_instruments(&self) -> Vec<&str> {
        self.ledger_service.unique_instruments(&self.ledger)
    }

    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.ledger.len()
    }

    // ── Analytics ───────────────────────────────────────────────────

    /// Totals, FIFO-realized profit/loss and open positions over the
    /// current snapshot.
    #[must_use]
    pub fn analytics(&self) -> AnalyticsResult {
        self.analytics_service.compute(&self.ledger.transactions)
    }

    /// Analytics over transactions at or before `cutoff`.
    #[must_use]
    pub fn analytics_as_of(&self, cutoff: NaiveDateTime) -> AnalyticsResult {
        self.analytics_service
            .compute_as_of(&self.ledger.transactions, cutoff)
    }

    // ── Export / Import ─────────────────────────────────────────────

    /// Export all transactions as CSV, in recorded order.
    pub fn export_csv(&self) -> Result<String, CoreError> {
        self.export_service.to_csv(&self.ledger.transactions)
    }

    /// Export all transactions as a JSON array.
    pub fn export_json(&self) -> Result<String, CoreError> {
        self.export_service.to_json(&self.ledger.transactions)
    }

    /// Import a JSON array of transaction records. Every record is validated;
    /// if any is rejected nothing is imported. Returns the number imported.
    pub fn import_json(&mut self, json: &str) -> Result<usize, CoreError> {
        let transactions = self.export_service.from_json(json)?;
        let count = transactions.len();
        self.ledger_service
            .insert_all(&mut self.ledger, transactions)?;
        self.mark_changed();
        Ok(count)
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// Write the ledger to the backend now, surfacing any failure.
    pub fn flush(&mut self) -> Result<(), CoreError> {
        StorageManager::save(
            &mut self.backend,
            &self.settings.storage_slot,
            &self.ledger,
        )?;
        self.dirty = false;
        Ok(())
    }

    /// Returns `true` if the last mutation has not reached the backend.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Flush and hand the backend back.
    pub fn into_backend(mut self) -> Result<B, CoreError> {
        if self.dirty {
            self.flush()?;
        }
        Ok(self.backend)
    }

    // ── Internal ────────────────────────────────────────────────────

    /// Flush after a mutation. A failed write is logged and leaves the
    /// ledger dirty; the in-memory change stands.
    fn mark_changed(&mut self) {
        self.dirty = true;
        if let Err(e) = self.flush() {
            log::warn!(
                "could not persist ledger to {} slot '{}': {}",
                self.backend.name(),
                self.settings.storage_slot,
                e
            );
        }
    }
}
