use serde::{Deserialize, Serialize};

/// Slot the transaction list is persisted under unless configured otherwise.
pub const DEFAULT_STORAGE_SLOT: &str = "stockTransactions";

/// File name suggested for CSV exports.
pub const DEFAULT_EXPORT_FILENAME: &str = "stock_transactions_data.csv";

/// Runtime configuration for a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Key of the single key-value slot holding the serialized transactions.
    pub storage_slot: String,

    /// Default file name for CSV exports.
    pub export_filename: String,
}

impl Settings {
    pub fn with_storage_slot(mut self, slot: impl Into<String>) -> Self {
        self.storage_slot = slot.into();
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_slot: DEFAULT_STORAGE_SLOT.to_string(),
            export_filename: DEFAULT_EXPORT_FILENAME.to_string(),
        }
    }
}
