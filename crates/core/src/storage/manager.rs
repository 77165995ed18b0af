use crate::errors::CoreError;
use crate::models::ledger::Ledger;

use super::backend::KeyValueStore;

/// High-level storage operations: save/load the ledger to/from one named
/// slot of a key-value backend.
///
/// Layout: the slot holds a JSON array of transaction records (see
/// [`TransactionRecord`](crate::models::transaction::TransactionRecord)).
pub struct StorageManager;

impl StorageManager {
    /// Serialize a ledger to the slot layout.
    pub fn save_to_string(ledger: &Ledger) -> Result<String, CoreError> {
        serde_json::to_string(ledger)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize ledger: {e}")))
    }

    /// Parse the slot layout. Every record is re-validated.
    pub fn load_from_str(data: &str) -> Result<Ledger, CoreError> {
        serde_json::from_str(data)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize ledger: {e}")))
    }

    /// Write the ledger into `slot`.
    pub fn save<B: KeyValueStore + ?Sized>(
        backend: &mut B,
        slot: &str,
        ledger: &Ledger,
    ) -> Result<(), CoreError> {
        let data = Self::save_to_string(ledger)?;
        backend.set(slot, &data)?;
        log::debug!(
            "saved {} transactions to {} slot '{}'",
            ledger.len(),
            backend.name(),
            slot
        );
        Ok(())
    }

    /// Read the ledger from `slot`. A slot that was never written is an
    /// empty ledger; anything unreadable is an error.
    pub fn try_load<B: KeyValueStore + ?Sized>(
        backend: &B,
        slot: &str,
    ) -> Result<Ledger, CoreError> {
        match backend.get(slot)? {
            Some(data) => Self::load_from_str(&data),
            None => Ok(Ledger::new()),
        }
    }

    /// Read the ledger from `slot`, falling back to an empty ledger when the
    /// backend fails or the data is corrupt.
    pub fn load<B: KeyValueStore + ?Sized>(backend: &B, slot: &str) -> Ledger {
        match Self::try_load(backend, slot) {
            Ok(ledger) => {
                log::debug!(
                    "loaded {} transactions from {} slot '{}'",
                    ledger.len(),
                    backend.name(),
                    slot
                );
                ledger
            }
            Err(e) => {
                log::warn!(
                    "could not load {} slot '{}', starting with an empty ledger: {}",
                    backend.name(),
                    slot,
                    e
                );
                Ledger::new()
            }
        }
    }
}
