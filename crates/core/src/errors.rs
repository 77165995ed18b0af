use thiserror::Error;

/// Transaction field named by a validation failure, so the caller can point
/// the user at the offending input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Instrument,
    Action,
    Quantity,
    UnitPrice,
    Timestamp,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Id => write!(f, "id"),
            Field::Instrument => write!(f, "instrument"),
            Field::Action => write!(f, "action"),
            Field::Quantity => write!(f, "quantity"),
            Field::UnitPrice => write!(f, "unit price"),
            Field::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// Unified error type for the entire stock-ledger-core library.
/// Every fallible public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Business Logic ──────────────────────────────────────────────
    #[error("Invalid {field}: {message}")]
    Validation { field: Field, message: String },

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    // ── Storage ─────────────────────────────────────────────────────
    #[error("Storage error ({backend}): {message}")]
    Storage { backend: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── File I/O (native only) ──────────────────────────────────────
    #[error("File I/O error: {0}")]
    FileIO(String),

    // ── Export ──────────────────────────────────────────────────────
    #[error("Export failed: {0}")]
    Export(String),
}

impl CoreError {
    /// Shorthand for a validation failure on `field`.
    pub fn validation(field: Field, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field,
            message: message.into(),
        }
    }

    /// The violated field, if this is a validation failure.
    #[must_use]
    pub fn field(&self) -> Option<Field> {
        match self {
            CoreError::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<csv::Error> for CoreError {
    fn from(e: csv::Error) -> Self {
        CoreError::Export(e.to_string())
    }
}
