use serde::Serialize;

use crate::errors::CoreError;
use crate::models::transaction::Transaction;

/// CSV header, one column per exported field.
pub const CSV_HEADERS: [&str; 7] = [
    "ID",
    "Stock Name",
    "Type",
    "Quantity",
    "Price",
    "Date",
    "Total Amount",
];

/// Sub-second digits appear only when the stored timestamp has them.
const CSV_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Serialize)]
struct CsvRow<'a> {
    id: String,
    instrument: &'a str,
    action: String,
    quantity: u64,
    unit_price: String,
    timestamp: String,
    gross_amount: String,
}

impl<'a> From<&'a Transaction> for CsvRow<'a> {
    fn from(tx: &'a Transaction) -> Self {
        Self {
            id: tx.id().to_string(),
            instrument: tx.instrument(),
            action: tx.action().to_string(),
            quantity: tx.quantity(),
            unit_price: tx.unit_price().normalize().to_string(),
            timestamp: tx.timestamp().format(CSV_TIMESTAMP_FORMAT).to_string(),
            gross_amount: tx.gross_amount().normalize().to_string(),
        }
    }
}

/// Serializes raw transactions for consumption outside the app.
pub struct ExportService;

impl ExportService {
    pub fn new() -> Self {
        Self
    }

    /// Header row plus one row per transaction, in the given order.
    /// Fields containing commas, quotes or newlines are quoted.
    pub fn to_csv(&self, transactions: &[Transaction]) -> Result<String, CoreError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        writer.write_record(CSV_HEADERS)?;
        for tx in transactions {
            writer.serialize(CsvRow::from(tx))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| CoreError::Export(format!("Failed to flush CSV writer: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| CoreError::Export(format!("CSV output is not UTF-8: {e}")))
    }

    /// Pretty JSON array in the persisted record layout.
    pub fn to_json(&self, transactions: &[Transaction]) -> Result<String, CoreError> {
        serde_json::to_string_pretty(transactions).map_err(|e| {
            CoreError::Serialization(format!("Failed to serialize transactions to JSON: {e}"))
        })
    }

    /// Parse a JSON array of transaction records. Every record is validated
    /// and its gross amount recomputed.
    pub fn from_json(&self, json: &str) -> Result<Vec<Transaction>, CoreError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for ExportService {
    fn default() -> Self {
        Self::new()
    }
}
