use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{CoreError, Field};

/// Largest share count a single transaction may carry.
pub const MAX_QUANTITY: u64 = 1_000_000_000_000;

/// Largest `quantity × unit_price` a single transaction may carry.
///
/// With both bounds, every ledger total stays far inside `Decimal` range
/// (and every quantity total inside `u128`).
pub const MAX_GROSS_AMOUNT: Decimal = dec!(1000000000000000);

/// Side of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    /// Acquiring shares
    Buy,
    /// Disposing of shares
    Sell,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Buy => write!(f, "Buy"),
            Action::Sell => write!(f, "Sell"),
        }
    }
}

impl std::str::FromStr for Action {
    type Err = CoreError;

    /// Case-insensitive: accepts "buy", "Buy", "SELL", ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Action::Buy),
            "sell" => Ok(Action::Sell),
            other => Err(CoreError::validation(
                Field::Action,
                format!("'{other}' is not Buy or Sell"),
            )),
        }
    }
}

/// Column to order a transaction listing by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionSortKey {
    Instrument,
    Action,
    Quantity,
    UnitPrice,
    GrossAmount,
    #[default]
    Timestamp,
}

impl std::str::FromStr for TransactionSortKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "instrument" | "stock" | "stockname" => Ok(Self::Instrument),
            "action" | "type" => Ok(Self::Action),
            "quantity" | "qty" => Ok(Self::Quantity),
            "unitprice" | "price" => Ok(Self::UnitPrice),
            "grossamount" | "total" | "totalamount" => Ok(Self::GrossAmount),
            "timestamp" | "date" => Ok(Self::Timestamp),
            _ => Err(CoreError::InvalidQuery(format!("unknown sort key '{s}'"))),
        }
    }
}

/// Direction of a listing sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    /// Newest first is the default for display
    #[default]
    Desc,
}

/// Filter and ordering applied to a transaction listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionQuery {
    /// Case-insensitive substring match against the instrument.
    pub instrument_filter: Option<String>,
    pub action: Option<Action>,
    pub sort_key: TransactionSortKey,
    pub direction: SortDirection,
}

impl TransactionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instrument_filter(mut self, filter: impl Into<String>) -> Self {
        self.instrument_filter = Some(filter.into());
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn sorted_by(mut self, key: TransactionSortKey, direction: SortDirection) -> Self {
        self.sort_key = key;
        self.direction = direction;
        self
    }
}

/// Strictly typed input for a new transaction. Validated once when it
/// becomes a [`Transaction`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub instrument: String,
    pub action: Action,
    pub quantity: u64,
    pub unit_price: Decimal,
    pub timestamp: NaiveDateTime,
}

impl NewTransaction {
    pub fn new(
        instrument: impl Into<String>,
        action: Action,
        quantity: u64,
        unit_price: Decimal,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            action,
            quantity,
            unit_price,
            timestamp,
        }
    }

    pub fn buy(
        instrument: impl Into<String>,
        quantity: u64,
        unit_price: Decimal,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self::new(instrument, Action::Buy, quantity, unit_price, timestamp)
    }

    pub fn sell(
        instrument: impl Into<String>,
        quantity: u64,
        unit_price: Decimal,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self::new(instrument, Action::Sell, quantity, unit_price, timestamp)
    }
}

/// Raw form input as typed by a user: every field is text.
///
/// [`TransactionForm::parse`] turns it into a [`NewTransaction`] or reports
/// the first field that does not parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionForm {
    pub instrument: String,
    pub action: String,
    pub quantity: String,
    pub unit_price: String,
    pub timestamp: String,
}

impl TransactionForm {
    pub fn parse(&self) -> Result<NewTransaction, CoreError> {
        let instrument = self.instrument.trim();
        if instrument.is_empty() {
            return Err(CoreError::validation(
                Field::Instrument,
                "instrument name must not be empty",
            ));
        }

        let action: Action = self.action.parse()?;

        let raw_quantity = self.quantity.trim();
        let quantity: u64 = raw_quantity.parse().map_err(|_| {
            CoreError::validation(
                Field::Quantity,
                format!("'{raw_quantity}' is not a whole number of shares"),
            )
        })?;

        let raw_price = self.unit_price.trim();
        let unit_price: Decimal = raw_price.parse().map_err(|_| {
            CoreError::validation(
                Field::UnitPrice,
                format!("'{raw_price}' is not a decimal price"),
            )
        })?;

        let timestamp = parse_timestamp(&self.timestamp)?;

        let input = NewTransaction::new(instrument, action, quantity, unit_price, timestamp);
        validate_new(&input)?;
        Ok(input)
    }
}

/// Parse a user-supplied point in time.
///
/// Accepts `YYYY-MM-DDTHH:MM` (browser `datetime-local`), `YYYY-MM-DDTHH:MM:SS[.f]`,
/// `YYYY-MM-DD HH:MM:SS`, RFC 3339 (normalized to UTC) and a bare
/// `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, CoreError> {
    const FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

    let raw = raw.trim();
    for fmt in FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.naive_utc());
    }
    if let Some(ts) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(ts);
    }

    Err(CoreError::validation(
        Field::Timestamp,
        format!("'{raw}' is not a recognised date/time"),
    ))
}

/// Rules every transaction satisfies:
/// - instrument is non-empty after trimming
/// - 0 < quantity <= [`MAX_QUANTITY`]
/// - unit price > 0
/// - quantity × unit price <= [`MAX_GROSS_AMOUNT`]
fn validate_new(input: &NewTransaction) -> Result<Decimal, CoreError> {
    if input.instrument.trim().is_empty() {
        return Err(CoreError::validation(
            Field::Instrument,
            "instrument name must not be empty",
        ));
    }
    if input.quantity == 0 {
        return Err(CoreError::validation(
            Field::Quantity,
            "quantity must be greater than zero",
        ));
    }
    if input.quantity > MAX_QUANTITY {
        return Err(CoreError::validation(
            Field::Quantity,
            format!("quantity must not exceed {MAX_QUANTITY}, got {}", input.quantity),
        ));
    }
    if input.unit_price <= Decimal::ZERO {
        return Err(CoreError::validation(
            Field::UnitPrice,
            format!("unit price must be greater than zero, got {}", input.unit_price),
        ));
    }
    Decimal::from(input.quantity)
        .checked_mul(input.unit_price)
        .filter(|gross| *gross <= MAX_GROSS_AMOUNT)
        .ok_or_else(|| {
            CoreError::validation(
                Field::UnitPrice,
                format!(
                    "{} × {} exceeds the largest gross amount ({MAX_GROSS_AMOUNT})",
                    input.quantity, input.unit_price
                ),
            )
        })
}

/// A single recorded buy or sell.
///
/// Immutable: fields are only reachable through accessors and every
/// constructor validates, so `quantity > 0`, `unit_price > 0` and
/// `gross_amount == quantity × unit_price` hold for any value of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TransactionRecord", into = "TransactionRecord")]
pub struct Transaction {
    id: Uuid,
    instrument: String,
    action: Action,
    quantity: u64,
    unit_price: Decimal,
    timestamp: NaiveDateTime,
    gross_amount: Decimal,
}

impl Transaction {
    /// Validate `input` and assign a fresh time-ordered id.
    pub fn new(input: NewTransaction) -> Result<Self, CoreError> {
        Self::with_id(Uuid::now_v7(), input)
    }

    /// Validate `input` under an existing id (used when reloading or importing).
    pub fn with_id(id: Uuid, input: NewTransaction) -> Result<Self, CoreError> {
        if id.is_nil() {
            return Err(CoreError::validation(Field::Id, "id must not be nil"));
        }
        let gross_amount = validate_new(&input)?;
        Ok(Self {
            id,
            instrument: input.instrument.trim().to_string(),
            action: input.action,
            quantity: input.quantity,
            unit_price: input.unit_price,
            timestamp: input.timestamp,
            gross_amount,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// `quantity × unit_price`
    pub fn gross_amount(&self) -> Decimal {
        self.gross_amount
    }

    pub fn is_buy(&self) -> bool {
        self.action == Action::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.action == Action::Sell
    }
}

/// Persisted / exported shape of a transaction.
///
/// `gross_amount` is written for external readers but ignored on the way
/// back in: it is recomputed from quantity and unit price. Money fields are
/// written as exact JSON numbers, never through `f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: Uuid,
    pub instrument: String,
    pub action: Action,
    pub quantity: u64,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub unit_price: Decimal,
    pub timestamp: NaiveDateTime,
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision")]
    pub gross_amount: Decimal,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = CoreError;

    fn try_from(record: TransactionRecord) -> Result<Self, Self::Error> {
        let stored_gross = record.gross_amount;
        let tx = Transaction::with_id(
            record.id,
            NewTransaction::new(
                record.instrument,
                record.action,
                record.quantity,
                record.unit_price,
                record.timestamp,
            ),
        )?;
        if stored_gross != tx.gross_amount {
            log::debug!(
                "transaction {}: stored gross amount {} replaced by {}",
                tx.id,
                stored_gross,
                tx.gross_amount
            );
        }
        Ok(tx)
    }
}

impl From<Transaction> for TransactionRecord {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            instrument: tx.instrument,
            action: tx.action,
            quantity: tx.quantity,
            unit_price: tx.unit_price,
            timestamp: tx.timestamp,
            gross_amount: tx.gross_amount,
        }
    }
}
