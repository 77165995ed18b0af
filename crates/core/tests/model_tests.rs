use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use stock_ledger_core::errors::{CoreError, Field};
use stock_ledger_core::models::analytics::OpenPosition;
use stock_ledger_core::models::ledger::Ledger;
use stock_ledger_core::models::lot::Lot;
use stock_ledger_core::models::settings::{Settings, DEFAULT_EXPORT_FILENAME, DEFAULT_STORAGE_SLOT};
use stock_ledger_core::models::transaction::{
    parse_timestamp, Action, NewTransaction, SortDirection, Transaction, TransactionForm,
    TransactionQuery, TransactionRecord, TransactionSortKey, MAX_GROSS_AMOUNT, MAX_QUANTITY,
};

fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

fn field_of(result: Result<impl std::fmt::Debug, CoreError>) -> Field {
    result.unwrap_err().field().expect("expected a validation error")
}

fn form(instrument: &str, action: &str, quantity: &str, price: &str, timestamp: &str) -> TransactionForm {
    TransactionForm {
        instrument: instrument.into(),
        action: action.into(),
        quantity: quantity.into(),
        unit_price: price.into(),
        timestamp: timestamp.into(),
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Action
// ═══════════════════════════════════════════════════════════════════

mod action {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Action::Buy.to_string(), "Buy");
        assert_eq!(Action::Sell.to_string(), "Sell");
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("buy".parse::<Action>().unwrap(), Action::Buy);
        assert_eq!("SELL".parse::<Action>().unwrap(), Action::Sell);
        assert_eq!("  Buy ".parse::<Action>().unwrap(), Action::Buy);
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!(field_of("hold".parse::<Action>()), Field::Action);
    }

    #[test]
    fn serde_roundtrip_json() {
        for a in [Action::Buy, Action::Sell] {
            let json = serde_json::to_string(&a).unwrap();
            assert_eq!(json, format!("\"{a}\""));
            let back: Action = serde_json::from_str(&json).unwrap();
            assert_eq!(a, back);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Transaction
// ═══════════════════════════════════════════════════════════════════

mod transaction {
    use super::*;

    fn input() -> NewTransaction {
        NewTransaction::buy("ACME", 10, dec!(150.25), dt(2025, 1, 15, 10, 30, 0))
    }

    #[test]
    fn new_computes_gross_amount() {
        let tx = Transaction::new(input()).unwrap();
        assert_eq!(tx.gross_amount(), dec!(1502.50));
        assert_eq!(tx.quantity(), 10);
        assert_eq!(tx.unit_price(), dec!(150.25));
        assert_eq!(tx.instrument(), "ACME");
        assert_eq!(tx.action(), Action::Buy);
        assert!(tx.is_buy());
        assert!(!tx.is_sell());
        assert_eq!(tx.timestamp(), dt(2025, 1, 15, 10, 30, 0));
    }

    #[test]
    fn new_assigns_unique_ids() {
        let a = Transaction::new(input()).unwrap();
        let b = Transaction::new(input()).unwrap();
        assert_ne!(a.id(), b.id());
        assert!(!a.id().is_nil());
    }

    #[test]
    fn instrument_is_trimmed_but_keeps_case() {
        let mut i = input();
        i.instrument = "  Acme Corp ".into();
        let tx = Transaction::new(i).unwrap();
        assert_eq!(tx.instrument(), "Acme Corp");
    }

    #[test]
    fn rejects_zero_quantity() {
        let mut i = input();
        i.quantity = 0;
        assert_eq!(field_of(Transaction::new(i)), Field::Quantity);
    }

    #[test]
    fn rejects_zero_price() {
        let mut i = input();
        i.unit_price = Decimal::ZERO;
        assert_eq!(field_of(Transaction::new(i)), Field::UnitPrice);
    }

    #[test]
    fn rejects_negative_price() {
        let mut i = input();
        i.unit_price = dec!(-1.5);
        assert_eq!(field_of(Transaction::new(i)), Field::UnitPrice);
    }

    #[test]
    fn rejects_blank_instrument() {
        let mut i = input();
        i.instrument = "   ".into();
        assert_eq!(field_of(Transaction::new(i)), Field::Instrument);
    }

    #[test]
    fn rejects_overflowing_gross_amount() {
        let mut i = input();
        i.quantity = u64::MAX;
        i.unit_price = Decimal::MAX;
        assert_eq!(field_of(Transaction::new(i)), Field::Quantity);
    }

    #[test]
    fn accepts_largest_quantity() {
        let mut i = input();
        i.quantity = MAX_QUANTITY;
        i.unit_price = dec!(1000);
        let tx = Transaction::new(i).unwrap();
        assert_eq!(tx.gross_amount(), MAX_GROSS_AMOUNT);
    }

    #[test]
    fn rejects_quantity_past_limit() {
        let mut i = input();
        i.quantity = MAX_QUANTITY + 1;
        i.unit_price = dec!(0.0001);
        assert_eq!(field_of(Transaction::new(i)), Field::Quantity);
    }

    #[test]
    fn rejects_gross_past_limit() {
        let mut i = input();
        i.quantity = 1;
        i.unit_price = MAX_GROSS_AMOUNT + dec!(0.01);
        assert_eq!(field_of(Transaction::new(i)), Field::UnitPrice);

        let mut i = input();
        i.quantity = 10_000_000_000;
        i.unit_price = dec!(7000000000000000000);
        assert_eq!(field_of(Transaction::new(i)), Field::UnitPrice);
    }

    #[test]
    fn accepts_high_scale_price() {
        let mut i = input();
        i.quantity = 1;
        i.unit_price = Decimal::new(1, 28);
        let tx = Transaction::new(i).unwrap();
        assert_eq!(tx.gross_amount(), Decimal::new(1, 28));
    }

    #[test]
    fn with_id_keeps_id() {
        let id = Uuid::from_u128(42);
        let tx = Transaction::with_id(id, input()).unwrap();
        assert_eq!(tx.id(), id);
    }

    #[test]
    fn with_id_rejects_nil() {
        assert_eq!(field_of(Transaction::with_id(Uuid::nil(), input())), Field::Id);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Persisted record layout
// ═══════════════════════════════════════════════════════════════════

mod record {
    use super::*;

    fn sample() -> Transaction {
        Transaction::with_id(
            Uuid::from_u128(7),
            NewTransaction::sell("ACME", 4, dec!(99.5), dt(2025, 2, 1, 9, 0, 0)),
        )
        .unwrap()
    }

    #[test]
    fn serializes_camel_case_fields() {
        let value = serde_json::to_value(sample()).unwrap();
        let obj = value.as_object().unwrap();
        for key in ["id", "instrument", "action", "quantity", "unitPrice", "timestamp", "grossAmount"] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(obj.len(), 7);
    }

    #[test]
    fn numbers_stay_numbers_ids_stay_strings() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value["id"].is_string());
        assert!(value["quantity"].is_u64());
        assert!(value["unitPrice"].is_number());
        assert!(value["grossAmount"].is_number());
        assert_eq!(value["action"], "Sell");
        assert_eq!(value["timestamp"], "2025-02-01T09:00:00");
        assert_eq!(value["unitPrice"].as_f64(), Some(99.5));
        assert_eq!(value["grossAmount"].as_f64(), Some(398.0));
    }

    #[test]
    fn json_roundtrip() {
        let tx = sample();
        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, back);
    }

    #[test]
    fn gross_amount_is_recomputed_on_load() {
        let json = r#"{"id":"00000000-0000-0000-0000-000000000007","instrument":"ACME",
            "action":"Buy","quantity":3,"unitPrice":2.5,"timestamp":"2025-01-01T00:00:00",
            "grossAmount":999.5}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.gross_amount(), dec!(7.5));
    }

    #[test]
    fn missing_gross_amount_is_accepted() {
        let json = r#"{"id":"00000000-0000-0000-0000-000000000007","instrument":"ACME",
            "action":"Buy","quantity":3,"unitPrice":2.5,"timestamp":"2025-01-01T00:00:00"}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.gross_amount(), dec!(7.5));
    }

    #[test]
    fn invalid_record_is_rejected() {
        let json = r#"{"id":"00000000-0000-0000-0000-000000000007","instrument":"ACME",
            "action":"Buy","quantity":0,"unitPrice":2.5,"timestamp":"2025-01-01T00:00:00"}"#;
        assert!(serde_json::from_str::<Transaction>(json).is_err());
    }

    #[test]
    fn record_conversion_roundtrip() {
        let tx = sample();
        let record = TransactionRecord::from(tx.clone());
        assert_eq!(record.gross_amount, dec!(398));
        assert_eq!(Transaction::try_from(record).unwrap(), tx);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Form parsing
// ═══════════════════════════════════════════════════════════════════

mod form_parsing {
    use super::*;

    #[test]
    fn parses_browser_form() {
        let input = form("ACME", "Buy", "10", "150.25", "2025-01-15T10:30")
            .parse()
            .unwrap();
        assert_eq!(input.instrument, "ACME");
        assert_eq!(input.action, Action::Buy);
        assert_eq!(input.quantity, 10);
        assert_eq!(input.unit_price, dec!(150.25));
        assert_eq!(input.timestamp, dt(2025, 1, 15, 10, 30, 0));
    }

    #[test]
    fn trims_whitespace() {
        let input = form(" ACME ", " sell ", " 3 ", " 1.5 ", " 2025-01-15 ")
            .parse()
            .unwrap();
        assert_eq!(input.instrument, "ACME");
        assert_eq!(input.action, Action::Sell);
        assert_eq!(input.quantity, 3);
    }

    #[test]
    fn empty_instrument() {
        assert_eq!(field_of(form("", "Buy", "1", "1", "2025-01-15").parse()), Field::Instrument);
    }

    #[test]
    fn bad_action() {
        assert_eq!(field_of(form("A", "Short", "1", "1", "2025-01-15").parse()), Field::Action);
    }

    #[test]
    fn empty_quantity() {
        assert_eq!(field_of(form("A", "Buy", "", "1", "2025-01-15").parse()), Field::Quantity);
    }

    #[test]
    fn zero_quantity() {
        assert_eq!(field_of(form("A", "Buy", "0", "1", "2025-01-15").parse()), Field::Quantity);
    }

    #[test]
    fn negative_quantity() {
        assert_eq!(field_of(form("A", "Buy", "-3", "1", "2025-01-15").parse()), Field::Quantity);
    }

    #[test]
    fn fractional_quantity() {
        assert_eq!(field_of(form("A", "Buy", "1.5", "1", "2025-01-15").parse()), Field::Quantity);
    }

    #[test]
    fn non_numeric_price() {
        assert_eq!(field_of(form("A", "Buy", "1", "abc", "2025-01-15").parse()), Field::UnitPrice);
    }

    #[test]
    fn zero_price() {
        assert_eq!(field_of(form("A", "Buy", "1", "0", "2025-01-15").parse()), Field::UnitPrice);
    }

    #[test]
    fn bad_timestamp() {
        assert_eq!(field_of(form("A", "Buy", "1", "1", "yesterday").parse()), Field::Timestamp);
    }

    #[test]
    fn error_message_names_field() {
        let err = form("A", "Buy", "0", "1", "2025-01-15").parse().unwrap_err();
        assert_eq!(err.to_string(), "Invalid quantity: quantity must be greater than zero");
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Timestamps
// ═══════════════════════════════════════════════════════════════════

mod timestamps {
    use super::*;

    #[test]
    fn datetime_local_minutes() {
        assert_eq!(parse_timestamp("2025-03-04T05:06").unwrap(), dt(2025, 3, 4, 5, 6, 0));
    }

    #[test]
    fn iso_seconds() {
        assert_eq!(parse_timestamp("2025-03-04T05:06:07").unwrap(), dt(2025, 3, 4, 5, 6, 7));
    }

    #[test]
    fn space_separated() {
        assert_eq!(parse_timestamp("2025-03-04 05:06:07").unwrap(), dt(2025, 3, 4, 5, 6, 7));
    }

    #[test]
    fn rfc3339_converted_to_utc() {
        assert_eq!(
            parse_timestamp("2025-03-04T05:06:07+02:00").unwrap(),
            dt(2025, 3, 4, 3, 6, 7)
        );
        assert_eq!(parse_timestamp("2025-03-04T05:06:07Z").unwrap(), dt(2025, 3, 4, 5, 6, 7));
    }

    #[test]
    fn date_only_is_midnight() {
        assert_eq!(parse_timestamp("2025-03-04").unwrap(), dt(2025, 3, 4, 0, 0, 0));
    }

    #[test]
    fn rejects_impossible_date() {
        assert!(parse_timestamp("2025-02-30").is_err());
        assert!(parse_timestamp("").is_err());
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Lot & OpenPosition
// ═══════════════════════════════════════════════════════════════════

mod lots {
    use super::*;

    fn lot(qty: u64, price: Decimal) -> Lot {
        let tx = Transaction::with_id(
            Uuid::from_u128(1),
            NewTransaction::buy("ACME", qty, price, dt(2025, 1, 1, 0, 0, 0)),
        )
        .unwrap();
        Lot::from_buy(&tx)
    }

    #[test]
    fn from_buy_copies_fields() {
        let l = lot(10, dec!(12.5));
        assert_eq!(l.source_transaction_id, Uuid::from_u128(1));
        assert_eq!(l.instrument, "ACME");
        assert_eq!(l.remaining_quantity, 10);
        assert_eq!(l.cost_basis(), dec!(125));
    }

    #[test]
    fn consume_caps_at_remaining() {
        let mut l = lot(10, dec!(1));
        assert_eq!(l.consume(4), 4);
        assert_eq!(l.remaining_quantity, 6);
        assert_eq!(l.consume(100), 6);
        assert!(l.is_exhausted());
    }

    #[test]
    fn open_position_from_no_lots_is_none() {
        assert!(OpenPosition::from_lots("ACME", Vec::new()).is_none());
    }

    #[test]
    fn open_position_sums_lots() {
        let p = OpenPosition::from_lots("ACME", vec![lot(2, dec!(10)), lot(6, dec!(20))]).unwrap();
        assert_eq!(p.quantity, 8);
        assert_eq!(p.cost_basis, dec!(140));
        assert_eq!(p.average_cost(), dec!(17.5));
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Ledger, Settings, Query
// ═══════════════════════════════════════════════════════════════════

mod containers {
    use super::*;

    #[test]
    fn empty_ledger_serializes_as_empty_array() {
        assert_eq!(serde_json::to_string(&Ledger::new()).unwrap(), "[]");
    }

    #[test]
    fn ledger_is_transparent_array() {
        let tx = Transaction::new(NewTransaction::buy("A", 1, dec!(1), dt(2025, 1, 1, 0, 0, 0))).unwrap();
        let ledger = Ledger::from_transactions(vec![tx]);
        let value = serde_json::to_value(&ledger).unwrap();
        assert!(value.is_array());
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(ledger.len(), 1);
        assert!(!ledger.is_empty());
    }

    #[test]
    fn settings_defaults() {
        let s = Settings::default();
        assert_eq!(s.storage_slot, DEFAULT_STORAGE_SLOT);
        assert_eq!(s.storage_slot, "stockTransactions");
        assert_eq!(s.export_filename, DEFAULT_EXPORT_FILENAME);
    }

    #[test]
    fn settings_with_slot() {
        let s = Settings::default().with_storage_slot("other");
        assert_eq!(s.storage_slot, "other");
    }

    #[test]
    fn query_defaults_to_newest_first() {
        let q = TransactionQuery::new();
        assert_eq!(q.sort_key, TransactionSortKey::Timestamp);
        assert_eq!(q.direction, SortDirection::Desc);
        assert!(q.instrument_filter.is_none());
        assert!(q.action.is_none());
    }

    #[test]
    fn sort_key_parsing() {
        assert_eq!("price".parse::<TransactionSortKey>().unwrap(), TransactionSortKey::UnitPrice);
        assert_eq!("Total-Amount".parse::<TransactionSortKey>().unwrap(), TransactionSortKey::GrossAmount);
        assert_eq!("stock_name".parse::<TransactionSortKey>().unwrap(), TransactionSortKey::Instrument);
        assert_eq!("date".parse::<TransactionSortKey>().unwrap(), TransactionSortKey::Timestamp);
        assert!(matches!(
            "colour".parse::<TransactionSortKey>(),
            Err(CoreError::InvalidQuery(_))
        ));
    }
}
