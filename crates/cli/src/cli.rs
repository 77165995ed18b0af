//! CLI definition and dispatch.

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Timelike};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use uuid::Uuid;

use stock_ledger_core::models::analytics::AnalyticsResult;
use stock_ledger_core::models::settings::{Settings, DEFAULT_STORAGE_SLOT};
use stock_ledger_core::models::transaction::{
    parse_timestamp, Action, NewTransaction, SortDirection, Transaction, TransactionQuery,
    TransactionSortKey,
};
use stock_ledger_core::storage::backend::FileStore;
use stock_ledger_core::StockLedger;

const DISPLAY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Parser, Debug)]
#[command(name = "stock-ledger", version, about = "Record stock buys and sells, see FIFO profit/loss")]
pub struct Cli {
    /// Directory holding the ledger file
    #[arg(long, global = true, env = "STOCK_LEDGER_DATA_DIR", default_value = ".stock-ledger")]
    pub data_dir: PathBuf,

    /// Storage slot (file name without extension) inside the data directory
    #[arg(long, global = true, env = "STOCK_LEDGER_SLOT", default_value = DEFAULT_STORAGE_SLOT)]
    pub slot: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record a buy or sell
    Add {
        #[arg(short, long)]
        instrument: String,
        #[arg(short, long)]
        action: Action,
        #[arg(short, long)]
        quantity: u64,
        #[arg(short, long)]
        price: Decimal,
        /// When the trade happened (defaults to now)
        #[arg(short, long, value_parser = parse_timestamp)]
        timestamp: Option<NaiveDateTime>,
    },
    /// Delete a transaction by id
    Remove { id: Uuid },
    /// List recorded transactions
    List {
        /// Case-insensitive instrument substring
        #[arg(short, long)]
        filter: Option<String>,
        #[arg(short, long)]
        action: Option<Action>,
        /// instrument, action, quantity, price, total or date
        #[arg(short, long, default_value = "date")]
        sort: TransactionSortKey,
        /// Ascending order (default is descending)
        #[arg(long)]
        asc: bool,
    },
    /// Totals, realized profit/loss and open positions
    Summary {
        /// Only count transactions at or before this point in time
        #[arg(long, value_parser = parse_timestamp)]
        as_of: Option<NaiveDateTime>,
    },
    /// Export all transactions
    Export {
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
        /// Output file or directory (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import transactions from a JSON export
    Import { path: PathBuf },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.verbose);

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // A second init (tests) is harmless
    let _ = builder.try_init();
}

fn dispatch(cli: Cli) -> Result<()> {
    let settings = Settings::default().with_storage_slot(cli.slot);
    let store = FileStore::open(&cli.data_dir)
        .with_context(|| format!("cannot open data directory {}", cli.data_dir.display()))?;
    let mut ledger = StockLedger::open_with_settings(store, settings);
    log::debug!("opened {ledger:?}");

    match cli.command {
        Command::Add {
            instrument,
            action,
            quantity,
            price,
            timestamp,
        } => {
            let timestamp = timestamp.unwrap_or_else(now_to_the_minute);
            let input = NewTransaction::new(instrument, action, quantity, price, timestamp);
            let id = ledger.add_transaction(input)?;
            persist(&mut ledger)?;
            println!("{id}");
        }
        Command::Remove { id } => {
            let removed = ledger.remove_transaction(id)?;
            persist(&mut ledger)?;
            println!("removed {}", format_row(&removed));
        }
        Command::List {
            filter,
            action,
            sort,
            asc,
        } => {
            let direction = if asc {
                SortDirection::Asc
            } else {
                SortDirection::Desc
            };
            let mut query = TransactionQuery::new().sorted_by(sort, direction);
            if let Some(filter) = filter {
                query = query.with_instrument_filter(filter);
            }
            if let Some(action) = action {
                query = query.with_action(action);
            }
            for tx in ledger.query(&query) {
                println!("{}", format_row(tx));
            }
        }
        Command::Summary { as_of } => {
            let result = match as_of {
                Some(cutoff) => ledger.analytics_as_of(cutoff),
                None => ledger.analytics(),
            };
            print!("{}", format_summary(&result));
        }
        Command::Export { format, output } => {
            let body = match format {
                ExportFormat::Csv => ledger.export_csv()?,
                ExportFormat::Json => ledger.export_json()?,
            };
            match output {
                None => print!("{body}"),
                Some(output) => {
                    let path = export_path(&output, &ledger.settings().export_filename, format);
                    fs::write(&path, body)
                        .with_context(|| format!("cannot write {}", path.display()))?;
                    eprintln!(
                        "exported {} transactions to {}",
                        ledger.transaction_count(),
                        path.display()
                    );
                }
            }
        }
        Command::Import { path } => {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            let count = ledger
                .import_json(&json)
                .with_context(|| format!("cannot import {}", path.display()))?;
            persist(&mut ledger)?;
            println!("imported {count} transactions");
        }
    }
    Ok(())
}

/// The facade only logs a failed write; on the command line it is fatal.
fn persist(ledger: &mut StockLedger<FileStore>) -> Result<()> {
    if ledger.has_unsaved_changes() {
        ledger.flush().context("could not save the ledger")?;
    }
    Ok(())
}

fn now_to_the_minute() -> NaiveDateTime {
    let now = chrono::Local::now().naive_local();
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}

/// A directory gets the configured export file name, with the extension
/// swapped for JSON.
fn export_path(output: &Path, filename: &str, format: ExportFormat) -> PathBuf {
    if !output.is_dir() {
        return output.to_path_buf();
    }
    let path = output.join(filename);
    match format {
        ExportFormat::Csv => path,
        ExportFormat::Json => path.with_extension("json"),
    }
}

fn format_row(tx: &Transaction) -> String {
    format!(
        "{}  {}  {:<4}  {:<12} {:>8} @ {:>10}  = {:>12}",
        tx.id(),
        tx.timestamp().format(DISPLAY_TIMESTAMP_FORMAT),
        tx.action().to_string(),
        tx.instrument(),
        tx.quantity(),
        tx.unit_price().normalize(),
        tx.gross_amount().round_dp(2),
    )
}

fn format_summary(result: &AnalyticsResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("Transactions:        {}\n", result.transaction_count));
    out.push_str(&format!("Total investment:    {}\n", result.total_investment.round_dp(2)));
    out.push_str(&format!("Total returns:       {}\n", result.total_returns.round_dp(2)));
    out.push_str(&format!(
        "Realized P/L:        {}\n",
        result.realized_profit_loss.round_dp(2)
    ));
    match result.return_pct() {
        Some(pct) => out.push_str(&format!("Return on sold cost: {}%\n", pct.round_dp(2))),
        None => out.push_str("Return on sold cost: n/a\n"),
    }

    if !result.open_positions.is_empty() {
        out.push_str("\nOpen positions:\n");
        for position in result.open_positions.values() {
            out.push_str(&format!(
                "  {:<12} {:>8} shares  cost {:>12}  avg {:>10}\n",
                position.instrument,
                position.quantity,
                position.cost_basis.round_dp(2),
                position.average_cost().round_dp(4),
            ));
        }
    }

    if result.has_unmatched_sells() {
        out.push_str("\nSells without matching buys (counted at zero cost):\n");
        for sell in &result.unmatched_sells {
            out.push_str(&format!(
                "  {}  {}  {:<12} {:>8} shares\n",
                sell.transaction_id,
                sell.timestamp.format(DISPLAY_TIMESTAMP_FORMAT),
                sell.instrument,
                sell.unmatched_quantity,
            ));
        }
    }
    out
}
