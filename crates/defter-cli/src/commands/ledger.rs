//! Journal synthesis from previously extracted records.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;

use defter_core::{synthesize_entries, LedgerEntry, NormalizedRecord, TabularStore};

use crate::store::JsonLedgerStore;

/// Arguments for the ledger command.
#[derive(Args)]
pub struct LedgerArgs {
    /// Ledger partition to read records from
    #[arg(short, long, default_value = "genel")]
    partition: String,

    /// Directory holding the ledger store
    #[arg(long, default_value = "ledger")]
    ledger_dir: PathBuf,

    /// Read records from a JSON file instead of the store
    #[arg(long, conflicts_with = "partition")]
    records: Option<PathBuf>,

    /// Output CSV file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(args: LedgerArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    let records: Vec<NormalizedRecord> = match &args.records {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => {
            let store = JsonLedgerStore::new(&args.ledger_dir);
            store.load_records(&args.partition)?
        }
    };

    if records.is_empty() {
        anyhow::bail!("No records found to synthesize journal rows from");
    }

    let entries = synthesize_entries(&records, &config.accounts);
    let skipped = records
        .iter()
        .filter(|r| r.total_amount <= rust_decimal::Decimal::ZERO || r.tax_amount > r.total_amount)
        .count();

    match &args.output {
        Some(path) => {
            write_journal_csv(csv::Writer::from_path(path)?, &entries)?;
            println!(
                "{} {} journal rows written to {}",
                style("✓").green(),
                entries.len(),
                path.display()
            );
        }
        None => write_journal_csv(csv::Writer::from_writer(std::io::stdout()), &entries)?,
    }

    if skipped > 0 {
        eprintln!(
            "{} {} record(s) skipped: zero total or tax above total",
            style("!").yellow(),
            skipped
        );
    }

    Ok(())
}

fn write_journal_csv<W: std::io::Write>(
    mut wtr: csv::Writer<W>,
    entries: &[LedgerEntry],
) -> anyhow::Result<()> {
    wtr.write_record(["date", "account", "description", "debit", "credit"])?;
    for entry in entries {
        wtr.write_record([
            entry.date.as_str(),
            entry.account.as_str(),
            entry.description.as_str(),
            &entry.debit.to_string(),
            &entry.credit.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
