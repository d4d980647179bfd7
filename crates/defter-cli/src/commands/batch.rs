//! Batch processing command for a directory of documents.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use defter_core::{
    export_file_name, history_from_store, synthesize_entries, AbortFlag, BatchOutcome,
    ExtractionMode, LedgerEntry, Pipeline, TabularStore,
};

use crate::remote::GeminiRecognizer;
use crate::store::JsonLedgerStore;

use super::process::read_document;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Ledger partition (one logical ledger per customer)
    #[arg(short, long, default_value = "genel")]
    partition: String,

    /// Directory holding the ledger store
    #[arg(long, default_value = "ledger")]
    ledger_dir: PathBuf,

    /// Treat every document as a multi-line statement
    #[arg(long)]
    statement: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Also synthesize and append journal rows
    #[arg(long)]
    journal: bool,

    /// Copy originals into this directory under deterministic names
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Write a summary CSV
    #[arg(long)]
    summary: Option<PathBuf>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = super::load_config(config_path)?;
    if let Some(jobs) = args.jobs {
        config.pipeline.jobs = jobs;
    }

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            matches!(ext.to_lowercase().as_str(), "pdf" | "png" | "jpg" | "jpeg")
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} documents to process",
        style("ℹ").blue(),
        files.len()
    );

    let mode = if args.statement {
        ExtractionMode::Statement
    } else {
        ExtractionMode::Receipt
    };

    let mut documents = Vec::with_capacity(files.len());
    for path in &files {
        documents.push((read_document(path)?, mode));
    }

    // Originals kept around for the export step
    let originals: Vec<(String, Vec<u8>, String)> = documents
        .iter()
        .map(|(doc, _)| {
            let ext = doc.media.as_mime().rsplit('/').next().unwrap_or("bin");
            (doc.id.clone(), doc.bytes.clone(), ext.to_string())
        })
        .collect();

    // One history snapshot per batch
    let mut store = JsonLedgerStore::new(&args.ledger_dir);
    let history = history_from_store(&store, &args.partition)?;
    debug!(partition = %args.partition, known = history.len(), "loaded fingerprint history");

    let service = Arc::new(GeminiRecognizer::from_env(&config.extraction.model)?);
    let accounts = config.accounts.clone();
    let pipeline = Pipeline::new(service, config);

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    progress.set_message(format!("extracting {} documents", files.len()));
    progress.enable_steady_tick(std::time::Duration::from_millis(120));

    let outcome = pipeline
        .process_batch(documents, history, &AbortFlag::new())
        .await;

    progress.finish_and_clear();

    // Persist records under the partition
    store.append_records(&args.partition, &outcome.records)?;

    let entries = if args.journal {
        let entries = synthesize_entries(&outcome.records, &accounts);
        store.append_entries(&args.partition, &entries)?;
        entries
    } else {
        Vec::new()
    };

    if let Some(export_dir) = &args.export_dir {
        export_originals(export_dir, &outcome, &originals)?;
    }

    if let Some(summary_path) = &args.summary {
        write_summary(summary_path, &outcome)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    print_report(&outcome, &entries, start.elapsed());
    Ok(())
}

/// Copy original document bytes under the deterministic export names.
fn export_originals(
    export_dir: &PathBuf,
    outcome: &BatchOutcome,
    originals: &[(String, Vec<u8>, String)],
) -> anyhow::Result<()> {
    fs::create_dir_all(export_dir)?;

    for record in &outcome.records {
        let Some(source) = &record.source_document else {
            continue;
        };
        let Some((_, bytes, ext)) = originals.iter().find(|(id, _, _)| id == source) else {
            continue;
        };

        let name = export_file_name(record, ext);
        fs::write(export_dir.join(&name), bytes)?;
        debug!(file = %name, "exported original");
    }

    Ok(())
}

fn write_summary(path: &PathBuf, outcome: &BatchOutcome) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "source",
        "status",
        "merchant_name",
        "date",
        "category",
        "total_amount",
        "tax_amount",
        "duplicate_suspect",
        "needs_review",
        "error",
    ])?;

    for record in &outcome.records {
        wtr.write_record([
            record.source_document.as_deref().unwrap_or(""),
            "success",
            &record.merchant_name,
            &record.date,
            record.category.display(),
            &record.total_amount.to_string(),
            &record.tax_amount.to_string(),
            if record.duplicate_suspect { "yes" } else { "" },
            if record.needs_review() { "yes" } else { "" },
            "",
        ])?;
    }

    for failure in &outcome.failures {
        wtr.write_record([
            failure.document_id.as_str(),
            "error",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            failure.reason.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn print_report(outcome: &BatchOutcome, entries: &[LedgerEntry], elapsed: std::time::Duration) {
    println!();
    println!(
        "{} Processed batch in {:?}: {} records, {} failures",
        style("✓").green(),
        elapsed,
        style(outcome.records.len()).green(),
        style(outcome.failures.len()).red(),
    );

    let duplicates = outcome.records.iter().filter(|r| r.duplicate_suspect).count();
    let review = outcome.records.iter().filter(|r| r.needs_review()).count();
    if duplicates > 0 {
        println!(
            "   {} {} possible duplicate(s), confirm before posting",
            style("!").yellow(),
            duplicates
        );
    }
    if review > 0 {
        println!(
            "   {} {} record(s) flagged for manual review",
            style("!").yellow(),
            review
        );
    }
    if !entries.is_empty() {
        println!("   {} journal rows appended", entries.len());
    }

    if !outcome.failures.is_empty() {
        println!();
        println!("{}", style("Failed documents:").red());
        for failure in &outcome.failures {
            println!("  - {}: {}", failure.document_id, failure.reason);
        }
    }
}
