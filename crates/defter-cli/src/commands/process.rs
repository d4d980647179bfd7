//! Single-document processing command.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use console::style;

use defter_core::{
    AbortFlag, ExtractionMode, MediaKind, NormalizedRecord, Pipeline, RawDocument,
};

use crate::remote::GeminiRecognizer;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (image or PDF)
    input: PathBuf,

    /// Treat the document as a multi-line statement
    #[arg(long)]
    statement: bool,

    /// Side-channel payload (e.g. a QR code read from the document)
    #[arg(long)]
    hint: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    let document = read_document(&args.input)?;
    let document = match &args.hint {
        Some(hint) => document.with_hint(hint.clone()),
        None => document,
    };

    let mode = if args.statement {
        ExtractionMode::Statement
    } else {
        ExtractionMode::Receipt
    };

    let service = Arc::new(GeminiRecognizer::from_env(&config.extraction.model)?);
    let pipeline = Pipeline::new(service, config);

    let outcome = pipeline
        .process_batch(vec![(document, mode)], HashSet::new(), &AbortFlag::new())
        .await;

    if let Some(failure) = outcome.failures.first() {
        anyhow::bail!("{}: {}", failure.document_id, failure.reason);
    }

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome.records)?);
        }
        OutputFormat::Text => {
            for record in &outcome.records {
                print_record(record);
            }
        }
    }

    Ok(())
}

/// Read a file into a document, inferring the media kind from its
/// extension.
pub fn read_document(path: &PathBuf) -> anyhow::Result<RawDocument> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let media = MediaKind::from_extension(extension)
        .ok_or_else(|| anyhow::anyhow!("unsupported file format: {extension}"))?;

    let id = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("belge")
        .to_string();

    let bytes = fs::read(path)?;
    Ok(RawDocument::new(id, bytes, media))
}

fn print_record(record: &NormalizedRecord) {
    println!("{}", style(&record.merchant_name).bold());
    println!("  Date:     {}", record.date);
    println!("  Category: {}", record.category.display());
    println!("  Total:    {}", record.total_amount);
    println!("  Tax:      {}", record.tax_amount);
    if let Some(number) = &record.receipt_number {
        println!("  Receipt:  {}", number);
    }

    let issues = record.review_issues();
    if !issues.is_empty() {
        println!("  {}", style("Needs review:").yellow());
        for issue in issues {
            println!("    - {issue}");
        }
    }
    println!();
}
