//! Core library for receipt-and-statement bookkeeping.
//!
//! This crate provides:
//! - Locale-ambiguous monetary normalization
//! - Heuristic and delegated field extraction with confidence scoring
//! - Orientation retry scanning for photographed receipts
//! - Duplicate-transaction annotation over (date, amount) fingerprints
//! - Balanced double-entry journal synthesis
//! - A batch pipeline with bounded concurrency and backoff

pub mod error;
pub mod extract;
pub mod ledger;
pub mod models;
pub mod pipeline;
pub mod service;
pub mod store;

pub use error::{DefterError, ParseError, Result, ServiceError, StoreError};
pub use extract::{extract_heuristic, normalize_amount, scan_with_rotations, Rotation};
pub use ledger::{fingerprint_snapshot, synthesize_entries, DuplicateDetector, Fingerprint};
pub use models::{
    AccountCodeMap, Category, DefterConfig, ExtractedFields, LedgerEntry, MediaKind,
    NormalizedRecord, RawDocument, RecordOrigin,
};
pub use pipeline::{
    history_from_store, retry::RetryPolicy, AbortFlag, BatchFailure, BatchOutcome, Pipeline,
};
pub use service::{ExtractionMode, RecognitionPayload, RecognitionService};
pub use store::{export_file_name, TabularStore};
