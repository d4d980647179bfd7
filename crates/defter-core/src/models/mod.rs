//! Data models for documents, extracted records, and ledger rows.

pub mod config;
pub mod record;

pub use config::{AccountCodeMap, DefterConfig, ExtractionConfig, PipelineConfig, RetryConfig};
pub use record::{
    Category, ExtractedFields, LedgerEntry, MediaKind, NormalizedRecord, RawDocument, RecordOrigin,
};
