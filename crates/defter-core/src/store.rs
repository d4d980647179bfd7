//! Seams to the tabular store and archive collaborators.

use crate::error::StoreError;
use crate::models::record::{LedgerEntry, NormalizedRecord};

/// External ledger/spreadsheet store, one logical ledger per partition.
///
/// Deliberately narrow: the pipeline only ever appends rows and reads a
/// partition back in full to build the duplicate-detection snapshot.
pub trait TabularStore: Send + Sync {
    /// All previously persisted records for a partition.
    fn load_records(&self, partition: &str) -> Result<Vec<NormalizedRecord>, StoreError>;

    /// Append normalized records under a partition.
    fn append_records(
        &mut self,
        partition: &str,
        records: &[NormalizedRecord],
    ) -> Result<(), StoreError>;

    /// Append journal rows under a partition.
    fn append_entries(
        &mut self,
        partition: &str,
        entries: &[LedgerEntry],
    ) -> Result<(), StoreError>;
}

/// Deterministic per-record export name: `{date}_{merchant}_{amount}.{ext}`.
///
/// Used by the archive collaborator when packaging original document
/// bytes alongside their extracted records.
pub fn export_file_name(record: &NormalizedRecord, extension: &str) -> String {
    let merchant = sanitize_component(&record.merchant_name);
    let date = if record.date.is_empty() {
        "tarihsiz".to_string()
    } else {
        record.date.clone()
    };

    format!("{}_{}_{}.{}", date, merchant, record.total_amount, extension)
}

/// Reduce a free-text component to `[A-Za-z0-9_]`, collapsing runs.
fn sanitize_component(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = true;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }

    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        "belirsiz".to_string()
    } else {
        trimmed.to_string()
    }
}
