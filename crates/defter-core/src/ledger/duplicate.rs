//! Duplicate-transaction detection over (date, amount) fingerprints.

use std::collections::HashSet;

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::record::{NormalizedRecord, RecordOrigin};

/// Deterministic key for likely-duplicate detection.
///
/// Only used for equality lookups, never ordered. Deliberately carries
/// no merchant component, so two same-day equal-amount purchases from
/// different vendors will collide; the annotation is advisory and
/// resolved by human review.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    date: String,
    total: Decimal,
}

impl Fingerprint {
    pub fn of(record: &NormalizedRecord) -> Self {
        Self {
            date: record.date.clone(),
            total: record.total_amount,
        }
    }
}

/// Build the batch snapshot from previously persisted records.
///
/// Fetched once per batch and shared across workers, so every document
/// in the batch sees the same history.
pub fn fingerprint_snapshot<'a>(
    records: impl IntoIterator<Item = &'a NormalizedRecord>,
) -> HashSet<Fingerprint> {
    records.into_iter().map(Fingerprint::of).collect()
}

/// Advisory duplicate detector over a historical fingerprint snapshot.
#[derive(Debug, Clone, Default)]
pub struct DuplicateDetector {
    seen: HashSet<Fingerprint>,
}

impl DuplicateDetector {
    pub fn new(seen: HashSet<Fingerprint>) -> Self {
        Self { seen }
    }

    /// Annotate a record in place and remember its fingerprint.
    ///
    /// Statement lines are exempt: the same physical charge is expected
    /// to appear both as a receipt and as a statement row, and flagging
    /// that would false-positive on every statement import.
    pub fn annotate(&mut self, record: &mut NormalizedRecord) {
        if record.origin == RecordOrigin::StatementLine {
            return;
        }

        let fingerprint = Fingerprint::of(record);
        if self.seen.contains(&fingerprint) {
            debug!(
                merchant = %record.merchant_name,
                date = %record.date,
                total = %record.total_amount,
                "duplicate suspect"
            );
            record.duplicate_suspect = true;
        } else {
            self.seen.insert(fingerprint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::ExtractedFields;
    use pretty_assertions::assert_eq;

    fn record(merchant: &str, date: &str, total: &str, origin: RecordOrigin) -> NormalizedRecord {
        NormalizedRecord::from_extracted(
            &ExtractedFields {
                merchant_name: merchant.to_string(),
                date: date.to_string(),
                total_amount: total.to_string(),
                ..Default::default()
            },
            origin,
            None,
        )
    }

    #[test]
    fn test_second_identical_record_is_flagged() {
        let mut detector = DuplicateDetector::default();

        let mut first = record("A", "15.01.2024", "100.00", RecordOrigin::Receipt);
        let mut second = record("B", "15.01.2024", "100.00", RecordOrigin::Receipt);

        detector.annotate(&mut first);
        detector.annotate(&mut second);

        assert!(!first.duplicate_suspect);
        // Merchant plays no part in the fingerprint
        assert!(second.duplicate_suspect);
    }

    #[test]
    fn test_statement_lines_are_exempt() {
        let history = fingerprint_snapshot([&record("A", "15.01.2024", "100.00", RecordOrigin::Receipt)]);
        let mut detector = DuplicateDetector::new(history);

        let mut line = record("A", "15.01.2024", "100.00", RecordOrigin::StatementLine);
        detector.annotate(&mut line);

        assert!(!line.duplicate_suspect);
    }

    #[test]
    fn test_snapshot_seeds_detection() {
        let history = fingerprint_snapshot([&record("A", "15.01.2024", "100.00", RecordOrigin::Receipt)]);
        let mut detector = DuplicateDetector::new(history);

        let mut incoming = record("A", "15.01.2024", "100.00", RecordOrigin::Receipt);
        detector.annotate(&mut incoming);
        assert!(incoming.duplicate_suspect);

        let mut different = record("A", "16.01.2024", "100.00", RecordOrigin::Receipt);
        detector.annotate(&mut different);
        assert!(!different.duplicate_suspect);
    }
}
