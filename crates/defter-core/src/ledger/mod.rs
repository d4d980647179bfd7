//! Ledger-side processing: duplicate annotation and double-entry
//! journal synthesis.

pub mod duplicate;
pub mod synthesize;

pub use duplicate::{fingerprint_snapshot, DuplicateDetector, Fingerprint};
pub use synthesize::synthesize_entries;
