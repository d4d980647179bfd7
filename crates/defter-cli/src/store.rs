//! JSON-file implementation of the tabular store seam.
//!
//! One directory holds every partition as a pair of files:
//! `{partition}.records.json` and `{partition}.journal.json`.

use std::fs;
use std::path::{Path, PathBuf};

use defter_core::{LedgerEntry, NormalizedRecord, StoreError, TabularStore};

pub struct JsonLedgerStore {
    root: PathBuf,
}

impl JsonLedgerStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn records_path(&self, partition: &str) -> PathBuf {
        self.root.join(format!("{partition}.records.json"))
    }

    fn journal_path(&self, partition: &str) -> PathBuf {
        self.root.join(format!("{partition}.journal.json"))
    }

    fn read_array<T: serde::de::DeserializeOwned>(
        path: &Path,
        partition: &str,
    ) -> Result<Vec<T>, StoreError> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path).map_err(|e| StoreError::Read {
            partition: partition.to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| StoreError::Read {
            partition: partition.to_string(),
            reason: e.to_string(),
        })
    }

    fn write_array<T: serde::Serialize>(
        &self,
        path: &Path,
        partition: &str,
        rows: &[T],
    ) -> Result<(), StoreError> {
        let append_err = |reason: String| StoreError::Append {
            partition: partition.to_string(),
            reason,
        };

        fs::create_dir_all(&self.root).map_err(|e| append_err(e.to_string()))?;
        let content = serde_json::to_string_pretty(rows).map_err(|e| append_err(e.to_string()))?;
        fs::write(path, content).map_err(|e| append_err(e.to_string()))
    }
}

impl TabularStore for JsonLedgerStore {
    fn load_records(&self, partition: &str) -> Result<Vec<NormalizedRecord>, StoreError> {
        Self::read_array(&self.records_path(partition), partition)
    }

    fn append_records(
        &mut self,
        partition: &str,
        records: &[NormalizedRecord],
    ) -> Result<(), StoreError> {
        let path = self.records_path(partition);
        let mut existing: Vec<NormalizedRecord> = Self::read_array(&path, partition)?;
        existing.extend(records.iter().cloned());
        self.write_array(&path, partition, &existing)
    }

    fn append_entries(&mut self, partition: &str, entries: &[LedgerEntry]) -> Result<(), StoreError> {
        let path = self.journal_path(partition);
        let mut existing: Vec<LedgerEntry> = Self::read_array(&path, partition)?;
        existing.extend(entries.iter().cloned());
        self.write_array(&path, partition, &existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use defter_core::{ExtractedFields, RecordOrigin};

    #[test]
    fn test_roundtrip_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonLedgerStore::new(dir.path());

        assert!(store.load_records("musteri1").unwrap().is_empty());

        let record = NormalizedRecord::from_extracted(
            &ExtractedFields {
                merchant_name: "MIGROS".to_string(),
                date: "15.01.2024".to_string(),
                total_amount: "150,50".to_string(),
                ..Default::default()
            },
            RecordOrigin::Receipt,
            Some("fis.jpg".to_string()),
        );

        store.append_records("musteri1", &[record.clone()]).unwrap();
        store.append_records("musteri1", &[record]).unwrap();

        let loaded = store.load_records("musteri1").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].merchant_name, "MIGROS");

        // Partitions do not leak into each other
        assert!(store.load_records("musteri2").unwrap().is_empty());
    }
}
