//! Configuration structures for the extraction pipeline.
//!
//! All configuration is owned by the caller and passed in at call time;
//! there is no process-wide mutable state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::record::Category;

/// Main configuration for the defter pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefterConfig {
    /// Batch processing configuration.
    pub pipeline: PipelineConfig,

    /// Retry/backoff policy for the recognition service.
    pub retry: RetryConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Account code mapping for journal synthesis.
    pub accounts: AccountCodeMap,
}

/// Batch processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of documents processed in parallel.
    pub jobs: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { jobs: 4 }
    }
}

/// Retry policy parameters for rate-limited service calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per document, including the first.
    pub max_attempts: u32,

    /// Base delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,

    /// Add a deterministic per-attempt jitter to spread out retries.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            jitter: true,
        }
    }
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Retry image documents across rotation angles when the first
    /// attempt scores below the sufficient-confidence threshold.
    pub scan_orientations: bool,

    /// Hosted vision model requested from the recognition service.
    pub model: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            scan_orientations: true,
            model: "gemini-1.5-flash".to_string(),
        }
    }
}

/// Mapping from category to expense account, plus the fixed tax, cash,
/// and bank accounts. Defaults follow the Turkish uniform chart of
/// accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountCodeMap {
    /// Expense account per category.
    pub expense: HashMap<Category, String>,

    /// Expense account for categories missing from the map.
    pub fallback_expense: String,

    /// Deductible tax account (indirilecek KDV).
    pub tax: String,

    /// Cash account credited for receipt purchases.
    pub cash: String,

    /// Bank account credited for statement-line purchases.
    pub bank: String,
}

impl Default for AccountCodeMap {
    fn default() -> Self {
        let expense = HashMap::from([
            (Category::Food, "770.01".to_string()),
            (Category::TransportFuel, "770.02".to_string()),
            (Category::Stationery, "770.03".to_string()),
            (Category::Technology, "770.04".to_string()),
            (Category::Lodging, "770.05".to_string()),
            (Category::Other, "770.99".to_string()),
        ]);

        Self {
            expense,
            fallback_expense: "770.99".to_string(),
            tax: "191".to_string(),
            cash: "100".to_string(),
            bank: "102".to_string(),
        }
    }
}

impl AccountCodeMap {
    /// Expense account code for a category.
    pub fn expense_for(&self, category: Category) -> &str {
        self.expense
            .get(&category)
            .map(String::as_str)
            .unwrap_or(&self.fallback_expense)
    }
}

impl DefterConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expense_for_falls_back() {
        let mut accounts = AccountCodeMap::default();
        assert_eq!(accounts.expense_for(Category::Food), "770.01");

        accounts.expense.remove(&Category::Lodging);
        assert_eq!(accounts.expense_for(Category::Lodging), "770.99");
    }

    #[test]
    fn test_config_roundtrip() {
        let config = DefterConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: DefterConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(back.pipeline.jobs, config.pipeline.jobs);
        assert_eq!(back.retry.max_attempts, config.retry.max_attempts);
        assert_eq!(back.accounts.tax, config.accounts.tax);
    }
}
