//! Record models covering the document-to-ledger data flow.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::extract::money::normalize_amount;

/// Declared media type of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Jpeg,
    Png,
    Pdf,
}

impl MediaKind {
    /// MIME type string sent to the recognition service.
    pub fn as_mime(self) -> &'static str {
        match self {
            MediaKind::Jpeg => "image/jpeg",
            MediaKind::Png => "image/png",
            MediaKind::Pdf => "application/pdf",
        }
    }

    /// Guess the media kind from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(MediaKind::Jpeg),
            "png" => Some(MediaKind::Png),
            "pdf" => Some(MediaKind::Pdf),
            _ => None,
        }
    }

    /// Whether the payload is a photographed/scanned image that may be
    /// rotated. Multi-page document formats are assumed upright.
    pub fn is_image(self) -> bool {
        matches!(self, MediaKind::Jpeg | MediaKind::Png)
    }
}

/// An uploaded document, consumed once by the pipeline.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Identifier carried through the pipeline (usually the file name).
    pub id: String,

    /// Opaque payload bytes.
    pub bytes: Vec<u8>,

    /// Declared media type.
    pub media: MediaKind,

    /// Optional side-channel payload (e.g. a machine-readable code read
    /// independently of the main text). Tried as a structured guess
    /// before any service call.
    pub hint: Option<String>,
}

impl RawDocument {
    pub fn new(id: impl Into<String>, bytes: Vec<u8>, media: MediaKind) -> Self {
        Self {
            id: id.into(),
            bytes,
            media,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Expense category assigned to a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Food,
    TransportFuel,
    Stationery,
    Technology,
    Lodging,
    #[default]
    Other,
}

impl Category {
    /// Parse a category from a free-form label, as returned by the
    /// structured-guess service.
    pub fn from_label(s: &str) -> Self {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "food" | "gida" | "gıda" | "yemek" => Category::Food,
            "transport_fuel" | "transport" | "fuel" | "ulasim" | "ulaşım" | "akaryakit" => {
                Category::TransportFuel
            }
            "stationery" | "kirtasiye" | "kırtasiye" => Category::Stationery,
            "technology" | "teknoloji" => Category::Technology,
            "lodging" | "konaklama" => Category::Lodging,
            _ => Category::Other,
        }
    }

    /// Display label.
    pub fn display(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::TransportFuel => "Transport/Fuel",
            Category::Stationery => "Stationery",
            Category::Technology => "Technology",
            Category::Lodging => "Lodging",
            Category::Other => "Other",
        }
    }
}

/// Confidence gained when a date is recognized.
pub const CONFIDENCE_DATE: u32 = 1;
/// Confidence gained when a total amount is recognized.
pub const CONFIDENCE_TOTAL: u32 = 2;
/// Confidence gained when a tax amount is recognized.
pub const CONFIDENCE_TAX: u32 = 1;
/// Score at which an extraction attempt is considered sufficient
/// (date and total both found).
pub const CONFIDENCE_SUFFICIENT: u32 = CONFIDENCE_DATE + CONFIDENCE_TOTAL;

/// Scored field set produced by one extraction attempt.
///
/// Amounts are kept in their raw pre-normalization form; monetary
/// normalization happens when the record is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedFields {
    /// Merchant name, may be empty.
    pub merchant_name: String,

    /// Receipt/fiscal number if one was recognized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,

    /// Date in `DD.MM.YYYY` wire form, empty if not found.
    pub date: String,

    /// Assigned expense category.
    #[serde(default)]
    pub category: Category,

    /// Total amount as written on the document.
    pub total_amount: String,

    /// Tax amount as written on the document.
    pub tax_amount: String,

    /// Heuristic confidence score, increased per signal found.
    #[serde(default)]
    pub confidence: u32,
}

/// Where a record came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOrigin {
    /// A single standalone receipt or invoice.
    #[default]
    Receipt,
    /// One row of a multi-transaction bank/card statement.
    StatementLine,
}

/// A normalized, de-duplication-annotated accounting record.
///
/// Field names follow the fixed wire schema; `rust_decimal` serializes
/// the amounts as decimal strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub merchant_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,

    /// Date in `DD.MM.YYYY` wire form.
    pub date: String,

    #[serde(default)]
    pub category: Category,

    /// Exact total amount. Zero means "amount unknown, needs review".
    pub total_amount: Decimal,

    /// Exact tax amount.
    pub tax_amount: Decimal,

    /// Source document identifier. Statement lines never carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_document: Option<String>,

    #[serde(default)]
    pub origin: RecordOrigin,

    /// Advisory duplicate annotation, resolved by human review.
    #[serde(default)]
    pub duplicate_suspect: bool,

    #[serde(default)]
    pub confidence: u32,
}

impl NormalizedRecord {
    /// Build a record from extracted fields, normalizing the amounts.
    ///
    /// Statement-line records drop the source document identifier and
    /// always start with the duplicate flag cleared.
    pub fn from_extracted(
        fields: &ExtractedFields,
        origin: RecordOrigin,
        source_document: Option<String>,
    ) -> Self {
        Self {
            merchant_name: fields.merchant_name.trim().to_string(),
            receipt_number: fields.receipt_number.clone(),
            date: fields.date.clone(),
            category: fields.category,
            total_amount: normalize_amount(&fields.total_amount),
            tax_amount: normalize_amount(&fields.tax_amount),
            source_document: match origin {
                RecordOrigin::Receipt => source_document,
                RecordOrigin::StatementLine => None,
            },
            origin,
            duplicate_suspect: false,
            confidence: fields.confidence,
        }
    }

    /// Validation problems that call for manual review.
    ///
    /// A problematic record is still kept in the output; it is flagged,
    /// never dropped.
    pub fn review_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.merchant_name.is_empty() {
            issues.push("missing merchant name".to_string());
        }

        if self.date.is_empty() {
            issues.push("missing date".to_string());
        } else if chrono::NaiveDate::parse_from_str(&self.date, "%d.%m.%Y").is_err() {
            issues.push(format!("date not in DD.MM.YYYY form: {}", self.date));
        }

        if self.total_amount <= Decimal::ZERO {
            issues.push("non-positive total amount".to_string());
        }

        if self.tax_amount > self.total_amount {
            issues.push(format!(
                "tax amount {} exceeds total {}",
                self.tax_amount, self.total_amount
            ));
        }

        if self.duplicate_suspect {
            issues.push("possible duplicate of an already recorded transaction".to_string());
        }

        issues
    }

    pub fn needs_review(&self) -> bool {
        !self.review_issues().is_empty()
    }
}

/// One debit or credit row of a double-entry journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Date in `DD.MM.YYYY` wire form.
    pub date: String,

    /// Account code the row posts to.
    pub account: String,

    /// Free-text description.
    pub description: String,

    /// Debit amount, zero when this is a credit row.
    pub debit: Decimal,

    /// Credit amount, zero when this is a debit row.
    pub credit: Decimal,
}

impl LedgerEntry {
    pub fn debit(
        date: impl Into<String>,
        account: impl Into<String>,
        description: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            date: date.into(),
            account: account.into(),
            description: description.into(),
            debit: amount,
            credit: Decimal::ZERO,
        }
    }

    pub fn credit(
        date: impl Into<String>,
        account: impl Into<String>,
        description: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            date: date.into(),
            account: account.into(),
            description: description.into(),
            debit: Decimal::ZERO,
            credit: amount,
        }
    }
}
