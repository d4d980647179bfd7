//! Regex patterns and keyword tables for receipt text extraction.
//!
//! The keyword vocabulary is Turkish-first (TOPLAM, KDV) with English
//! fallbacks, since that is what the supported fiscal receipts print.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Date in DD.MM.YYYY, also tolerating / and - separators
    pub static ref DATE_DMY: Regex = Regex::new(
        r"\b(\d{2})[./\-](\d{2})[./\-](\d{4})\b"
    ).unwrap();

    // Amount with a two-digit decimal part, optionally preceded by stray
    // currency markers injected by OCR noise
    pub static ref AMOUNT_PATTERN: Regex = Regex::new(
        r"[₺$€£*]?\s*(\d[\d.,]*[.,]\d{2})\b"
    ).unwrap();

    // Receipt/fiscal number labels (FİŞ NO: 0042)
    pub static ref RECEIPT_NUMBER: Regex = Regex::new(
        r"(?i)(?:fi[şs]\s*no|belge\s*no|receipt\s*(?:no|#))[\s:.]*([A-Za-z0-9/\-]+)"
    ).unwrap();
}

/// Keywords marking a grand-total line.
pub const TOTAL_KEYWORDS: &[&str] = &["TOPLAM", "TUTAR", "TOTAL", "AMOUNT DUE"];

/// Keywords marking a tax line, including the compound total-tax label.
pub const TAX_KEYWORDS: &[&str] = &["TOPKDV", "KDV", "VAT", "TAX"];

/// Currency markers stripped before amount parsing.
pub const CURRENCY_MARKERS: &[&str] = &["₺", "TL", "TRY", "$", "USD", "€", "EUR", "£", "GBP", "PLN"];

/// Case-folded containment check against a keyword table.
///
/// Uppercases the haystack so Turkish receipts in mixed case still match
/// the all-caps keyword vocabulary.
pub fn contains_keyword(line: &str, keywords: &[&str]) -> bool {
    let upper = line.to_uppercase();
    keywords.iter().any(|k| upper.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_pattern() {
        assert!(DATE_DMY.is_match("Tarih: 15.01.2024"));
        assert!(DATE_DMY.is_match("15/01/2024"));
        assert!(DATE_DMY.is_match("15-01-2024"));
        assert!(!DATE_DMY.is_match("2024-01-15"));
    }

    #[test]
    fn test_amount_pattern_strips_currency_noise() {
        let caps = AMOUNT_PATTERN.captures("TOPLAM *₺1.850,53").unwrap();
        assert_eq!(&caps[1], "1.850,53");
    }

    #[test]
    fn test_keyword_matching_is_case_folded() {
        assert!(contains_keyword("Toplam: 45.00", TOTAL_KEYWORDS));
        assert!(contains_keyword("topkdv 8.10", TAX_KEYWORDS));
        assert!(!contains_keyword("ara fark", TOTAL_KEYWORDS));
    }
}
