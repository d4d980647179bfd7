//! Line-oriented heuristic field extraction over raw recognized text.
//!
//! Used when no structured guess is available. All tie-break rules are
//! pure functions over plain text so they stay unit-testable without a
//! recognition service.

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::record::{
    Category, ExtractedFields, CONFIDENCE_DATE, CONFIDENCE_TAX, CONFIDENCE_TOTAL,
};

use super::money::normalize_amount;
use super::patterns::{
    contains_keyword, AMOUNT_PATTERN, DATE_DMY, RECEIPT_NUMBER, TAX_KEYWORDS, TOTAL_KEYWORDS,
};

/// How many lines below a keyword line are searched for the value.
/// OCR often splits a label and its amount across lines.
const VALUE_LOOKAHEAD_LINES: usize = 3;

/// An amount candidate: the raw string as written plus its normalized
/// value for tie-breaking.
#[derive(Debug, Clone)]
struct AmountCandidate {
    raw: String,
    value: Decimal,
}

/// Extract a scored field set from raw recognized text.
pub fn extract_heuristic(text: &str) -> ExtractedFields {
    let lines: Vec<&str> = text.lines().collect();
    let mut fields = ExtractedFields::default();

    fields.merchant_name = lines
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string();

    if let Some(caps) = DATE_DMY.captures(text) {
        fields.date = format!("{}.{}.{}", &caps[1], &caps[2], &caps[3]);
        fields.confidence += CONFIDENCE_DATE;
    }

    if let Some(caps) = RECEIPT_NUMBER.captures(text) {
        fields.receipt_number = Some(caps[1].to_string());
    }

    // A totals line names a total without also naming a tax; lines like
    // "TOPLAM KDV" belong to the tax search instead
    let total_candidates = collect_candidates(&lines, |line| {
        contains_keyword(line, TOTAL_KEYWORDS) && !contains_keyword(line, TAX_KEYWORDS)
    });
    let total = pick_total(&total_candidates);
    if let Some(candidate) = &total {
        fields.total_amount = candidate.raw.clone();
        fields.confidence += CONFIDENCE_TOTAL;
    }

    let tax_candidates = collect_candidates(&lines, |line| contains_keyword(line, TAX_KEYWORDS));
    if let Some(candidate) = pick_tax(&tax_candidates, total.as_ref().map(|t| t.value)) {
        fields.tax_amount = candidate.raw.clone();
        fields.confidence += CONFIDENCE_TAX;
    }

    fields.category = infer_category(text);

    debug!(
        merchant = %fields.merchant_name,
        date = %fields.date,
        total = %fields.total_amount,
        tax = %fields.tax_amount,
        confidence = fields.confidence,
        "heuristic extraction"
    );

    fields
}

/// Collect one amount candidate per keyword-matching line.
///
/// The value is searched on the keyword line itself first, then on up to
/// [`VALUE_LOOKAHEAD_LINES`] following lines. On whichever line matches,
/// the last amount wins: the rightmost number is the most likely grand
/// figure.
fn collect_candidates(lines: &[&str], is_keyword_line: impl Fn(&str) -> bool) -> Vec<AmountCandidate> {
    let mut candidates = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if !is_keyword_line(line) {
            continue;
        }

        let search_range = idx..lines.len().min(idx + 1 + VALUE_LOOKAHEAD_LINES);
        for line_idx in search_range {
            if let Some(raw) = last_amount_on_line(lines[line_idx]) {
                let value = normalize_amount(&raw);
                if value > Decimal::ZERO {
                    candidates.push(AmountCandidate { raw, value });
                }
                break;
            }
        }
    }

    candidates
}

fn last_amount_on_line(line: &str) -> Option<String> {
    AMOUNT_PATTERN
        .captures_iter(line)
        .last()
        .map(|caps| caps[1].to_string())
}

/// Pool all totals candidates and take the maximum: sub-totals are never
/// larger than the grand total, and garbled partial reads under-report.
fn pick_total(candidates: &[AmountCandidate]) -> Option<AmountCandidate> {
    candidates
        .iter()
        .max_by(|a, b| a.value.cmp(&b.value))
        .cloned()
}

/// Pick the largest tax candidate strictly below the total.
///
/// A candidate equal to the total is the totals line read twice; it is
/// discarded and the next-largest retried. With no total found there is
/// nothing to compare against and the largest candidate is kept.
fn pick_tax(candidates: &[AmountCandidate], total: Option<Decimal>) -> Option<AmountCandidate> {
    let mut sorted: Vec<&AmountCandidate> = candidates.iter().collect();
    sorted.sort_by(|a, b| b.value.cmp(&a.value));

    match total {
        Some(total) => sorted.into_iter().find(|c| c.value < total).cloned(),
        None => sorted.into_iter().next().cloned(),
    }
}

/// Keyword-based category inference over the full recognized text.
pub fn infer_category(text: &str) -> Category {
    let upper = text.to_uppercase();
    let any = |keywords: &[&str]| keywords.iter().any(|k| upper.contains(k));

    if any(&["RESTORAN", "RESTAURANT", "LOKANTA", "KAFE", "CAFE", "MARKET", "GIDA", "FIRIN", "MIGROS", "CARREFOUR"]) {
        Category::Food
    } else if any(&["AKARYAKIT", "PETROL", "BENZIN", "OTOPARK", "TAKSI", "OTOBUS", "SHELL", "OPET"]) {
        Category::TransportFuel
    } else if any(&["KIRTASIYE", "STATIONERY", "OFIS MALZEME"]) {
        Category::Stationery
    } else if any(&["TEKNOLOJI", "ELEKTRONIK", "BILGISAYAR", "TELEFON", "TEKNOSA"]) {
        Category::Technology
    } else if any(&["OTEL", "HOTEL", "KONAKLAMA", "PANSIYON"]) {
        Category::Lodging
    } else {
        Category::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn test_basic_receipt() {
        let text = "MIGROS TICARET A.S.\nTarih: 15.01.2024\nFIS NO: 0042\nTOPLAM 150,50\nKDV 25,00\n";
        let fields = extract_heuristic(text);

        assert_eq!(fields.merchant_name, "MIGROS TICARET A.S.");
        assert_eq!(fields.date, "15.01.2024");
        assert_eq!(fields.receipt_number.as_deref(), Some("0042"));
        assert_eq!(fields.total_amount, "150,50");
        assert_eq!(fields.tax_amount, "25,00");
        assert_eq!(fields.confidence, 4);
        assert_eq!(fields.category, Category::Food);
    }

    #[test]
    fn test_max_of_candidates_wins() {
        let text = "KASA\nTOPLAM 45.00\nARA KALEM\nTOPLAM 120.00\n";
        let fields = extract_heuristic(text);

        assert_eq!(fields.total_amount, "120.00");
    }

    #[test]
    fn test_last_amount_on_line_wins() {
        let text = "MAGAZA\nTOPLAM 3 x 15.00 45.00\n";
        let fields = extract_heuristic(text);

        assert_eq!(fields.total_amount, "45.00");
    }

    #[test]
    fn test_value_on_following_line() {
        let text = "MAGAZA\nGENEL TOPLAM\n\n\n1.850,53\n";
        let fields = extract_heuristic(text);

        assert_eq!(fields.total_amount, "1.850,53");
    }

    #[test]
    fn test_value_beyond_lookahead_is_ignored() {
        let text = "MAGAZA\nTOPLAM\nx\nx\nx\n99.00\n";
        let fields = extract_heuristic(text);

        assert_eq!(fields.total_amount, "");
        assert_eq!(fields.confidence, 0);
    }

    #[test]
    fn test_tax_equal_to_total_is_discarded() {
        let text = "MAGAZA\nTOPLAM 100.00\nKDV 100.00\nTOPKDV 18.00\n";
        let fields = extract_heuristic(text);

        assert_eq!(fields.total_amount, "100.00");
        assert_eq!(fields.tax_amount, "18.00");
    }

    #[test]
    fn test_tax_must_be_below_total() {
        let text = "MAGAZA\nTOPLAM 50.00\nKDV 50.00\n";
        let fields = extract_heuristic(text);

        assert_eq!(fields.tax_amount, "");
        assert_eq!(fields.confidence, 2);
    }

    #[test]
    fn test_compound_tax_line_is_not_a_totals_line() {
        let text = "MAGAZA\nTOPLAM KDV 18.00\nTOPLAM 118.00\n";
        let fields = extract_heuristic(text);

        assert_eq!(fields.total_amount, "118.00");
        assert_eq!(fields.tax_amount, "18.00");
    }

    #[test]
    fn test_empty_text() {
        let fields = extract_heuristic("");
        assert_eq!(fields.merchant_name, "");
        assert_eq!(fields.confidence, 0);
    }

    #[test]
    fn test_candidate_normalization() {
        let text = "MAGAZA\nTOPLAM ₺1.850,53\n";
        let fields = extract_heuristic(text);
        assert_eq!(
            normalize_amount(&fields.total_amount),
            Decimal::from_str("1850.53").unwrap()
        );
    }
}
