//! Locale-ambiguous monetary normalization.
//!
//! OCR output mixes comma-decimal Turkish formatting ("1.850,53"),
//! dot-decimal output ("1850.53"), and garbled multi-dot reads
//! ("1.000.000.50"). Normalization never fails: anything unparseable
//! degrades to zero, which downstream logic treats as "amount unknown,
//! needs review".

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::CURRENCY_MARKERS;

/// Parse a raw monetary string into an exact non-negative decimal.
///
/// Comma presence is checked before multi-dot collapsing: a comma is the
/// strongest signal of a European-format number, so "1.234,56" must not
/// be treated as a multi-dot integer.
pub fn normalize_amount(raw: &str) -> Decimal {
    // Amounts carry no meaningful case; uppercasing lets the marker
    // table match "tl" and "Tl" reads too
    let mut text = raw.trim().to_uppercase();
    for marker in CURRENCY_MARKERS {
        text = text.replace(marker, "");
    }

    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    if cleaned.is_empty() {
        return Decimal::ZERO;
    }

    let dot_count = cleaned.matches('.').count();
    let normalized = if dot_count > 1 && !cleaned.contains(',') {
        // Multi-dot with no comma: every dot but the last is a thousands
        // separator inserted by noisy OCR
        let last_dot = cleaned.rfind('.').unwrap_or(0);
        cleaned
            .char_indices()
            .filter(|&(i, c)| c != '.' || i == last_dot)
            .map(|(_, c)| c)
            .collect()
    } else if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };

    match Decimal::from_str(&normalized) {
        Ok(amount) if amount >= Decimal::ZERO => amount,
        _ => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_turkish_format() {
        assert_eq!(normalize_amount("1.850,53"), dec("1850.53"));
        assert_eq!(normalize_amount("12.345.678,90"), dec("12345678.90"));
    }

    #[test]
    fn test_multi_dot_ocr_noise() {
        assert_eq!(normalize_amount("1.000.000.50"), dec("1000000.50"));
    }

    #[test]
    fn test_currency_markers() {
        assert_eq!(normalize_amount("200,00 TL"), dec("200.00"));
        assert_eq!(normalize_amount("₺ 45.90"), dec("45.90"));
        assert_eq!(normalize_amount("*150.50"), dec("150.50"));
    }

    #[test]
    fn test_plain_dot_decimal() {
        assert_eq!(normalize_amount("150.50"), dec("150.50"));
        assert_eq!(normalize_amount("150"), dec("150"));
    }

    #[test]
    fn test_unparseable_degrades_to_zero() {
        assert_eq!(normalize_amount(""), Decimal::ZERO);
        assert_eq!(normalize_amount("yok"), Decimal::ZERO);
        assert_eq!(normalize_amount("1,2,3.00"), Decimal::ZERO);
    }

    #[test]
    fn test_idempotent() {
        for raw in ["1.850,53", "1.000.000.50", "200,00 TL", "", "45.90"] {
            let once = normalize_amount(raw);
            let twice = normalize_amount(&once.to_string());
            assert_eq!(once, twice, "not idempotent for {raw:?}");
        }
    }
}
