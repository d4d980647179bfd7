//! Delegated extraction: cleanup of a structured guess produced by the
//! hosted vision model.
//!
//! The service already did the reading; this side only strips markdown
//! code fences, parses the wire schema leniently, and rescores.

use serde::{Deserialize, Deserializer};

use crate::error::ParseError;
use crate::models::record::{
    Category, ExtractedFields, CONFIDENCE_DATE, CONFIDENCE_TAX, CONFIDENCE_TOTAL,
};

use super::money::normalize_amount;

/// Incoming wire record. Amounts may arrive as JSON numbers or strings,
/// and the model sometimes falls back to the legacy Turkish key names.
#[derive(Debug, Deserialize)]
struct WireFields {
    #[serde(default, alias = "isyeri_adi", deserialize_with = "lenient_string")]
    merchant_name: String,

    #[serde(default, alias = "fis_no", deserialize_with = "lenient_opt_string")]
    receipt_number: Option<String>,

    #[serde(default, alias = "tarih", deserialize_with = "lenient_string")]
    date: String,

    #[serde(default, alias = "kategori", deserialize_with = "lenient_opt_string")]
    category: Option<String>,

    #[serde(default, alias = "toplam_tutar", deserialize_with = "lenient_string")]
    total_amount: String,

    #[serde(default, alias = "toplam_kdv", deserialize_with = "lenient_string")]
    tax_amount: String,
}

impl From<WireFields> for ExtractedFields {
    fn from(wire: WireFields) -> Self {
        let mut fields = ExtractedFields {
            merchant_name: wire.merchant_name.trim().to_string(),
            receipt_number: wire.receipt_number.filter(|n| !n.is_empty()),
            date: wire.date.trim().to_string(),
            category: wire
                .category
                .as_deref()
                .map(Category::from_label)
                .unwrap_or_default(),
            total_amount: wire.total_amount,
            tax_amount: wire.tax_amount,
            confidence: 0,
        };
        score_fields(&mut fields);
        fields
    }
}

/// Strip a surrounding markdown code fence, with or without a language
/// tag, as the model likes to decorate its JSON.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Recompute the confidence score from the signals actually present.
pub fn score_fields(fields: &mut ExtractedFields) {
    let mut confidence = 0;
    if !fields.date.is_empty() {
        confidence += CONFIDENCE_DATE;
    }
    if normalize_amount(&fields.total_amount) > rust_decimal::Decimal::ZERO {
        confidence += CONFIDENCE_TOTAL;
    }
    if normalize_amount(&fields.tax_amount) > rust_decimal::Decimal::ZERO {
        confidence += CONFIDENCE_TAX;
    }
    fields.confidence = confidence;
}

/// Parse a single structured guess into a field set.
pub fn parse_structured(raw: &str) -> Result<ExtractedFields, ParseError> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err(ParseError::EmptyBody);
    }

    let wire: WireFields = serde_json::from_str(body)?;
    Ok(wire.into())
}

/// Parse a statement extraction: an array of wire records, one per
/// transaction line.
pub fn parse_statement(raw: &str) -> Result<Vec<ExtractedFields>, ParseError> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err(ParseError::EmptyBody);
    }

    let value: serde_json::Value = serde_json::from_str(body)?;
    if !value.is_array() {
        let mut preview = body.chars().take(40).collect::<String>();
        if body.chars().count() > 40 {
            preview.push('…');
        }
        return Err(ParseError::NotAnArray(preview));
    }

    let wires: Vec<WireFields> = serde_json::from_value(value)?;
    Ok(wires.into_iter().map(ExtractedFields::from).collect())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value_to_string(value))
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => None,
        other => Some(value_to_string(other)),
    })
}

fn value_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_structured() {
        let raw = r#"```json
        {"merchant_name": "MIGROS", "receipt_number": null, "date": "15.01.2024",
         "category": "food", "total_amount": "150.50", "tax_amount": "25.00"}
        ```"#;

        let fields = parse_structured(raw).unwrap();
        assert_eq!(fields.merchant_name, "MIGROS");
        assert_eq!(fields.receipt_number, None);
        assert_eq!(fields.category, Category::Food);
        assert_eq!(fields.confidence, 4);
    }

    #[test]
    fn test_parse_structured_lenient_values() {
        let raw = r#"{"isyeri_adi": "OPET", "tarih": "01.02.2024",
                      "toplam_tutar": 420.5, "toplam_kdv": 0}"#;

        let fields = parse_structured(raw).unwrap();
        assert_eq!(fields.merchant_name, "OPET");
        assert_eq!(fields.total_amount, "420.5");
        assert_eq!(fields.tax_amount, "0");
        // date + total, no tax signal
        assert_eq!(fields.confidence, 3);
    }

    #[test]
    fn test_parse_structured_rejects_garbage() {
        assert!(parse_structured("not json at all").is_err());
        assert!(matches!(parse_structured("``` ```"), Err(ParseError::EmptyBody)));
    }

    #[test]
    fn test_parse_statement() {
        let raw = r#"[
            {"merchant_name": "A", "date": "01.01.2024", "total_amount": "10.00", "tax_amount": "0"},
            {"merchant_name": "B", "date": "02.01.2024", "total_amount": "20.00", "tax_amount": "0"}
        ]"#;

        let lines = parse_statement(raw).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].merchant_name, "B");
    }

    #[test]
    fn test_parse_statement_rejects_object() {
        let raw = r#"{"merchant_name": "A"}"#;
        assert!(matches!(parse_statement(raw), Err(ParseError::NotAnArray(_))));
    }
}
