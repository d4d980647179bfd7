//! Double-entry journal synthesis from normalized records.

use rust_decimal::Decimal;
use tracing::warn;

use crate::models::config::AccountCodeMap;
use crate::models::record::{LedgerEntry, NormalizedRecord, RecordOrigin};

/// Expand records into balanced journal rows.
///
/// Per record with total T and tax V: debit the category expense account
/// with the taxable base T − V, debit the tax account with V, credit the
/// payment account with T (bank for statement lines, cash otherwise).
/// Zero-amount rows are not emitted. A record that cannot produce a
/// usable taxable base (non-positive total, or tax exceeding total) is
/// skipped whole: partial ledger rows are a worse failure mode than a
/// missing transaction.
pub fn synthesize_entries(
    records: &[NormalizedRecord],
    accounts: &AccountCodeMap,
) -> Vec<LedgerEntry> {
    let mut entries = Vec::new();

    for record in records {
        let total = record.total_amount;
        let tax = record.tax_amount;

        if total <= Decimal::ZERO || tax < Decimal::ZERO || tax > total {
            warn!(
                merchant = %record.merchant_name,
                date = %record.date,
                %total,
                %tax,
                "skipping record without a usable taxable base"
            );
            continue;
        }

        let base = total - tax;
        let description = describe(record);

        if base > Decimal::ZERO {
            entries.push(LedgerEntry::debit(
                record.date.clone(),
                accounts.expense_for(record.category),
                description.clone(),
                base,
            ));
        }

        if tax > Decimal::ZERO {
            entries.push(LedgerEntry::debit(
                record.date.clone(),
                accounts.tax.clone(),
                format!("KDV - {description}"),
                tax,
            ));
        }

        let payment_account = match record.origin {
            RecordOrigin::StatementLine => accounts.bank.clone(),
            RecordOrigin::Receipt => accounts.cash.clone(),
        };
        entries.push(LedgerEntry::credit(
            record.date.clone(),
            payment_account,
            description,
            total,
        ));
    }

    entries
}

fn describe(record: &NormalizedRecord) -> String {
    let merchant = if record.merchant_name.is_empty() {
        "bilinmeyen"
    } else {
        record.merchant_name.as_str()
    };

    match &record.receipt_number {
        Some(number) => format!("{merchant} (fis {number})"),
        None => merchant.to_string(),
    }
}
