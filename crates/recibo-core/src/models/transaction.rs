//! Draft transactions created from confident receipt extractions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::config::PolicyConfig;
use crate::models::receipt::ReceiptData;

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

/// A transaction awaiting user confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftTransaction {
    pub amount: Decimal,

    /// ISO-8601 transaction date.
    pub date: String,

    #[serde(rename = "type")]
    pub kind: TransactionKind,

    pub description: String,
    pub is_draft: bool,
    pub origin: String,
    pub is_transfer_leg: bool,
    pub is_pending: bool,
}

impl DraftTransaction {
    /// Build a draft expense from a receipt, if the policy allows it.
    ///
    /// Requires a detected amount and a confidence of at least
    /// `policy.min_confidence`.
    pub fn from_receipt(receipt: &ReceiptData, policy: &PolicyConfig) -> Option<Self> {
        let amount = receipt.amount?;

        if !receipt.meets_confidence(policy.min_confidence) {
            debug!(
                "Confidence {:.2} below {:.2}, no draft transaction",
                receipt.confidence, policy.min_confidence
            );
            return None;
        }

        let description = match &receipt.merchant {
            Some(merchant) => format!("{} - {}{:.2}", merchant, policy.currency_symbol, amount),
            None => "Receipt from OCR".to_string(),
        };

        Some(Self {
            amount,
            date: receipt.date_iso(),
            // Receipts are expenses.
            kind: TransactionKind::Expense,
            description,
            is_draft: true,
            origin: "ocr".to_string(),
            is_transfer_leg: false,
            is_pending: false,
        })
    }
}
