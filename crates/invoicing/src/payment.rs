//! Payments and the pre-submission payment check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use invoiceflow_core::ValueObject;

use crate::money::exceeds;

/// A recorded payment against an invoice (append-only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub amount: f64,
    #[serde(alias = "createdAt", alias = "date")]
    pub paid_at: DateTime<Utc>,
}

impl ValueObject for Payment {}

/// Why a proposed payment was refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PaymentRejection {
    #[error("invalid amount")]
    InvalidAmount,

    #[error("overpayment not allowed")]
    Overpayment,
}

/// Check a proposed payment before it is sent.
///
/// Rules, in order: the amount must be a positive finite number, and it must
/// not exceed the balance due, sub-cent excess included. Nothing is
/// clamped; a rejected amount must be re-entered.
pub fn validate_payment(amount: f64, balance_due: f64) -> Result<(), PaymentRejection> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(PaymentRejection::InvalidAmount);
    }
    if exceeds(amount, balance_due) {
        return Err(PaymentRejection::Overpayment);
    }
    Ok(())
}
