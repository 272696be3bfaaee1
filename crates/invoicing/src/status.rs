//! Invoice status classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use invoiceflow_core::DomainError;

use crate::money::is_zero_amount;

/// Display status of an invoice, derived (never stored).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceStatus {
    Draft,
    Paid,
    Overdue,
    Archived,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Archived,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Overdue => "OVERDUE",
            InvoiceStatus::Archived => "ARCHIVED",
        }
    }
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

impl core::str::FromStr for InvoiceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown invoice status: {s}")))
    }
}

/// Classify an invoice.
///
/// Precedence: archived, then paid off (zero balance), then overdue.
/// `now` is supplied by the caller.
pub fn classify(
    archived: bool,
    balance_due: f64,
    due_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> InvoiceStatus {
    if archived {
        InvoiceStatus::Archived
    } else if is_zero_amount(balance_due) {
        InvoiceStatus::Paid
    } else if now > due_date {
        InvoiceStatus::Overdue
    } else {
        InvoiceStatus::Draft
    }
}

/// Anything carrying the three inputs the classifier needs.
pub trait Classify {
    fn is_archived(&self) -> bool;
    fn balance_due(&self) -> f64;
    fn due_date(&self) -> DateTime<Utc>;

    fn status(&self, now: DateTime<Utc>) -> InvoiceStatus {
        classify(self.is_archived(), self.balance_due(), self.due_date(), now)
    }
}
