//! Invoice records as the backend returns them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use invoiceflow_core::{DomainError, DomainResult, Entity, InvoiceId};

use crate::draft::CreateInvoice;
use crate::money::{AMOUNT_EPSILON, Currency, LineItem, Totals, compute_totals, exceeds};
use crate::payment::Payment;
use crate::status::Classify;

/// Invoice header with its cached money figures.
///
/// `subtotal`, `tax_amount`, `total`, `amount_paid` and `balance_due` are a
/// cache of what the backend computed. They are replaced wholesale whenever a
/// fresh copy is fetched; the client never edits them field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(rename = "_id", alias = "id")]
    pub id: InvoiceId,
    pub invoice_number: String,
    pub customer_name: String,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub tax_percent: f64,
    #[serde(rename = "isArchived", alias = "archived", default)]
    pub archived: bool,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub tax_amount: f64,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub amount_paid: f64,
    #[serde(default)]
    pub balance_due: f64,
}

impl Invoice {
    /// Build a fresh invoice from a validated creation payload.
    pub fn from_create(id: InvoiceId, cmd: &CreateInvoice) -> Self {
        let Totals {
            subtotal,
            tax_amount,
            total,
        } = compute_totals(&cmd.line_items, cmd.tax_percent);

        Self {
            id,
            invoice_number: cmd.invoice_number.clone(),
            customer_name: cmd.customer_name.clone(),
            issue_date: cmd.issue_date,
            due_date: cmd.due_date,
            currency: cmd.currency,
            tax_percent: cmd.tax_percent,
            archived: false,
            subtotal,
            tax_amount,
            total,
            amount_paid: 0.0,
            balance_due: total,
        }
    }

    pub fn totals(&self) -> Totals {
        Totals {
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            total: self.total,
        }
    }

    /// Invariant: archived invoices are read-only and fully paid ones accept nothing.
    pub fn can_accept_payment(&self) -> bool {
        !self.archived && self.balance_due > AMOUNT_EPSILON
    }

    /// Record a payment, keeping `amount_paid <= total`.
    pub fn register_payment(&mut self, amount: f64) -> DomainResult<()> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(DomainError::validation("payment amount must be positive"));
        }
        if !self.can_accept_payment() {
            return Err(DomainError::invariant(
                "cannot register payment on archived or fully paid invoice",
            ));
        }
        let new_total_paid = self.amount_paid + amount;
        if exceeds(new_total_paid, self.total) {
            return Err(DomainError::invariant("cannot overpay invoice"));
        }

        // Float noise within AMOUNT_EPSILON must not push amount_paid past total.
        self.amount_paid = new_total_paid.min(self.total);
        self.balance_due = (self.total - self.amount_paid).max(0.0);
        Ok(())
    }

    pub fn archive(&mut self) -> DomainResult<()> {
        if self.archived {
            return Err(DomainError::conflict("invoice is already archived"));
        }
        self.archived = true;
        Ok(())
    }

    pub fn restore(&mut self) -> DomainResult<()> {
        if !self.archived {
            return Err(DomainError::conflict("invoice is not archived"));
        }
        self.archived = false;
        Ok(())
    }
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Classify for Invoice {
    fn is_archived(&self) -> bool {
        self.archived
    }

    fn balance_due(&self) -> f64 {
        self.balance_due
    }

    fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }
}

/// Row of the invoice list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: InvoiceId,
    pub invoice_number: String,
    pub customer_name: String,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub amount_paid: f64,
    #[serde(default)]
    pub balance_due: f64,
    #[serde(rename = "isArchived", alias = "archived", default)]
    pub archived: bool,
}

impl From<&Invoice> for InvoiceSummary {
    fn from(invoice: &Invoice) -> Self {
        Self {
            id: invoice.id.clone(),
            invoice_number: invoice.invoice_number.clone(),
            customer_name: invoice.customer_name.clone(),
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            currency: invoice.currency,
            total: invoice.total,
            amount_paid: invoice.amount_paid,
            balance_due: invoice.balance_due,
            archived: invoice.archived,
        }
    }
}

impl Entity for InvoiceSummary {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Classify for InvoiceSummary {
    fn is_archived(&self) -> bool {
        self.archived
    }

    fn balance_due(&self) -> f64 {
        self.balance_due
    }

    fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }
}

/// Single-invoice view: header, lines, payments and the authoritative balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    pub total: f64,
    pub amount_paid: f64,
    pub balance_due: f64,
}

impl InvoiceDetail {
    pub fn id(&self) -> &InvoiceId {
        &self.invoice.id
    }

    /// Client-side re-derivation of the money figures from the line items.
    pub fn preview_totals(&self) -> Totals {
        compute_totals(&self.line_items, self.invoice.tax_percent)
    }
}

impl Classify for InvoiceDetail {
    fn is_archived(&self) -> bool {
        self.invoice.archived
    }

    fn balance_due(&self) -> f64 {
        self.balance_due
    }

    fn due_date(&self) -> DateTime<Utc> {
        self.invoice.due_date
    }
}

/// Render a date the way the invoice screens show it, e.g. `05 March 2025`.
pub fn format_display_date(date: DateTime<Utc>) -> String {
    date.format("%d %B %Y").to_string()
}
