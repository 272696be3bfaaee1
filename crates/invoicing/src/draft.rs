//! Invoice creation: form state, validation and the create payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use invoiceflow_core::{DomainError, DomainResult};

use crate::money::{Currency, LineItem, Totals, compute_totals};

pub const MISSING_FIELDS: &str = "Please fill all invoice fields";
pub const NO_LINE_ITEMS: &str = "Add at least one line item";
pub const INVALID_LINE_ITEM: &str = "Line item fields invalid";
pub const INVALID_TAX: &str = "Tax percent must be a non-negative number";

/// Editable state of the "create invoice" form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InvoiceDraft {
    pub invoice_number: String,
    pub customer_name: String,
    pub issue_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub currency: Currency,
    pub tax_percent: f64,
    pub line_items: Vec<LineItem>,
}

/// Validated payload sent to the backend's create call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoice {
    pub invoice_number: String,
    pub customer_name: String,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub currency: Currency,
    pub tax_percent: f64,
    pub line_items: Vec<LineItem>,
}

impl InvoiceDraft {
    pub fn add_line_item(&mut self, item: LineItem) {
        self.line_items.push(item);
    }

    /// Remove a line, keeping at least one on the form.
    pub fn remove_line_item(&mut self, index: usize) -> Option<LineItem> {
        if self.line_items.len() <= 1 || index >= self.line_items.len() {
            return None;
        }
        Some(self.line_items.remove(index))
    }

    /// Live totals for the form preview.
    pub fn preview(&self) -> Totals {
        compute_totals(&self.line_items, self.tax_percent)
    }

    /// Check the form and produce the create payload.
    ///
    /// Nothing is sent to the backend when this fails.
    pub fn validate(&self) -> DomainResult<CreateInvoice> {
        let invoice_number = self.invoice_number.trim();
        let customer_name = self.customer_name.trim();

        let (Some(issue_date), Some(due_date)) = (self.issue_date, self.due_date) else {
            return Err(DomainError::validation(MISSING_FIELDS));
        };
        if invoice_number.is_empty() || customer_name.is_empty() {
            return Err(DomainError::validation(MISSING_FIELDS));
        }

        if self.line_items.is_empty() {
            return Err(DomainError::validation(NO_LINE_ITEMS));
        }
        if !self.line_items.iter().all(line_item_is_valid) {
            return Err(DomainError::validation(INVALID_LINE_ITEM));
        }

        if !self.tax_percent.is_finite() || self.tax_percent < 0.0 {
            return Err(DomainError::validation(INVALID_TAX));
        }

        Ok(CreateInvoice {
            invoice_number: invoice_number.to_string(),
            customer_name: customer_name.to_string(),
            issue_date,
            due_date,
            currency: self.currency,
            tax_percent: self.tax_percent,
            line_items: self.line_items.clone(),
        })
    }
}

impl CreateInvoice {
    /// Server-side re-check of a payload that may not have gone through a draft.
    pub fn ensure_valid(&self) -> DomainResult<()> {
        InvoiceDraft::from(self.clone()).validate().map(|_| ())
    }
}

impl From<CreateInvoice> for InvoiceDraft {
    fn from(cmd: CreateInvoice) -> Self {
        Self {
            invoice_number: cmd.invoice_number,
            customer_name: cmd.customer_name,
            issue_date: Some(cmd.issue_date),
            due_date: Some(cmd.due_date),
            currency: cmd.currency,
            tax_percent: cmd.tax_percent,
            line_items: cmd.line_items,
        }
    }
}

fn line_item_is_valid(item: &LineItem) -> bool {
    !item.description.trim().is_empty()
        && item.quantity.is_finite()
        && item.quantity > 0.0
        && item.unit_price.is_finite()
        && item.unit_price > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn valid_draft() -> InvoiceDraft {
        InvoiceDraft {
            invoice_number: " INV-1002 ".to_string(),
            customer_name: "Acme".to_string(),
            issue_date: Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()),
            due_date: Some(Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0).unwrap()),
            currency: Currency::Inr,
            tax_percent: 10.0,
            line_items: vec![LineItem::new("Design", 2.0, 10.0), LineItem::new("Hosting", 1.0, 5.0)],
        }
    }

    fn validation_message(draft: &InvoiceDraft) -> String {
        match draft.validate() {
            Err(DomainError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_draft_produces_trimmed_payload() {
        let cmd = valid_draft().validate().unwrap();
        assert_eq!(cmd.invoice_number, "INV-1002");
        assert_eq!(cmd.currency, Currency::Inr);
        assert_eq!(cmd.line_items.len(), 2);
        assert!(cmd.ensure_valid().is_ok());
    }

    #[test]
    fn missing_identity_or_dates_are_rejected() {
        let mut draft = valid_draft();
        draft.customer_name = "   ".to_string();
        assert_eq!(validation_message(&draft), MISSING_FIELDS);

        let mut draft = valid_draft();
        draft.due_date = None;
        assert_eq!(validation_message(&draft), MISSING_FIELDS);
    }

    #[test]
    fn empty_line_items_are_rejected() {
        let mut draft = valid_draft();
        draft.line_items.clear();
        assert_eq!(validation_message(&draft), NO_LINE_ITEMS);
    }

    #[test]
    fn invalid_line_items_are_rejected() {
        for bad in [
            LineItem::new("", 1.0, 5.0),
            LineItem::new("Hosting", 0.0, 5.0),
            LineItem::new("Hosting", 1.0, -1.0),
            LineItem::new("Hosting", f64::NAN, 5.0),
        ] {
            let mut draft = valid_draft();
            draft.add_line_item(bad);
            assert_eq!(validation_message(&draft), INVALID_LINE_ITEM);
        }
    }

    #[test]
    fn negative_tax_is_rejected() {
        let mut draft = valid_draft();
        draft.tax_percent = -1.0;
        assert_eq!(validation_message(&draft), INVALID_TAX);
    }

    #[test]
    fn preview_matches_money_model() {
        let totals = valid_draft().preview();
        assert_eq!(totals.subtotal, 25.0);
        assert_eq!(totals.tax_amount, 2.5);
        assert_eq!(totals.total, 27.5);
    }

    #[test]
    fn last_line_item_cannot_be_removed() {
        let mut draft = valid_draft();
        assert!(draft.remove_line_item(1).is_some());
        assert!(draft.remove_line_item(0).is_none());
        assert_eq!(draft.line_items.len(), 1);
    }

    #[test]
    fn payload_serializes_with_backend_field_names() {
        let cmd = valid_draft().validate().unwrap();
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["invoiceNumber"], "INV-1002");
        assert_eq!(json["taxPercent"], 10.0);
        assert_eq!(json["currency"], "INR");
        assert_eq!(json["lineItems"][0]["unitPrice"], 10.0);
    }
}
