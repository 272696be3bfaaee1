//! Client-side invoice store.
//!
//! Holds the last fetched list, the single-invoice detail and the invoice
//! returned by the last create. The API remains the authority: the store is a
//! cache that is only written when a tracked operation succeeds.

use std::collections::HashMap;

use invoiceflow_core::InvoiceId;
use invoiceflow_invoicing::{Invoice, InvoiceDetail, InvoiceSummary};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InvoiceStore {
    invoices: Vec<InvoiceSummary>,
    detail: Option<InvoiceDetail>,
    detail_stale: bool,
    created_invoice: Option<Invoice>,
    /// Bumped on every mutation of an invoice, shown or not.
    detail_revisions: HashMap<InvoiceId, u64>,
    /// Bumped on every delete.
    list_revision: u64,
}

impl InvoiceStore {
    pub fn invoices(&self) -> &[InvoiceSummary] {
        &self.invoices
    }

    pub fn detail(&self) -> Option<&InvoiceDetail> {
        self.detail.as_ref()
    }

    /// The cached detail, if it is the requested invoice.
    pub fn detail_for(&self, id: &InvoiceId) -> Option<&InvoiceDetail> {
        self.detail.as_ref().filter(|detail| detail.id() == id)
    }

    /// True between a successful mutation and the re-fetch that follows it.
    pub fn is_detail_stale(&self) -> bool {
        self.detail_stale
    }

    pub fn created_invoice(&self) -> Option<&Invoice> {
        self.created_invoice.as_ref()
    }

    pub(crate) fn replace_invoices(&mut self, invoices: Vec<InvoiceSummary>) {
        self.invoices = invoices;
    }

    pub(crate) fn set_created(&mut self, invoice: Invoice) {
        self.created_invoice = Some(invoice);
    }

    /// Store a fetched detail; `None` means the backend has no such invoice.
    pub(crate) fn set_detail(&mut self, detail: Option<InvoiceDetail>) {
        self.detail = detail;
        self.detail_stale = false;
    }

    /// How many mutations of `id` this store has seen.
    pub(crate) fn detail_revision(&self, id: &InvoiceId) -> u64 {
        self.detail_revisions.get(id).copied().unwrap_or(0)
    }

    /// How many deletes this store has seen.
    pub(crate) fn list_revision(&self) -> u64 {
        self.list_revision
    }

    pub(crate) fn invalidate_detail(&mut self, id: &InvoiceId) {
        *self.detail_revisions.entry(id.clone()).or_default() += 1;
        if self.detail_for(id).is_some() {
            self.detail_stale = true;
        }
    }

    /// Drop a deleted invoice from the list and, if shown, from the detail.
    pub(crate) fn remove(&mut self, id: &InvoiceId) {
        self.list_revision += 1;
        *self.detail_revisions.entry(id.clone()).or_default() += 1;
        self.invoices.retain(|inv| &inv.id != id);
        if self.detail_for(id).is_some() {
            self.detail = None;
            self.detail_stale = false;
        }
        if self.created_invoice.as_ref().is_some_and(|inv| &inv.id == id) {
            self.created_invoice = None;
        }
    }
}
