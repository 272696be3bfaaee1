//! Invoicing domain module.
//!
//! This crate contains the business rules for invoices, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage): the money model,
//! status classification, payment checks, creation-form validation and the
//! list query pipeline.

pub mod draft;
pub mod invoice;
pub mod money;
pub mod payment;
pub mod query;
pub mod status;

pub use draft::{CreateInvoice, InvoiceDraft};
pub use invoice::{Invoice, InvoiceDetail, InvoiceSummary, format_display_date};
pub use money::{
    Currency, LineItem, Totals, compute_totals, currency_symbol, format_amount, format_money,
    paid_percent,
};
pub use payment::{Payment, PaymentRejection, validate_payment};
pub use query::{
    DEFAULT_PAGE_SIZE, InvoicePage, QueryView, SortKey, StatusFilter, filter_and_sort,
    query_invoices,
};
pub use status::{Classify, InvoiceStatus, classify};
