//! Backend collaborator interface.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use invoiceflow_core::{DomainError, InvoiceId};
use invoiceflow_invoicing::{CreateInvoice, Invoice, InvoiceDetail, InvoiceSummary};

use crate::operation::OperationKind;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Api { status: u16, message: Option<String> },

    #[error("parse error: {0}")]
    Parse(String),

    /// The backend refused the request on business grounds.
    #[error("rejected: {0}")]
    Rejected(DomainError),
}

impl BackendError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: Some(message.into()),
        }
    }

    /// Error text provided by the server, if any.
    pub fn server_message(&self) -> Option<String> {
        match self {
            BackendError::Api {
                message: Some(msg), ..
            } if !msg.trim().is_empty() => Some(msg.clone()),
            BackendError::Rejected(err) => Some(err.user_message()),
            _ => None,
        }
    }

    /// Message stored on a failed operation: the server's text when present,
    /// otherwise the operation's fallback.
    pub fn display_message(&self, kind: OperationKind) -> String {
        self.server_message()
            .unwrap_or_else(|| kind.fallback_message().to_string())
    }
}

/// Request/response interface of the invoice backend.
///
/// Amounts passed to `add_payment` have already been through
/// `validate_payment`; payloads passed to `create_invoice` through
/// `InvoiceDraft::validate`.
#[async_trait]
pub trait InvoiceBackend: Send + Sync {
    async fn list_invoices(&self) -> Result<Vec<InvoiceSummary>, BackendError>;

    async fn create_invoice(&self, payload: &CreateInvoice) -> Result<Invoice, BackendError>;

    /// `Ok(None)` when the backend has no such invoice.
    async fn get_invoice(&self, id: &InvoiceId) -> Result<Option<InvoiceDetail>, BackendError>;

    async fn add_payment(&self, id: &InvoiceId, amount: f64) -> Result<(), BackendError>;

    async fn archive_invoice(&self, id: &InvoiceId) -> Result<(), BackendError>;

    async fn restore_invoice(&self, id: &InvoiceId) -> Result<(), BackendError>;

    async fn delete_invoice(&self, id: &InvoiceId) -> Result<(), BackendError>;
}

#[async_trait]
impl<B> InvoiceBackend for Arc<B>
where
    B: InvoiceBackend + ?Sized,
{
    async fn list_invoices(&self) -> Result<Vec<InvoiceSummary>, BackendError> {
        (**self).list_invoices().await
    }

    async fn create_invoice(&self, payload: &CreateInvoice) -> Result<Invoice, BackendError> {
        (**self).create_invoice(payload).await
    }

    async fn get_invoice(&self, id: &InvoiceId) -> Result<Option<InvoiceDetail>, BackendError> {
        (**self).get_invoice(id).await
    }

    async fn add_payment(&self, id: &InvoiceId, amount: f64) -> Result<(), BackendError> {
        (**self).add_payment(id, amount).await
    }

    async fn archive_invoice(&self, id: &InvoiceId) -> Result<(), BackendError> {
        (**self).archive_invoice(id).await
    }

    async fn restore_invoice(&self, id: &InvoiceId) -> Result<(), BackendError> {
        (**self).restore_invoice(id).await
    }

    async fn delete_invoice(&self, id: &InvoiceId) -> Result<(), BackendError> {
        (**self).delete_invoice(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_is_used_verbatim() {
        let err = BackendError::api(400, "Invoice number already exists");
        assert_eq!(
            err.display_message(OperationKind::Create),
            "Invoice number already exists"
        );
    }

    #[test]
    fn missing_or_blank_message_falls_back_per_operation() {
        let blank = BackendError::Api {
            status: 500,
            message: Some("  ".to_string()),
        };
        assert_eq!(blank.display_message(OperationKind::List), "Failed to fetch invoices");

        let network = BackendError::Network("connection refused".to_string());
        assert_eq!(network.display_message(OperationKind::Delete), "Failed to delete invoice");

        let parse = BackendError::Parse("expected value".to_string());
        assert_eq!(parse.display_message(OperationKind::Fetch), "Failed to fetch invoice");
    }

    #[test]
    fn domain_rejections_surface_their_message() {
        let err = BackendError::Rejected(DomainError::invariant("cannot overpay invoice"));
        assert_eq!(err.display_message(OperationKind::Payment), "cannot overpay invoice");
    }
}
