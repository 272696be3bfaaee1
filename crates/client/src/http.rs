//! HTTP backend over the invoice REST API.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use invoiceflow_core::InvoiceId;
use invoiceflow_invoicing::{CreateInvoice, Invoice, InvoiceDetail, InvoiceSummary};

use crate::backend::{BackendError, InvoiceBackend};
use crate::session::Session;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// `POST /invoices` answers `{ "invoice": {...} }`; some deployments return
/// the bare invoice.
#[derive(Deserialize)]
#[serde(untagged)]
enum CreatedBody {
    Wrapped { invoice: Invoice },
    Bare(Invoice),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody {
    Bare(Vec<InvoiceSummary>),
    Wrapped { invoices: Vec<InvoiceSummary> },
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    api_url: String,
    session: Session,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(api_url: impl Into<String>, session: Session) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            session,
            client: reqwest::Client::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn set_session(&mut self, session: Session) {
        self.session = session;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) if !token.is_empty() => req.bearer_auth(token),
            _ => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, BackendError> {
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        if resp.status().is_success() {
            return Ok(resp);
        }
        Err(error_from_response(resp).await)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, BackendError> {
        let resp = self.send(req).await?;
        resp.json::<T>()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }
}

async fn error_from_response(resp: Response) -> BackendError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty());
    BackendError::Api { status, message }
}

#[async_trait]
impl InvoiceBackend for HttpBackend {
    async fn list_invoices(&self) -> Result<Vec<InvoiceSummary>, BackendError> {
        let body: ListBody = self.send_json(self.client.get(self.url("/invoices"))).await?;
        Ok(match body {
            ListBody::Bare(invoices) | ListBody::Wrapped { invoices } => invoices,
        })
    }

    async fn create_invoice(&self, payload: &CreateInvoice) -> Result<Invoice, BackendError> {
        let req = self.client.post(self.url("/invoices")).json(payload);
        let body: CreatedBody = self.send_json(req).await?;
        Ok(match body {
            CreatedBody::Wrapped { invoice } | CreatedBody::Bare(invoice) => invoice,
        })
    }

    async fn get_invoice(&self, id: &InvoiceId) -> Result<Option<InvoiceDetail>, BackendError> {
        let req = self.client.get(self.url(&format!("/invoices/{id}")));
        match self.send_json::<InvoiceDetail>(req).await {
            Ok(detail) => Ok(Some(detail)),
            Err(BackendError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn add_payment(&self, id: &InvoiceId, amount: f64) -> Result<(), BackendError> {
        let req = self
            .client
            .post(self.url(&format!("/invoices/{id}/payments")))
            .json(&json!({ "amount": amount }));
        self.send(req).await.map(|_| ())
    }

    async fn archive_invoice(&self, id: &InvoiceId) -> Result<(), BackendError> {
        let req = self
            .client
            .post(self.url("/invoices/archive"))
            .json(&json!({ "id": id }));
        self.send(req).await.map(|_| ())
    }

    async fn restore_invoice(&self, id: &InvoiceId) -> Result<(), BackendError> {
        let req = self
            .client
            .post(self.url("/invoices/restore"))
            .json(&json!({ "id": id }));
        self.send(req).await.map(|_| ())
    }

    async fn delete_invoice(&self, id: &InvoiceId) -> Result<(), BackendError> {
        let req = self.client.delete(self.url(&format!("/invoices/{id}")));
        self.send(req).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invoiceflow_core::TenantId;

    #[test]
    fn trailing_slash_is_dropped_from_base_url() {
        let backend = HttpBackend::new("http://localhost:8080/api/", Session::anonymous(TenantId::new()));
        assert_eq!(backend.url("/invoices"), "http://localhost:8080/api/invoices");
    }

    #[test]
    fn create_response_accepts_wrapped_and_bare_invoice() {
        let invoice = r#"{
            "_id": "abc",
            "invoiceNumber": "INV-1",
            "customerName": "Acme",
            "issueDate": "2025-03-01T00:00:00Z",
            "dueDate": "2025-03-31T00:00:00Z",
            "total": 27.5,
            "balanceDue": 27.5
        }"#;

        let wrapped: CreatedBody =
            serde_json::from_str(&format!(r#"{{"invoice": {invoice}}}"#)).unwrap();
        let bare: CreatedBody = serde_json::from_str(invoice).unwrap();

        for body in [wrapped, bare] {
            let (CreatedBody::Wrapped { invoice } | CreatedBody::Bare(invoice)) = body;
            assert_eq!(invoice.id.as_str(), "abc");
            assert_eq!(invoice.balance_due, 27.5);
        }
    }

    #[test]
    fn error_body_message_is_optional() {
        let body: ErrorBody = serde_json::from_str(r#"{"message":"Invoice not found"}"#).unwrap();
        assert_eq!(body.message.as_deref(), Some("Invoice not found"));
        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.message, None);
    }
}
