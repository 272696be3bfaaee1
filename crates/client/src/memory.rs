//! In-memory backend for tests and local development.
//!
//! Applies the same rules the server does (unique invoice numbers, no
//! overpayment, archived invoices are read-only) and keeps each tenant's
//! invoices apart. Failures and latency can be injected per operation.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use invoiceflow_core::{DomainError, InvoiceId, TenantId};
use invoiceflow_invoicing::{
    CreateInvoice, Invoice, InvoiceDetail, InvoiceSummary, LineItem, Payment,
};

use crate::backend::{BackendError, InvoiceBackend};
use crate::operation::OperationKind;
use crate::session::Session;

/// A scripted deviation applied to the next call of one operation.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Return this error instead of touching the store.
    Fail(BackendError),
    /// Sleep, then handle the call normally.
    Delay(Duration),
    /// Handle the call at once, then sleep before answering. The caller sees
    /// data as it was when the call arrived.
    SlowResponse(Duration),
}

#[derive(Debug, Clone)]
struct StoredInvoice {
    invoice: Invoice,
    line_items: Vec<LineItem>,
    payments: Vec<Payment>,
}

impl StoredInvoice {
    fn detail(&self) -> InvoiceDetail {
        InvoiceDetail {
            invoice: self.invoice.clone(),
            line_items: self.line_items.clone(),
            payments: self.payments.clone(),
            total: self.invoice.total,
            amount_paid: self.invoice.amount_paid,
            balance_due: self.invoice.balance_due,
        }
    }
}

type Tenants = HashMap<TenantId, Vec<StoredInvoice>>;

#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    session: Session,
    tenants: Arc<RwLock<Tenants>>,
    faults: Arc<Mutex<HashMap<OperationKind, VecDeque<Fault>>>>,
}

impl InMemoryBackend {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            tenants: Arc::new(RwLock::new(HashMap::new())),
            faults: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Another handle on the same data, acting for a different session.
    pub fn for_session(&self, session: Session) -> Self {
        Self {
            session,
            tenants: Arc::clone(&self.tenants),
            faults: Arc::clone(&self.faults),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Queue a fault for the next call of `kind`. Faults are consumed in order.
    pub fn inject(&self, kind: OperationKind, fault: Fault) {
        self.lock_faults().entry(kind).or_default().push_back(fault);
    }

    pub fn fail_next(&self, kind: OperationKind, error: BackendError) {
        self.inject(kind, Fault::Fail(error));
    }

    pub fn delay_next(&self, kind: OperationKind, delay: Duration) {
        self.inject(kind, Fault::Delay(delay));
    }

    /// Number of invoices stored for this session's tenant.
    pub fn invoice_count(&self) -> usize {
        self.read()
            .get(&self.session.tenant_id())
            .map_or(0, Vec::len)
    }

    fn lock_faults(&self) -> MutexGuard<'_, HashMap<OperationKind, VecDeque<Fault>>> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> RwLockReadGuard<'_, Tenants> {
        self.tenants.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tenants> {
        self.tenants.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle one call of `kind`, applying the next queued fault if any.
    async fn serve<T>(
        &self,
        kind: OperationKind,
        handle: impl FnOnce() -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        let fault = self.lock_faults().get_mut(&kind).and_then(VecDeque::pop_front);
        let mut answer_after = None;
        match fault {
            Some(Fault::Fail(err)) => {
                tracing::debug!(operation = %kind, error = %err, "injected failure");
                return Err(err);
            }
            Some(Fault::Delay(delay)) => tokio::time::sleep(delay).await,
            Some(Fault::SlowResponse(delay)) => answer_after = Some(delay),
            None => {}
        }

        let result = handle();
        if let Some(delay) = answer_after {
            tokio::time::sleep(delay).await;
        }
        result
    }

    fn with_invoice<T>(
        &self,
        id: &InvoiceId,
        f: impl FnOnce(&mut StoredInvoice) -> Result<T, DomainError>,
    ) -> Result<T, BackendError> {
        let mut tenants = self.write();
        let stored = tenants
            .get_mut(&self.session.tenant_id())
            .and_then(|invoices| invoices.iter_mut().find(|s| &s.invoice.id == id))
            .ok_or_else(|| BackendError::Rejected(DomainError::not_found()))?;
        f(stored).map_err(BackendError::Rejected)
    }
}

#[async_trait]
impl InvoiceBackend for InMemoryBackend {
    async fn list_invoices(&self) -> Result<Vec<InvoiceSummary>, BackendError> {
        self.serve(OperationKind::List, || {
            let tenants = self.read();
            Ok(tenants
                .get(&self.session.tenant_id())
                .map(|invoices| {
                    invoices
                        .iter()
                        .map(|s| InvoiceSummary::from(&s.invoice))
                        .collect()
                })
                .unwrap_or_default())
        })
        .await
    }

    async fn create_invoice(&self, payload: &CreateInvoice) -> Result<Invoice, BackendError> {
        self.serve(OperationKind::Create, || self.insert(payload)).await
    }

    async fn get_invoice(&self, id: &InvoiceId) -> Result<Option<InvoiceDetail>, BackendError> {
        self.serve(OperationKind::Fetch, || {
            let tenants = self.read();
            Ok(tenants
                .get(&self.session.tenant_id())
                .and_then(|invoices| invoices.iter().find(|s| &s.invoice.id == id))
                .map(StoredInvoice::detail))
        })
        .await
    }

    async fn add_payment(&self, id: &InvoiceId, amount: f64) -> Result<(), BackendError> {
        self.serve(OperationKind::Payment, || {
            self.with_invoice(id, |stored| {
                stored.invoice.register_payment(amount)?;
                stored.payments.push(Payment {
                    amount,
                    paid_at: Utc::now(),
                });
                Ok(())
            })
        })
        .await
    }

    async fn archive_invoice(&self, id: &InvoiceId) -> Result<(), BackendError> {
        self.serve(OperationKind::Archive, || {
            self.with_invoice(id, |stored| stored.invoice.archive())
        })
        .await
    }

    async fn restore_invoice(&self, id: &InvoiceId) -> Result<(), BackendError> {
        self.serve(OperationKind::Restore, || {
            self.with_invoice(id, |stored| stored.invoice.restore())
        })
        .await
    }

    async fn delete_invoice(&self, id: &InvoiceId) -> Result<(), BackendError> {
        self.serve(OperationKind::Delete, || self.remove(id)).await
    }
}

impl InMemoryBackend {
    fn insert(&self, payload: &CreateInvoice) -> Result<Invoice, BackendError> {
        payload.ensure_valid().map_err(BackendError::Rejected)?;

        let mut tenants = self.write();
        let invoices = tenants.entry(self.session.tenant_id()).or_default();
        if invoices
            .iter()
            .any(|s| s.invoice.invoice_number == payload.invoice_number)
        {
            return Err(BackendError::Rejected(DomainError::conflict(
                "Invoice number already exists",
            )));
        }

        let invoice = Invoice::from_create(InvoiceId::generate(), payload);
        tracing::debug!(
            tenant_id = %self.session.tenant_id(),
            invoice_id = %invoice.id,
            total = invoice.total,
            "invoice created"
        );
        invoices.push(StoredInvoice {
            invoice: invoice.clone(),
            line_items: payload.line_items.clone(),
            payments: Vec::new(),
        });
        Ok(invoice)
    }

    fn remove(&self, id: &InvoiceId) -> Result<(), BackendError> {
        let mut tenants = self.write();
        let invoices = tenants
            .get_mut(&self.session.tenant_id())
            .ok_or_else(|| BackendError::Rejected(DomainError::not_found()))?;
        let before = invoices.len();
        invoices.retain(|s| &s.invoice.id != id);
        if invoices.len() == before {
            return Err(BackendError::Rejected(DomainError::not_found()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use invoiceflow_invoicing::Currency;

    fn payload(number: &str) -> CreateInvoice {
        CreateInvoice {
            invoice_number: number.to_string(),
            customer_name: "Acme".to_string(),
            issue_date: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
            due_date: Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0).unwrap(),
            currency: Currency::Usd,
            tax_percent: 10.0,
            line_items: vec![LineItem::new("Design", 2.0, 10.0), LineItem::new("Hosting", 1.0, 5.0)],
        }
    }

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new(Session::with_token(TenantId::new(), "token"))
    }

    #[tokio::test]
    async fn create_then_fetch_detail() {
        let backend = backend();
        let created = backend.create_invoice(&payload("INV-1")).await.unwrap();
        assert_eq!(created.total, 27.5);

        let detail = backend.get_invoice(&created.id).await.unwrap().unwrap();
        assert_eq!(detail.line_items.len(), 2);
        assert_eq!(detail.balance_due, 27.5);
        assert_eq!(backend.list_invoices().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_invoice_number_is_a_conflict() {
        let backend = backend();
        backend.create_invoice(&payload("INV-1")).await.unwrap();
        let err = backend.create_invoice(&payload("INV-1")).await.unwrap_err();
        assert_eq!(
            err.server_message().as_deref(),
            Some("Invoice number already exists")
        );
        assert_eq!(backend.invoice_count(), 1);
    }

    #[tokio::test]
    async fn invalid_payload_is_rejected() {
        let backend = backend();
        let mut bad = payload("INV-1");
        bad.line_items.clear();
        let err = backend.create_invoice(&bad).await.unwrap_err();
        assert!(matches!(err, BackendError::Rejected(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn payments_are_recorded_and_capped() {
        let backend = backend();
        let id = backend.create_invoice(&payload("INV-1")).await.unwrap().id;

        backend.add_payment(&id, 7.5).await.unwrap();
        let err = backend.add_payment(&id, 20.01).await.unwrap_err();
        assert!(matches!(err, BackendError::Rejected(DomainError::InvariantViolation(_))));

        let detail = backend.get_invoice(&id).await.unwrap().unwrap();
        assert_eq!(detail.payments.len(), 1);
        assert_eq!(detail.amount_paid, 7.5);
        assert_eq!(detail.balance_due, 20.0);
    }

    #[tokio::test]
    async fn sub_cent_overpayment_is_refused() {
        let backend = backend();
        let id = backend.create_invoice(&payload("INV-1")).await.unwrap().id;

        let err = backend.add_payment(&id, 27.504).await.unwrap_err();
        assert!(matches!(err, BackendError::Rejected(DomainError::InvariantViolation(_))));

        let detail = backend.get_invoice(&id).await.unwrap().unwrap();
        assert!(detail.payments.is_empty());
        assert_eq!(detail.amount_paid, 0.0);

        backend.add_payment(&id, 27.5).await.unwrap();
        let detail = backend.get_invoice(&id).await.unwrap().unwrap();
        assert!(detail.amount_paid <= detail.total);
        assert_eq!(detail.balance_due, 0.0);
    }

    #[tokio::test]
    async fn archived_invoice_refuses_payment_until_restored() {
        let backend = backend();
        let id = backend.create_invoice(&payload("INV-1")).await.unwrap().id;

        backend.archive_invoice(&id).await.unwrap();
        assert!(backend.add_payment(&id, 1.0).await.is_err());
        assert!(backend.archive_invoice(&id).await.is_err());

        backend.restore_invoice(&id).await.unwrap();
        backend.add_payment(&id, 1.0).await.unwrap();
    }

    #[tokio::test]
    async fn tenants_do_not_see_each_other() {
        let backend = backend();
        let id = backend.create_invoice(&payload("INV-1")).await.unwrap().id;

        let other = backend.for_session(Session::with_token(TenantId::new(), "other"));
        assert!(other.list_invoices().await.unwrap().is_empty());
        assert_eq!(other.get_invoice(&id).await.unwrap(), None);
        assert!(other.delete_invoice(&id).await.is_err());

        // Same invoice number is fine in another tenant.
        other.create_invoice(&payload("INV-1")).await.unwrap();
        assert_eq!(backend.invoice_count(), 1);
    }

    #[tokio::test]
    async fn delete_removes_and_missing_is_not_found() {
        let backend = backend();
        let id = backend.create_invoice(&payload("INV-1")).await.unwrap().id;

        backend.delete_invoice(&id).await.unwrap();
        let err = backend.delete_invoice(&id).await.unwrap_err();
        assert_eq!(err.server_message().as_deref(), Some("Invoice not found"));
    }

    #[tokio::test]
    async fn injected_failure_is_consumed_once() {
        let backend = backend();
        backend.fail_next(OperationKind::List, BackendError::Network("down".to_string()));

        assert!(backend.list_invoices().await.is_err());
        assert!(backend.list_invoices().await.is_ok());
    }

    #[tokio::test]
    async fn slow_response_answers_with_data_from_arrival() {
        let backend = backend();
        let id = backend.create_invoice(&payload("INV-1")).await.unwrap().id;
        backend.inject(OperationKind::Fetch, Fault::SlowResponse(Duration::from_millis(50)));

        let (detail, paid) = tokio::join!(backend.get_invoice(&id), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            backend.add_payment(&id, 7.5).await
        });

        paid.unwrap();
        assert_eq!(detail.unwrap().unwrap().balance_due, 27.5);
        assert_eq!(backend.get_invoice(&id).await.unwrap().unwrap().balance_due, 20.0);
    }
}
