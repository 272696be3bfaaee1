//! Invoice client: dispatches backend calls and tracks their lifecycle.
//!
//! Every call goes through [`InvoiceClient::track`]: the operation moves to
//! `Pending`, the backend is awaited, and on completion the result is applied
//! to the [`InvoiceStore`] and the operation moves to `Succeeded`, or the
//! error message is recorded and it moves to `Failed` with the store left as
//! it was. Payment, archive and restore re-fetch the invoice they changed;
//! delete re-fetches the list. Those follow-up fetches are never refused by
//! [`DispatchPolicy::SingleFlight`], and a read that was answered before a
//! mutation landed is not written over the store.

use core::future::Future;
use core::num::NonZeroUsize;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use thiserror::Error;

use invoiceflow_core::{DomainError, InvoiceId};
use invoiceflow_invoicing::{
    DEFAULT_PAGE_SIZE, Invoice, InvoiceDetail, InvoiceDraft, InvoicePage, InvoiceSummary,
    PaymentRejection, QueryView, query_invoices, validate_payment,
};

use crate::backend::{BackendError, InvoiceBackend};
use crate::config::{ClientConfig, DispatchPolicy};
use crate::operation::{OperationKind, OperationState, Operations};
use crate::store::InvoiceStore;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The creation form is incomplete or invalid; nothing was sent.
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// The payment amount was refused before dispatch.
    #[error(transparent)]
    PaymentRejected(#[from] PaymentRejection),

    /// The invoice's balance is unknown: neither its detail nor its list row
    /// has been fetched.
    #[error("invoice {0} is not loaded")]
    DetailNotLoaded(InvoiceId),

    #[error("invoice {0} is archived")]
    InvoiceArchived(InvoiceId),

    /// Refused under [`DispatchPolicy::SingleFlight`].
    #[error("{kind} request already in flight")]
    InFlight { kind: OperationKind },

    /// The backend call failed; `message` is what the operation state shows.
    #[error("{message}")]
    Backend {
        kind: OperationKind,
        message: String,
        #[source]
        source: BackendError,
    },
}

/// Store contents plus the state of every tracked operation.
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    store: InvoiceStore,
    operations: Operations,
}

impl ClientState {
    pub fn store(&self) -> &InvoiceStore {
        &self.store
    }

    pub fn operations(&self) -> &Operations {
        &self.operations
    }
}

/// Owned copy of one page of the list, for consumers that outlive the lock.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    pub items: Vec<InvoiceSummary>,
    pub page: usize,
    pub page_count: usize,
    pub total_matches: usize,
}

impl From<InvoicePage<'_>> for ListPage {
    fn from(page: InvoicePage<'_>) -> Self {
        Self {
            items: page.items.into_iter().cloned().collect(),
            page: page.page,
            page_count: page.page_count,
            total_matches: page.total_matches,
        }
    }
}

impl ListPage {
    pub fn page_numbers(&self) -> impl Iterator<Item = usize> {
        1..=self.page_count
    }
}

/// Who asked for a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    /// A caller of the public API; subject to the dispatch policy.
    Requested,
    /// The follow-up fetch of a mutation that already succeeded.
    Refetch,
}

/// Completes a dispatched operation as failed if its future is dropped
/// before the backend answers.
struct PendingDispatch<'a> {
    state: &'a RwLock<ClientState>,
    kind: OperationKind,
    armed: bool,
}

impl<'a> PendingDispatch<'a> {
    fn new(state: &'a RwLock<ClientState>, kind: OperationKind) -> Self {
        Self {
            state,
            kind,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingDispatch<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let message = format!("{} (cancelled)", self.kind.fallback_message());
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.operations.get_mut(self.kind).fail(message);
        tracing::warn!(operation = %self.kind, "dropped before completion");
    }
}

pub struct InvoiceClient<B> {
    backend: B,
    page_size: NonZeroUsize,
    policy: DispatchPolicy,
    state: RwLock<ClientState>,
}

impl<B: InvoiceBackend> InvoiceClient<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            page_size: DEFAULT_PAGE_SIZE,
            policy: DispatchPolicy::default(),
            state: RwLock::new(ClientState::default()),
        }
    }

    pub fn with_config(backend: B, config: &ClientConfig) -> Self {
        Self::new(backend)
            .with_page_size(config.page_size)
            .with_dispatch_policy(config.dispatch_policy)
    }

    pub fn with_page_size(mut self, page_size: NonZeroUsize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_dispatch_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    pub fn dispatch_policy(&self) -> DispatchPolicy {
        self.policy
    }

    pub fn snapshot(&self) -> ClientState {
        self.read().clone()
    }

    pub fn operation(&self, kind: OperationKind) -> OperationState {
        self.read().operations.get(kind).clone()
    }

    pub fn with_store<R>(&self, f: impl FnOnce(&InvoiceStore) -> R) -> R {
        f(&self.read().store)
    }

    /// Run the list query pipeline over the cached list.
    pub fn visible_page(&self, view: &QueryView, now: DateTime<Utc>) -> ListPage {
        let state = self.read();
        query_invoices(state.store.invoices(), view, now, self.page_size).into()
    }

    pub async fn fetch_invoice_list(&self) -> Result<(), ClientError> {
        self.load_invoice_list(Dispatch::Requested).await
    }

    async fn load_invoice_list(&self, dispatch: Dispatch) -> Result<(), ClientError> {
        let revision = self.read().store.list_revision();
        self.track(
            OperationKind::List,
            dispatch,
            self.backend.list_invoices(),
            |store, invoices| {
                if store.list_revision() != revision {
                    tracing::debug!("list answered before a delete landed; not applied");
                    return;
                }
                store.replace_invoices(invoices);
            },
        )
        .await
    }

    /// Validate the draft and create the invoice.
    ///
    /// A draft that fails validation is reported without dispatching.
    pub async fn create_invoice(&self, draft: &InvoiceDraft) -> Result<Invoice, ClientError> {
        let payload = draft.validate()?;
        self.track(
            OperationKind::Create,
            Dispatch::Requested,
            self.backend.create_invoice(&payload),
            |store, invoice: Invoice| {
                store.set_created(invoice.clone());
                invoice
            },
        )
        .await
    }

    /// Fetch one invoice into the detail slot. `Ok(None)` when it does not
    /// exist, which is not a failure.
    ///
    /// The backend's answer is always returned, but it is only stored when no
    /// mutation of this invoice succeeded while the fetch was pending.
    pub async fn fetch_invoice(&self, id: &InvoiceId) -> Result<Option<InvoiceDetail>, ClientError> {
        self.load_invoice(id, Dispatch::Requested).await
    }

    async fn load_invoice(
        &self,
        id: &InvoiceId,
        dispatch: Dispatch,
    ) -> Result<Option<InvoiceDetail>, ClientError> {
        let revision = self.read().store.detail_revision(id);
        self.track(
            OperationKind::Fetch,
            dispatch,
            self.backend.get_invoice(id),
            |store, detail: Option<InvoiceDetail>| {
                if detail.is_none() {
                    tracing::info!(invoice_id = %id, "invoice not found");
                }
                if store.detail_revision(id) != revision {
                    tracing::debug!(
                        invoice_id = %id,
                        "detail answered before a mutation landed; not applied"
                    );
                } else {
                    store.set_detail(detail.clone());
                }
                detail
            },
        )
        .await
    }

    /// Check the amount against the cached balance, record the payment, then
    /// re-fetch the invoice.
    pub async fn add_payment(&self, id: &InvoiceId, amount: f64) -> Result<(), ClientError> {
        let (archived, balance_due) = self.cached_standing(id)?;
        if archived {
            return Err(ClientError::InvoiceArchived(id.clone()));
        }
        validate_payment(amount, balance_due)?;

        self.track(
            OperationKind::Payment,
            Dispatch::Requested,
            self.backend.add_payment(id, amount),
            |store, ()| store.invalidate_detail(id),
        )
        .await?;
        self.refetch_invoice(id).await;
        Ok(())
    }

    pub async fn archive_invoice(&self, id: &InvoiceId) -> Result<(), ClientError> {
        self.track(
            OperationKind::Archive,
            Dispatch::Requested,
            self.backend.archive_invoice(id),
            |store, ()| store.invalidate_detail(id),
        )
        .await?;
        self.refetch_invoice(id).await;
        Ok(())
    }

    pub async fn restore_invoice(&self, id: &InvoiceId) -> Result<(), ClientError> {
        self.track(
            OperationKind::Restore,
            Dispatch::Requested,
            self.backend.restore_invoice(id),
            |store, ()| store.invalidate_detail(id),
        )
        .await?;
        self.refetch_invoice(id).await;
        Ok(())
    }

    /// Restore when the cached invoice is archived, archive otherwise.
    pub async fn toggle_archive(&self, id: &InvoiceId) -> Result<(), ClientError> {
        let (archived, _) = self.cached_standing(id)?;
        if archived {
            self.restore_invoice(id).await
        } else {
            self.archive_invoice(id).await
        }
    }

    /// Delete, drop the invoice from the cache, then re-fetch the list.
    pub async fn delete_invoice(&self, id: &InvoiceId) -> Result<(), ClientError> {
        self.track(
            OperationKind::Delete,
            Dispatch::Requested,
            self.backend.delete_invoice(id),
            |store, ()| store.remove(id),
        )
        .await?;
        if let Err(err) = self.load_invoice_list(Dispatch::Refetch).await {
            tracing::warn!(invoice_id = %id, error = %err, "list re-fetch after delete failed");
        }
        Ok(())
    }

    async fn refetch_invoice(&self, id: &InvoiceId) {
        if let Err(err) = self.load_invoice(id, Dispatch::Refetch).await {
            tracing::warn!(invoice_id = %id, error = %err, "invoice re-fetch after mutation failed");
        }
    }

    /// Archived flag and balance from the detail, falling back to the list row.
    fn cached_standing(&self, id: &InvoiceId) -> Result<(bool, f64), ClientError> {
        let state = self.read();
        if let Some(detail) = state.store.detail_for(id) {
            return Ok((detail.invoice.archived, detail.balance_due));
        }
        state
            .store
            .invoices()
            .iter()
            .find(|row| &row.id == id)
            .map(|row| (row.archived, row.balance_due))
            .ok_or_else(|| ClientError::DetailNotLoaded(id.clone()))
    }

    /// Drive one backend call through the operation lifecycle.
    ///
    /// `apply` runs only on success, under the state lock, before the
    /// operation is marked `Succeeded`. Dropping the returned future before it
    /// completes marks the operation `Failed`.
    async fn track<T, R>(
        &self,
        kind: OperationKind,
        dispatch: Dispatch,
        call: impl Future<Output = Result<T, BackendError>>,
        apply: impl FnOnce(&mut InvoiceStore, T) -> R,
    ) -> Result<R, ClientError> {
        self.begin(kind, dispatch)?;
        let mut pending = PendingDispatch::new(&self.state, kind);
        tracing::debug!(operation = %kind, ?dispatch, "dispatched");

        let outcome = call.await;
        pending.disarm();

        let mut state = self.write();
        match outcome {
            Ok(value) => {
                let output = apply(&mut state.store, value);
                state.operations.get_mut(kind).succeed();
                tracing::info!(operation = %kind, "succeeded");
                Ok(output)
            }
            Err(source) => {
                let message = source.display_message(kind);
                state.operations.get_mut(kind).fail(message.clone());
                tracing::warn!(operation = %kind, error = %source, "failed: {message}");
                Err(ClientError::Backend {
                    kind,
                    message,
                    source,
                })
            }
        }
    }

    fn begin(&self, kind: OperationKind, dispatch: Dispatch) -> Result<(), ClientError> {
        let mut state = self.write();
        let op = state.operations.get_mut(kind);
        if self.policy == DispatchPolicy::SingleFlight
            && dispatch == Dispatch::Requested
            && op.in_flight() > 0
        {
            tracing::debug!(operation = %kind, "refused: already in flight");
            return Err(ClientError::InFlight { kind });
        }
        op.begin();
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, ClientState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ClientState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;
    use crate::operation::Phase;
    use crate::session::Session;
    use chrono::TimeZone;
    use invoiceflow_core::TenantId;
    use std::time::Duration;
    use invoiceflow_invoicing::{Currency, LineItem};

    fn draft(number: &str) -> InvoiceDraft {
        InvoiceDraft {
            invoice_number: number.to_string(),
            customer_name: "Acme".to_string(),
            issue_date: Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()),
            due_date: Some(Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0).unwrap()),
            currency: Currency::Usd,
            tax_percent: 10.0,
            line_items: vec![LineItem::new("Design", 2.0, 10.0), LineItem::new("Hosting", 1.0, 5.0)],
        }
    }

    fn client() -> InvoiceClient<InMemoryBackend> {
        InvoiceClient::new(InMemoryBackend::new(Session::with_token(TenantId::new(), "t")))
    }

    #[tokio::test]
    async fn create_stores_created_invoice() {
        let client = client();
        let invoice = client.create_invoice(&draft("INV-1")).await.unwrap();

        assert_eq!(client.operation(OperationKind::Create).phase(), Phase::Succeeded);
        let created = client.with_store(|s| s.created_invoice().cloned()).unwrap();
        assert_eq!(created.id, invoice.id);
    }

    #[tokio::test]
    async fn payment_needs_a_known_balance() {
        let client = client();
        let err = client.add_payment(&InvoiceId::from("nope"), 1.0).await.unwrap_err();
        assert!(matches!(err, ClientError::DetailNotLoaded(_)));
        assert_eq!(client.operation(OperationKind::Payment).phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn list_row_is_enough_to_validate_payment() {
        let client = client();
        let id = client.create_invoice(&draft("INV-1")).await.unwrap().id;
        client.fetch_invoice_list().await.unwrap();

        client.add_payment(&id, 5.0).await.unwrap();
        let detail = client.with_store(|s| s.detail().cloned()).unwrap();
        assert_eq!(detail.balance_due, 22.5);
    }

    #[tokio::test]
    async fn toggle_archive_flips_between_archive_and_restore() {
        let client = client();
        let id = client.create_invoice(&draft("INV-1")).await.unwrap().id;
        client.fetch_invoice(&id).await.unwrap();

        client.toggle_archive(&id).await.unwrap();
        assert_eq!(client.operation(OperationKind::Archive).phase(), Phase::Succeeded);
        assert!(client.with_store(|s| s.detail_for(&id).unwrap().invoice.archived));

        client.toggle_archive(&id).await.unwrap();
        assert_eq!(client.operation(OperationKind::Restore).phase(), Phase::Succeeded);
        assert!(!client.with_store(|s| s.detail_for(&id).unwrap().invoice.archived));
    }

    #[tokio::test]
    async fn visible_page_uses_configured_page_size() {
        let client = client().with_page_size(NonZeroUsize::new(2).unwrap());
        for n in 0..5 {
            client.create_invoice(&draft(&format!("INV-{n}"))).await.unwrap();
        }
        client.fetch_invoice_list().await.unwrap();

        let now = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
        let page = client.visible_page(&QueryView::new(), now);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.page_count, 3);
        assert_eq!(page.total_matches, 5);
        assert_eq!(page.page_numbers().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn dropped_dispatch_is_completed_as_failed() {
        let client = client().with_dispatch_policy(DispatchPolicy::SingleFlight);
        client
            .backend()
            .delay_next(OperationKind::List, Duration::from_millis(200));

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), client.fetch_invoice_list()).await;
        assert!(timed_out.is_err());

        let list = client.operation(OperationKind::List);
        assert_eq!(list.phase(), Phase::Failed);
        assert_eq!(list.in_flight(), 0);
        assert_eq!(list.error(), Some("Failed to fetch invoices (cancelled)"));

        client.fetch_invoice_list().await.unwrap();
        assert_eq!(client.operation(OperationKind::List).phase(), Phase::Succeeded);
    }
}
