//! Request lifecycle tracking.
//!
//! Every backend call the client makes goes through one [`OperationState`]:
//! `Idle → Pending` on dispatch, then `Succeeded` or `Failed` on completion,
//! and back to `Pending` on the next dispatch. There is no terminal state.

use serde::{Deserialize, Serialize};

/// The tracked backend operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    List,
    Create,
    Fetch,
    Payment,
    Archive,
    Restore,
    Delete,
}

impl OperationKind {
    pub const ALL: [OperationKind; 7] = [
        OperationKind::List,
        OperationKind::Create,
        OperationKind::Fetch,
        OperationKind::Payment,
        OperationKind::Archive,
        OperationKind::Restore,
        OperationKind::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::List => "list",
            OperationKind::Create => "create",
            OperationKind::Fetch => "fetch",
            OperationKind::Payment => "payment",
            OperationKind::Archive => "archive",
            OperationKind::Restore => "restore",
            OperationKind::Delete => "delete",
        }
    }

    /// Message shown when the backend gives no usable error text.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            OperationKind::List => "Failed to fetch invoices",
            OperationKind::Create => "Failed to create invoice",
            OperationKind::Fetch => "Failed to fetch invoice",
            OperationKind::Payment => "Failed to add payment",
            OperationKind::Archive => "Failed to archive invoice",
            OperationKind::Restore => "Failed to restore invoice",
            OperationKind::Delete => "Failed to delete invoice",
        }
    }

    fn index(&self) -> usize {
        match self {
            OperationKind::List => 0,
            OperationKind::Create => 1,
            OperationKind::Fetch => 2,
            OperationKind::Payment => 3,
            OperationKind::Archive => 4,
            OperationKind::Restore => 5,
            OperationKind::Delete => 6,
        }
    }
}

impl core::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// Lifecycle of one operation kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperationState {
    phase: Phase,
    error: Option<String>,
    dispatched: u64,
    completed: u64,
}

impl OperationState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Last failure message, cleared on the next dispatch.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Pending
    }

    /// Dispatches that have not completed yet.
    pub fn in_flight(&self) -> u64 {
        self.dispatched - self.completed
    }

    pub(crate) fn begin(&mut self) {
        self.phase = Phase::Pending;
        self.error = None;
        self.dispatched += 1;
    }

    pub(crate) fn succeed(&mut self) {
        self.phase = Phase::Succeeded;
        self.error = None;
        self.complete();
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.phase = Phase::Failed;
        self.error = Some(message.into());
        self.complete();
    }

    fn complete(&mut self) {
        self.completed = (self.completed + 1).min(self.dispatched);
    }
}

/// One [`OperationState`] per [`OperationKind`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Operations {
    states: [OperationState; 7],
}

impl Operations {
    pub fn get(&self, kind: OperationKind) -> &OperationState {
        &self.states[kind.index()]
    }

    pub(crate) fn get_mut(&mut self, kind: OperationKind) -> &mut OperationState {
        &mut self.states[kind.index()]
    }

    pub fn any_loading(&self) -> bool {
        self.states.iter().any(OperationState::is_loading)
    }

    pub fn iter(&self) -> impl Iterator<Item = (OperationKind, &OperationState)> {
        OperationKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }
}
