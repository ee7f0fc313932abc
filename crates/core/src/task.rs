//! Cancellable simulated operations.
//!
//! Every asynchronous call into a service receives an [`OperationToken`]. The workflow
//! controller keeps the token of the single operation it is waiting on; navigating away cancels
//! it, and a completion carrying a cancelled or superseded token is discarded.

use crate::{WorkflowError, WorkflowResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use trialos_ids::PatientId;

/// The kinds of simulated work the workflow can wait on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    EhrConnect,
    EhrSearch,
    DocumentExtraction,
    TextAnalysis,
    ConsentDelivery,
    SignatureSave,
    Matching,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::EhrConnect => "EHR connect",
            OperationKind::EhrSearch => "EHR search",
            OperationKind::DocumentExtraction => "document extraction",
            OperationKind::TextAnalysis => "text analysis",
            OperationKind::ConsentDelivery => "consent delivery",
            OperationKind::SignatureSave => "signature save",
            OperationKind::Matching => "trial matching",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cancellation handle shared between the controller and one in-flight service call.
#[derive(Clone, Debug, Default)]
pub struct OperationToken {
    inner: Arc<TokenInner>,
}

impl OperationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the operation. Idempotent.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Returns `Err(Cancelled)` if the token has been cancelled.
    pub fn check(&self) -> WorkflowResult<()> {
        if self.is_cancelled() {
            Err(WorkflowError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// True if both handles refer to the same operation.
    pub fn same_operation(&self, other: &OperationToken) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Handle returned by the controller when an operation starts.
///
/// It must be handed back to the matching `complete_*` method; the controller ignores it if the
/// operation has since been cancelled or replaced.
#[derive(Clone, Debug)]
pub struct PendingOperation {
    kind: OperationKind,
    patient: Option<PatientId>,
    token: OperationToken,
}

impl PendingOperation {
    pub(crate) fn new(kind: OperationKind, patient: Option<PatientId>) -> Self {
        Self {
            kind,
            patient,
            token: OperationToken::new(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn patient(&self) -> Option<PatientId> {
        self.patient
    }

    pub fn token(&self) -> &OperationToken {
        &self.token
    }
}

/// Waits for `delay`, or fails with [`WorkflowError::Cancelled`] as soon as `token` is cancelled.
pub async fn simulate_delay(delay: Duration, token: &OperationToken) -> WorkflowResult<()> {
    token.check()?;
    if delay.is_zero() {
        return Ok(());
    }

    tokio::select! {
        _ = tokio::time::sleep(delay) => token.check(),
        _ = token.cancelled() => Err(WorkflowError::Cancelled),
    }
}
