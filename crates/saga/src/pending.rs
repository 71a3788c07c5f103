//! Registry of payment cancellations that are still owed.

use std::collections::HashSet;
use std::sync::Arc;

use common::PaymentUid;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Registry {
    owed: HashSet<PaymentUid>,
    retrying: HashSet<PaymentUid>,
}

/// Payments whose cancellation failed and has not been delivered since, and
/// which of them currently have a background retry running.
///
/// Entries are keyed by payment, so one rental's owed cancellation is never
/// visible to requests about other rentals. Clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct PendingCancellations {
    inner: Arc<Mutex<Registry>>,
}

impl PendingCancellations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a cancellation as owed. Returns false if it already was.
    pub async fn insert(&self, payment_uid: PaymentUid) -> bool {
        self.inner.lock().await.owed.insert(payment_uid)
    }

    pub async fn contains(&self, payment_uid: PaymentUid) -> bool {
        self.inner.lock().await.owed.contains(&payment_uid)
    }

    /// Clears the marker. Returns false if none was set.
    pub async fn remove(&self, payment_uid: PaymentUid) -> bool {
        self.inner.lock().await.owed.remove(&payment_uid)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.owed.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.owed.is_empty()
    }

    /// Claims the right to run the background retry for a payment. Returns
    /// false if a retry already holds the claim.
    pub async fn claim_retry(&self, payment_uid: PaymentUid) -> bool {
        self.inner.lock().await.retrying.insert(payment_uid)
    }

    /// Gives back a retry claim once the retry has ended.
    pub async fn release_retry(&self, payment_uid: PaymentUid) {
        self.inner.lock().await.retrying.remove(&payment_uid);
    }

    pub async fn is_retrying(&self, payment_uid: PaymentUid) -> bool {
        self.inner.lock().await.retrying.contains(&payment_uid)
    }
}
