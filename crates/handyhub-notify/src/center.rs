use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use futures::future::join_all;
use handyhub_core::{Notification, PageRequest, RemoteEvent};
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::error::NotifyError;
use crate::reconciler::{ApplyOutcome, MutationKind, NotificationReconciler, OpId};
use crate::store::NotificationStore;
use crate::subscription::Subscription;
use crate::view::ViewFilter;

/// Result of a batch mutation confirmed per entry.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub confirmed: Vec<Uuid>,
    /// One error per entry that was rolled back.
    pub failed: Vec<NotifyError>,
}

impl BatchOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Hosts a [`NotificationReconciler`] for async callers.
///
/// The reconciler lock is held only for the synchronous transitions, never
/// across a store call, so feed events keep flowing while confirmations are
/// outstanding.
pub struct NotificationCenter<S> {
    store: S,
    request: PageRequest,
    state: Mutex<NotificationReconciler>,
    live: AtomicBool,
    revision: watch::Sender<u64>,
}

impl<S: NotificationStore> NotificationCenter<S> {
    pub fn new(store: S, request: PageRequest) -> Self {
        Self {
            store,
            request,
            state: Mutex::new(NotificationReconciler::new()),
            live: AtomicBool::new(false),
            revision: watch::channel(0).0,
        }
    }

    /// Ticks whenever the displayed view may have changed.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    pub fn request(&self) -> &PageRequest {
        &self.request
    }

    /// Whether a change feed is currently being followed.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Refetch the configured page and make it the view. Returns the store's
    /// total count for the request.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Fetch`] if the store call fails; the view is
    /// left as it was.
    pub async fn refresh(&self) -> Result<i64, NotifyError> {
        let page = self
            .store
            .fetch_page(&self.request)
            .await
            .map_err(|e| NotifyError::Fetch(Box::new(e)))?;

        let total = page.total;
        self.state
            .lock()
            .await
            .replace_with_page(page.notifications);
        self.bump();
        Ok(total)
    }

    pub async fn apply_remote(&self, event: RemoteEvent) -> ApplyOutcome {
        let outcome = self.state.lock().await.apply_remote(event);
        if matches!(
            outcome,
            ApplyOutcome::Inserted | ApplyOutcome::Updated | ApplyOutcome::Removed
        ) {
            self.bump();
        }
        outcome
    }

    /// Mark one notification read. `Ok(false)` when there was nothing to do.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::ConfirmationFailure`] after rolling the entry
    /// back if the store rejects the change.
    pub async fn mark_read(&self, id: Uuid) -> Result<bool, NotifyError> {
        let read_at = Utc::now();
        let begun = self.state.lock().await.begin_mark_read(id, read_at);
        let Some(op) = begun else {
            tracing::debug!(%id, "mark read skipped; not shown or already read");
            return Ok(false);
        };
        self.bump();

        let result = self.store.mark_read(id, read_at).await.map(Some);
        self.settle(id, op, MutationKind::MarkRead, result)
            .await
            .map(|()| true)
    }

    /// Mark every unread entry read. Entries confirm independently.
    pub async fn mark_all_read(&self) -> BatchOutcome {
        let read_at = Utc::now();
        let ops = self.state.lock().await.begin_mark_all_read(read_at);
        tracing::debug!(count = ops.len(), "marking all notifications read");
        if !ops.is_empty() {
            self.bump();
        }

        let confirmations = ops.into_iter().map(|(id, op)| async move {
            let result = self.store.mark_read(id, read_at).await.map(Some);
            (id, self.settle(id, op, MutationKind::MarkRead, result).await)
        });
        collect_batch(join_all(confirmations).await)
    }

    /// Delete one notification. `Ok(false)` when it was not shown.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::ConfirmationFailure`] after restoring the entry
    /// if the store rejects the delete.
    pub async fn delete(&self, id: Uuid) -> Result<bool, NotifyError> {
        let begun = self.state.lock().await.begin_delete(id);
        let Some(op) = begun else {
            return Ok(false);
        };
        self.bump();

        let result = self.store.delete(id).await.map(|()| None);
        self.settle(id, op, MutationKind::Delete, result)
            .await
            .map(|()| true)
    }

    /// Delete several notifications; failures are restored in place.
    pub async fn delete_many(&self, ids: &[Uuid]) -> BatchOutcome {
        let ops = self.state.lock().await.begin_delete_many(ids);
        if !ops.is_empty() {
            self.bump();
        }

        let confirmations = ops.into_iter().map(|(id, op)| async move {
            let result = self.store.delete(id).await.map(|()| None);
            (id, self.settle(id, op, MutationKind::Delete, result).await)
        });
        collect_batch(join_all(confirmations).await)
    }

    pub async fn snapshot(&self) -> Vec<Notification> {
        self.state.lock().await.snapshot()
    }

    pub async fn view(&self, filter: &ViewFilter) -> Vec<Notification> {
        self.state.lock().await.view(filter)
    }

    pub async fn unread_count(&self) -> usize {
        self.state.lock().await.unread_count()
    }

    /// Apply feed events until `shutdown` resolves or the feed ends.
    ///
    /// On shutdown the subscription is torn down and `Ok(())` returned. If
    /// the feed ends by itself the view is refetched once, best effort, and
    /// [`NotifyError::SubscriptionLost`] returned so the caller can fall back
    /// to polling.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::SubscriptionLost`] when the feed disconnects.
    pub async fn follow<F>(&self, mut subscription: Subscription, shutdown: F) -> Result<(), NotifyError>
    where
        F: std::future::Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        self.live.store(true, Ordering::Release);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    self.live.store(false, Ordering::Release);
                    subscription.unsubscribe().await;
                    tracing::info!("stopped following notification feed");
                    return Ok(());
                }
                event = subscription.next() => {
                    let Some(event) = event else { break };
                    self.apply_remote(event).await;
                }
            }
        }

        self.live.store(false, Ordering::Release);
        tracing::warn!("notification feed lost; refetching");
        if let Err(e) = self.refresh().await {
            tracing::error!(error = %e, "refetch after feed loss failed");
        }
        Err(NotifyError::SubscriptionLost)
    }

    /// Resolve `op` with the store's answer. `Ok` carries the row version the
    /// store reported, when the write produces one.
    async fn settle<E>(
        &self,
        id: Uuid,
        op: OpId,
        operation: MutationKind,
        result: Result<Option<i64>, E>,
    ) -> Result<(), NotifyError>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut state = self.state.lock().await;
        match result {
            Ok(version) => {
                state.confirm_with_version(op, version);
                drop(state);
                self.bump();
                Ok(())
            }
            Err(e) => {
                state.rollback(op);
                drop(state);
                self.bump();
                tracing::error!(%id, %operation, error = %e, "store rejected notification change");
                Err(NotifyError::ConfirmationFailure {
                    id,
                    operation,
                    source: Box::new(e),
                })
            }
        }
    }
}

fn collect_batch(results: Vec<(Uuid, Result<(), NotifyError>)>) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for (id, result) in results {
        match result {
            Ok(()) => outcome.confirmed.push(id),
            Err(e) => outcome.failed.push(e),
        }
    }
    outcome
}
