//! Owner-controlled handle to a notification change feed.
//!
//! A [`Subscription`] is obtained from whatever produces events (the database
//! listener, a test) and is the only way to receive them. Dropping it aborts
//! the producer; [`Subscription::unsubscribe`] stops it cooperatively and
//! waits for it to finish.

use std::future::Future;

use handyhub_core::RemoteEvent;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Producer half handed to the task feeding a [`Subscription`].
#[derive(Debug)]
pub struct FeedSink {
    tx: mpsc::Sender<RemoteEvent>,
    cancel: oneshot::Receiver<()>,
    cancelled: bool,
}

impl FeedSink {
    /// Deliver one event. Returns `false` once the subscriber has gone away,
    /// at which point the producer should stop.
    pub async fn send(&mut self, event: RemoteEvent) -> bool {
        if self.cancelled {
            return false;
        }
        tokio::select! {
            biased;
            _ = &mut self.cancel => {
                self.cancelled = true;
                false
            }
            sent = self.tx.send(event) => sent.is_ok(),
        }
    }

    /// Resolves when the subscriber unsubscribes or drops its handle.
    pub async fn cancelled(&mut self) {
        if self.cancelled {
            return;
        }
        let _ = (&mut self.cancel).await;
        self.cancelled = true;
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancelled || self.tx.is_closed()
    }
}

#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<RemoteEvent>,
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// A subscription fed by hand through the returned sink.
    #[must_use]
    pub fn channel(capacity: usize) -> (FeedSink, Self) {
        let (tx, events) = mpsc::channel(capacity.max(1));
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let sink = FeedSink {
            tx,
            cancel: cancel_rx,
            cancelled: false,
        };
        let subscription = Self {
            events,
            cancel: Some(cancel_tx),
            task: None,
        };
        (sink, subscription)
    }

    /// Spawn `producer` on the runtime and subscribe to what it sends.
    ///
    /// The feed counts as lost when the producer returns on its own.
    pub fn spawn<F, Fut>(capacity: usize, producer: F) -> Self
    where
        F: FnOnce(FeedSink) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sink, mut subscription) = Self::channel(capacity);
        subscription.task = Some(tokio::spawn(producer(sink)));
        subscription
    }

    /// Next event, or `None` once the producer has stopped and the buffer is
    /// drained.
    pub async fn next(&mut self) -> Option<RemoteEvent> {
        self.events.recv().await
    }

    /// Stop the producer and wait for it to exit. Buffered events are
    /// discarded; nothing is delivered after this returns.
    pub async fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        self.events.close();
        while self.events.try_recv().is_ok() {}

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(()) => tracing::debug!("notification feed producer stopped"),
                Err(e) if e.is_cancelled() => {}
                Err(e) => tracing::warn!(error = %e, "notification feed producer panicked"),
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
