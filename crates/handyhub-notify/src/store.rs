use std::future::Future;

use chrono::{DateTime, Utc};
use handyhub_core::{NotificationPage, PageRequest};
use uuid::Uuid;

/// The backing store that owns notification truth.
///
/// Every call is a single attempt; retry policy belongs to the caller.
pub trait NotificationStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<NotificationPage, Self::Error>> + Send;

    /// Mark `id` read, returning the row version after the write.
    fn mark_read(
        &self,
        id: Uuid,
        read_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<i64, Self::Error>> + Send;

    fn delete(&self, id: Uuid) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

impl<T: NotificationStore> NotificationStore for std::sync::Arc<T> {
    type Error = T::Error;

    fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<NotificationPage, Self::Error>> + Send {
        (**self).fetch_page(request)
    }

    fn mark_read(
        &self,
        id: Uuid,
        read_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<i64, Self::Error>> + Send {
        (**self).mark_read(id, read_at)
    }

    fn delete(&self, id: Uuid) -> impl Future<Output = Result<(), Self::Error>> + Send {
        (**self).delete(id)
    }
}
