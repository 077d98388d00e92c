use thiserror::Error;
use uuid::Uuid;

use crate::reconciler::MutationKind;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// The store rejected an optimistic change; the local view was rolled back.
    #[error("could not {operation} notification {id}; the change was undone, please retry")]
    ConfirmationFailure {
        id: Uuid,
        operation: MutationKind,
        #[source]
        source: BoxError,
    },

    #[error("failed to fetch notifications: {0}")]
    Fetch(#[source] BoxError),

    /// The change feed ended without being unsubscribed.
    #[error("notification feed disconnected; showing the last fetched state")]
    SubscriptionLost,
}

impl NotifyError {
    /// The notification a failed confirmation was about, if any.
    #[must_use]
    pub fn notification_id(&self) -> Option<Uuid> {
        match self {
            NotifyError::ConfirmationFailure { id, .. } => Some(*id),
            NotifyError::Fetch(_) | NotifyError::SubscriptionLost => None,
        }
    }
}
