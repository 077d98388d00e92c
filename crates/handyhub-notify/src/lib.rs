//! Local, optimistic view of a user's notifications.
//!
//! [`NotificationReconciler`] is the synchronous state machine: remote
//! change-feed events and local mutations go in, a deduplicated ordered view
//! comes out. [`NotificationCenter`] hosts it for async callers, talking to
//! a [`NotificationStore`] for confirmations and following a
//! [`Subscription`] for live updates.

pub mod center;
pub mod error;
pub mod reconciler;
pub mod store;
pub mod subscription;
pub mod view;

pub use center::{BatchOutcome, NotificationCenter};
pub use error::{BoxError, NotifyError};
pub use reconciler::{ApplyOutcome, MutationKind, NotificationReconciler, OpId};
pub use store::NotificationStore;
pub use subscription::{FeedSink, Subscription};
pub use view::{filtered_sorted_view, SortOrder, ViewFilter};
