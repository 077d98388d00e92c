//! Database operations for the `notifications` table.

mod read;
mod types;
mod write;

pub use read::fetch_notification_page;
pub use types::{NewNotification, NotificationRow};
pub use write::{
    delete_notification, insert_notification, mark_all_notifications_read,
    mark_notification_read, mark_user_notification_read,
};
