//! Notification records and the change-feed event shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Unread,
    Read,
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationStatus::Unread => write!(f, "unread"),
            NotificationStatus::Read => write!(f, "read"),
        }
    }
}

impl std::str::FromStr for NotificationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unread" => Ok(NotificationStatus::Unread),
            "read" => Ok(NotificationStatus::Read),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Request,
    Review,
    Message,
    Verification,
    System,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationKind::Request => "request",
            NotificationKind::Review => "review",
            NotificationKind::Message => "message",
            NotificationKind::Verification => "verification",
            NotificationKind::System => "system",
            NotificationKind::Other => "other",
        };
        f.write_str(s)
    }
}

impl From<&str> for NotificationKind {
    fn from(s: &str) -> Self {
        match s {
            "request" => NotificationKind::Request,
            "review" => NotificationKind::Review,
            "message" => NotificationKind::Message,
            "verification" => NotificationKind::Verification,
            "system" => NotificationKind::System,
            _ => NotificationKind::Other,
        }
    }
}

/// A single notification as owned by the backing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub status: NotificationStatus,
    pub related_id: Option<Uuid>,
    pub related_kind: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    /// Row version bumped by the store on every write; orders events per id.
    pub version: i64,
}

impl Notification {
    #[must_use]
    pub fn is_unread(&self) -> bool {
        self.status == NotificationStatus::Unread
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteEventKind {
    Insert,
    Update,
    Delete,
}

/// One message from the notification change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEvent {
    pub kind: RemoteEventKind,
    pub notification: Notification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Read,
    Unread,
}

impl StatusFilter {
    #[must_use]
    pub fn matches(self, status: NotificationStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Read => status == NotificationStatus::Read,
            StatusFilter::Unread => status == NotificationStatus::Unread,
        }
    }

    /// The status value to filter on in a store query, if any.
    #[must_use]
    pub fn as_status(self) -> Option<NotificationStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Read => Some(NotificationStatus::Read),
            StatusFilter::Unread => Some(NotificationStatus::Unread),
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            "read" => Ok(StatusFilter::Read),
            "unread" => Ok(StatusFilter::Unread),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// Parameters of an initial or refresh fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub user_id: Uuid,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
    pub status: StatusFilter,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    #[must_use]
    pub fn first_page(user_id: Uuid, limit: u32) -> Self {
        Self {
            user_id,
            page: 1,
            limit: limit.clamp(1, Self::MAX_LIMIT),
            status: StatusFilter::All,
        }
    }

    /// Row offset for this page.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * i64::from(self.limit.clamp(1, Self::MAX_LIMIT))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub total: i64,
}
