use handyhub_core::{Notification, StatusFilter};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Descending `created_at`.
    #[default]
    Newest,
    Oldest,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" | "desc" => Ok(SortOrder::Newest),
            "oldest" | "asc" => Ok(SortOrder::Oldest),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFilter {
    #[serde(default)]
    pub search_text: String,
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub sort: SortOrder,
}

/// Search, filter and sort a set of notifications without touching the source.
///
/// `search_text` is trimmed and matched case-insensitively as a substring of
/// either the title or the message. The sort is stable, so entries with equal
/// timestamps keep their incoming order.
pub fn filtered_sorted_view<I>(notifications: I, filter: &ViewFilter) -> Vec<Notification>
where
    I: IntoIterator<Item = Notification>,
{
    let needle = filter.search_text.trim().to_lowercase();

    let mut out: Vec<Notification> = notifications
        .into_iter()
        .filter(|n| filter.status.matches(n.status))
        .filter(|n| {
            needle.is_empty()
                || n.title.to_lowercase().contains(&needle)
                || n.message.to_lowercase().contains(&needle)
        })
        .collect();

    match filter.sort {
        SortOrder::Newest => out.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::Oldest => out.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
    }
    out
}
