use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORY: &str = "Other";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// YouTube channel id.
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub thumbnail_url: String,
    /// Assigned by the channel classifier, may not be populated yet.
    pub category: Option<String>,
}

/// Category a video is grouped under: `Other` when unset or blank.
pub fn category_or_default(category: Option<String>) -> String {
    category
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}
