//! Loading users and their channel subscriptions from a JSON roster.

use serde::Deserialize;

use crate::db::Repository;
use crate::error::Result;
use crate::models::{Subscription, User};

#[derive(Debug, Deserialize)]
struct Roster {
    users: Vec<RosterUser>,
}

#[derive(Debug, Deserialize)]
struct RosterUser {
    id: String,
    email: String,
    #[serde(default = "default_timezone")]
    timezone: String,
    #[serde(default)]
    subscriptions: Vec<RosterSubscription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RosterSubscription {
    channel_id: String,
    title: String,
    #[serde(default)]
    thumbnail_url: String,
    category: Option<String>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub users: usize,
    pub subscriptions: usize,
}

/// Upserts every user and subscription in `json`. A user's last digest
/// time survives re-imports.
pub async fn import_roster(repository: &Repository, json: &str) -> Result<ImportSummary> {
    let roster: Roster = serde_json::from_str(json)?;
    let mut summary = ImportSummary::default();

    for entry in roster.users {
        let last_digest_at = repository
            .get_user(&entry.id)
            .await?
            .and_then(|existing| existing.last_digest_at);
        repository
            .upsert_user(User {
                id: entry.id.clone(),
                email: entry.email,
                timezone: entry.timezone,
                last_digest_at,
            })
            .await?;
        summary.users += 1;

        let subscriptions: Vec<Subscription> = entry
            .subscriptions
            .into_iter()
            .map(|s| Subscription {
                id: s.channel_id,
                user_id: entry.id.clone(),
                title: s.title,
                thumbnail_url: s.thumbnail_url,
                category: s.category,
            })
            .collect();
        summary.subscriptions += subscriptions.len();
        if !subscriptions.is_empty() {
            repository.upsert_subscriptions(subscriptions).await?;
        }
    }

    tracing::info!(
        "Imported {} users with {} subscriptions",
        summary.users,
        summary.subscriptions
    );
    Ok(summary)
}
