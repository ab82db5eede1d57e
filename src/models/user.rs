use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    /// IANA zone name, e.g. `Asia/Kolkata`.
    pub timezone: String,
    pub last_digest_at: Option<DateTime<Utc>>,
}
