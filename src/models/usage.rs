use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-user, per-day counters written at the end of a digest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageMetric {
    pub user_id: String,
    pub date: NaiveDate,
    pub total_videos: u32,
    pub total_summaries: u32,
    pub summary_model: String,
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: NaiveDate,
    pub total_users: u32,
    pub total_videos: u64,
    pub total_summaries: u64,
    pub avg_duration_seconds: u64,
    /// Percentage of videos that ended with a summary.
    pub success_rate: f64,
    pub errors_by_type: BTreeMap<String, u32>,
    pub total_errors: u32,
}
