use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{
    category_or_default, CandidateVideo, DailyStats, DigestVideo, Subscription, SummarizedVideo,
    SummaryError, SummaryStatus, TranscriptState, UsageMetric, User, Video,
};

use super::schema::SCHEMA;

const VIDEO_COLUMNS: &str = "v.id, v.user_id, v.channel_id, v.title, v.description, v.published_at, \
     v.thumbnail_url, v.views, v.duration_seconds, v.transcript, v.summary, v.summary_status, \
     v.ai_title, v.created_at";

#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::with_connection(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // User operations

    pub async fn upsert_user(&self, user: User) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO users (id, email, timezone, last_digest_at)
                       VALUES (?1, ?2, ?3, ?4)
                       ON CONFLICT(id) DO UPDATE SET
                           email = excluded.email,
                           timezone = excluded.timezone,
                           last_digest_at = excluded.last_digest_at"#,
                    params![
                        user.id,
                        user.email,
                        user.timezone,
                        user.last_digest_at.map(|dt| dt.to_rfc3339()),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_all_users(&self) -> Result<Vec<User>> {
        let users = self
            .conn
            .call(|conn| {
                let mut stmt = conn
                    .prepare("SELECT id, email, timezone, last_digest_at FROM users ORDER BY created_at, id")?;
                let users = stmt
                    .query_map([], user_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(users)
            })
            .await?;
        Ok(users)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let user_id = user_id.to_string();
        let user = self
            .conn
            .call(move |conn| {
                let user = conn
                    .query_row(
                        "SELECT id, email, timezone, last_digest_at FROM users WHERE id = ?1",
                        params![user_id],
                        user_from_row,
                    )
                    .optional()?;
                Ok(user)
            })
            .await?;
        Ok(user)
    }

    pub async fn update_last_digest(&self, user_id: &str, at: DateTime<Utc>) -> Result<()> {
        let user_id = user_id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE users SET last_digest_at = ?1 WHERE id = ?2",
                    params![at.to_rfc3339(), user_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Subscription operations

    pub async fn upsert_subscriptions(&self, subscriptions: Vec<Subscription>) -> Result<()> {
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for sub in &subscriptions {
                    tx.execute(
                        r#"INSERT INTO subscriptions (id, user_id, title, thumbnail_url, category)
                           VALUES (?1, ?2, ?3, ?4, ?5)
                           ON CONFLICT(id, user_id) DO UPDATE SET
                               title = excluded.title,
                               thumbnail_url = excluded.thumbnail_url,
                               category = excluded.category"#,
                        params![sub.id, sub.user_id, sub.title, sub.thumbnail_url, sub.category],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_user_subscriptions(&self, user_id: &str) -> Result<Vec<Subscription>> {
        let user_id = user_id.to_string();
        let subscriptions = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, title, thumbnail_url, category FROM subscriptions WHERE user_id = ?1 ORDER BY title",
                )?;
                let subscriptions = stmt
                    .query_map(params![user_id], |row| {
                        Ok(Subscription {
                            id: row.get(0)?,
                            user_id: row.get(1)?,
                            title: row.get(2)?,
                            thumbnail_url: row.get(3)?,
                            category: row.get(4)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(subscriptions)
            })
            .await?;
        Ok(subscriptions)
    }

    // Video operations

    pub async fn delete_user_videos(&self, user_id: &str) -> Result<usize> {
        let user_id = user_id.to_string();
        let deleted = self
            .conn
            .call(move |conn| {
                let deleted = conn.execute("DELETE FROM videos WHERE user_id = ?1", params![user_id])?;
                Ok(deleted)
            })
            .await?;
        Ok(deleted)
    }

    /// Inserts the whole set in one transaction, replacing rows with the same (id, user).
    pub async fn upsert_videos(&self, user_id: &str, videos: Vec<CandidateVideo>) -> Result<usize> {
        let user_id = user_id.to_string();
        let count = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for video in &videos {
                    tx.execute(
                        r#"INSERT INTO videos (id, user_id, channel_id, title, description, published_at,
                                               thumbnail_url, views, duration_seconds)
                           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                           ON CONFLICT(id, user_id) DO UPDATE SET
                               channel_id = excluded.channel_id,
                               title = excluded.title,
                               description = excluded.description,
                               published_at = excluded.published_at,
                               thumbnail_url = excluded.thumbnail_url,
                               views = excluded.views,
                               duration_seconds = excluded.duration_seconds"#,
                        params![
                            video.id,
                            user_id,
                            video.channel_id,
                            video.title,
                            video.description,
                            video.published_at.to_rfc3339(),
                            video.thumbnail_url,
                            video.views.map(|v| v as i64),
                            video.duration_seconds.map(|d| d as i64),
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(videos.len())
            })
            .await?;
        Ok(count)
    }

    pub async fn get_user_videos(&self, user_id: &str) -> Result<Vec<Video>> {
        self.query_videos(user_id, "1 = 1").await
    }

    pub async fn videos_pending_transcript(&self, user_id: &str) -> Result<Vec<Video>> {
        self.query_videos(user_id, "v.transcript IS NULL").await
    }

    /// Videos with no summary yet whose transcript lookup has finished either way.
    pub async fn videos_needing_summary(&self, user_id: &str) -> Result<Vec<Video>> {
        self.query_videos(
            user_id,
            "v.summary IS NULL AND v.transcript IS NOT NULL AND (v.summary_status IS NULL OR v.summary_status = 'processing' OR v.summary_status = 'transcript_missing')",
        )
        .await
    }

    pub async fn videos_without_ai_title(&self, user_id: &str) -> Result<Vec<Video>> {
        self.query_videos(user_id, "v.summary IS NULL AND v.ai_title IS NULL")
            .await
    }

    async fn query_videos(&self, user_id: &str, filter: &'static str) -> Result<Vec<Video>> {
        let user_id = user_id.to_string();
        let videos = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {VIDEO_COLUMNS} FROM videos v WHERE v.user_id = ?1 AND {filter} \
                     ORDER BY v.published_at DESC, v.id"
                );
                let mut stmt = conn.prepare(&sql)?;
                let videos = stmt
                    .query_map(params![user_id], video_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(videos)
            })
            .await?;
        Ok(videos)
    }

    pub async fn update_transcript(
        &self,
        user_id: &str,
        video_id: &str,
        transcript: TranscriptState,
    ) -> Result<()> {
        let user_id = user_id.to_string();
        let video_id = video_id.to_string();
        let status = match transcript {
            TranscriptState::Fetched(_) => Some(SummaryStatus::Processing),
            TranscriptState::Unavailable => Some(SummaryStatus::TranscriptMissing),
            TranscriptState::Pending => None,
        };
        let column = transcript.to_column();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"UPDATE videos SET transcript = ?1, summary_status = ?2
                       WHERE id = ?3 AND user_id = ?4"#,
                    params![column, status.map(|s| s.as_str()), video_id, user_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Writes summary and status together; the summary is dropped unless the status is success.
    pub async fn save_summary(
        &self,
        user_id: &str,
        video_id: &str,
        summary: Option<String>,
        status: SummaryStatus,
    ) -> Result<()> {
        let user_id = user_id.to_string();
        let video_id = video_id.to_string();
        let summary = summary.filter(|_| status == SummaryStatus::Success);
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE videos SET summary = ?1, summary_status = ?2 WHERE id = ?3 AND user_id = ?4",
                    params![summary, status.as_str(), video_id, user_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn set_ai_title(&self, user_id: &str, video_id: &str, title: String) -> Result<()> {
        let user_id = user_id.to_string();
        let video_id = video_id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE videos SET ai_title = ?1 WHERE id = ?2 AND user_id = ?3",
                    params![title, video_id, user_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn summarized_videos(&self, user_id: &str) -> Result<Vec<SummarizedVideo>> {
        let user_id = user_id.to_string();
        let videos = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT v.id, v.title, v.summary, s.title, s.category
                       FROM videos v
                       LEFT JOIN subscriptions s ON s.id = v.channel_id AND s.user_id = v.user_id
                       WHERE v.user_id = ?1 AND v.summary IS NOT NULL AND TRIM(v.summary) != ''
                       ORDER BY v.published_at DESC, v.id"#,
                )?;
                let videos = stmt
                    .query_map(params![user_id], |row| {
                        Ok(SummarizedVideo {
                            id: row.get(0)?,
                            title: row.get(1)?,
                            summary: row.get(2)?,
                            channel_title: row
                                .get::<_, Option<String>>(3)?
                                .unwrap_or_else(|| "Unknown Channel".to_string()),
                            category: category_or_default(row.get(4)?),
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(videos)
            })
            .await?;
        Ok(videos)
    }

    pub async fn digest_videos(&self, user_id: &str) -> Result<Vec<DigestVideo>> {
        let user_id = user_id.to_string();
        let videos = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {VIDEO_COLUMNS}, s.title, s.thumbnail_url, s.category
                     FROM videos v
                     LEFT JOIN subscriptions s ON s.id = v.channel_id AND s.user_id = v.user_id
                     WHERE v.user_id = ?1
                     ORDER BY v.published_at DESC, v.id"
                );
                let mut stmt = conn.prepare(&sql)?;
                let videos = stmt
                    .query_map(params![user_id], |row| {
                        let video = video_from_row(row)?;
                        let channel_title = row
                            .get::<_, Option<String>>(14)?
                            .unwrap_or_else(|| "Unknown Channel".to_string());
                        let channel_thumbnail = row.get::<_, Option<String>>(15)?.unwrap_or_default();
                        let category = category_or_default(row.get(16)?);
                        Ok(DigestVideo::from_video(video, channel_title, channel_thumbnail, category))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(videos)
            })
            .await?;
        Ok(videos)
    }

    // Usage and highlight operations

    /// Upserts the counters for (user, date); any stored highlights are left alone.
    pub async fn record_usage(&self, metric: UsageMetric) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO daily_usage (user_id, date, total_videos, total_summaries, summary_model, duration_seconds)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                       ON CONFLICT(user_id, date) DO UPDATE SET
                           total_videos = excluded.total_videos,
                           total_summaries = excluded.total_summaries,
                           summary_model = excluded.summary_model,
                           duration_seconds = excluded.duration_seconds,
                           updated_at = datetime('now')"#,
                    params![
                        metric.user_id,
                        metric.date.to_string(),
                        metric.total_videos,
                        metric.total_summaries,
                        metric.summary_model,
                        metric.duration_seconds as i64,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_usage(&self, user_id: &str, date: NaiveDate) -> Result<Option<UsageMetric>> {
        let user_id = user_id.to_string();
        let metric = self
            .conn
            .call(move |conn| {
                let metric = conn
                    .query_row(
                        r#"SELECT user_id, total_videos, total_summaries, summary_model, duration_seconds
                           FROM daily_usage WHERE user_id = ?1 AND date = ?2"#,
                        params![user_id, date.to_string()],
                        |row| {
                            Ok(UsageMetric {
                                user_id: row.get(0)?,
                                date,
                                total_videos: row.get(1)?,
                                total_summaries: row.get(2)?,
                                summary_model: row.get(3)?,
                                duration_seconds: row.get::<_, i64>(4)? as u64,
                            })
                        },
                    )
                    .optional()?;
                Ok(metric)
            })
            .await?;
        Ok(metric)
    }

    /// Replaces the highlight JSON for (user, date); counters are left alone.
    pub async fn store_highlights_json(&self, user_id: &str, date: NaiveDate, json: String) -> Result<()> {
        let user_id = user_id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO daily_usage (user_id, date, highlights)
                       VALUES (?1, ?2, ?3)
                       ON CONFLICT(user_id, date) DO UPDATE SET
                           highlights = excluded.highlights,
                           updated_at = datetime('now')"#,
                    params![user_id, date.to_string(), json],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// The highlight JSON for `date`, or else the latest earlier day that has one.
    pub async fn latest_highlights_json(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<(NaiveDate, String)>> {
        let user_id = user_id.to_string();
        let found = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        r#"SELECT date, highlights FROM daily_usage
                           WHERE user_id = ?1 AND date <= ?2 AND highlights IS NOT NULL
                           ORDER BY date DESC
                           LIMIT 1"#,
                        params![user_id, date.to_string()],
                        |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        Ok(found.and_then(|(day, json)| {
            NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                .ok()
                .map(|day| (day, json))
        }))
    }

    pub async fn record_summary_error(&self, error: SummaryError) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO summary_errors (video_id, user_id, error_type, error_message) VALUES (?1, ?2, ?3, ?4)",
                    params![error.video_id, error.user_id, error.kind.as_str(), error.message],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn daily_stats(&self, date: NaiveDate) -> Result<DailyStats> {
        let stats = self
            .conn
            .call(move |conn| {
                let day = date.to_string();
                let (total_users, total_videos, total_summaries, total_duration): (i64, i64, i64, i64) =
                    conn.query_row(
                        r#"SELECT COUNT(*), COALESCE(SUM(total_videos), 0),
                                  COALESCE(SUM(total_summaries), 0), COALESCE(SUM(duration_seconds), 0)
                           FROM daily_usage WHERE date = ?1"#,
                        params![day],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                    )?;

                let mut stmt = conn.prepare(
                    "SELECT error_type, COUNT(*) FROM summary_errors WHERE date(created_at) = ?1 GROUP BY error_type",
                )?;
                let errors_by_type = stmt
                    .query_map(params![day], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)))?
                    .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;
                let total_errors = errors_by_type.values().sum();

                let avg_duration_seconds = if total_users > 0 {
                    (total_duration as f64 / total_users as f64).round() as u64
                } else {
                    0
                };
                let success_rate = if total_videos > 0 {
                    (total_summaries as f64 / total_videos as f64 * 1000.0).round() / 10.0
                } else {
                    0.0
                };

                Ok(DailyStats {
                    date,
                    total_users: total_users as u32,
                    total_videos: total_videos as u64,
                    total_summaries: total_summaries as u64,
                    avg_duration_seconds,
                    success_rate,
                    errors_by_type,
                    total_errors,
                })
            })
            .await?;
        Ok(stats)
    }
}

/// Accepts RFC 3339, SQLite's `datetime('now')` format and bare dates.
pub(crate) fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    // Date-only values are read as midnight UTC
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    None
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        timezone: row.get(2)?,
        last_digest_at: row
            .get::<_, Option<String>>(3)?
            .and_then(|s| parse_datetime(&s)),
    })
}

fn video_from_row(row: &Row) -> rusqlite::Result<Video> {
    Ok(Video {
        id: row.get(0)?,
        user_id: row.get(1)?,
        channel_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        published_at: row
            .get::<_, Option<String>>(5)?
            .and_then(|s| parse_datetime(&s)),
        thumbnail_url: row.get(6)?,
        views: row.get::<_, Option<i64>>(7)?.map(|v| v as u64),
        duration_seconds: row.get::<_, Option<i64>>(8)?.map(|d| d as u64),
        transcript: TranscriptState::from_column(row.get(9)?),
        summary: row.get(10)?,
        summary_status: row
            .get::<_, Option<String>>(11)?
            .and_then(|s| s.parse().ok()),
        ai_title: row.get(12)?,
        created_at: row
            .get::<_, String>(13)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}
