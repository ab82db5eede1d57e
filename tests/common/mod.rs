#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use tube_digest::ai::{CompletionRequest, LlmClient};
use tube_digest::config::PipelineConfig;
use tube_digest::db::Repository;
use tube_digest::error::{AppError, Result};
use tube_digest::feed::FeedSource;
use tube_digest::models::{CandidateVideo, Subscription, User};
use tube_digest::pipeline::DigestOrchestrator;
use tube_digest::transcript::TranscriptSource;

pub const FOUR_LINES: &str =
    "**Ana** builds a compiler ⚙️\nThey set up **LLVM**.\nThey write a parser.\nThey end with a working binary.";

pub const PANIC_CHANNEL: &str = "UC_panics";
pub const BROKEN_CHANNEL: &str = "UC_broken";

/// Channel feeds served from memory.
#[derive(Default)]
pub struct StaticFeeds {
    pub feeds: HashMap<String, Vec<CandidateVideo>>,
}

impl StaticFeeds {
    pub fn with(mut self, channel_id: &str, videos: Vec<CandidateVideo>) -> Self {
        self.feeds.insert(channel_id.to_string(), videos);
        self
    }
}

#[async_trait]
impl FeedSource for StaticFeeds {
    async fn fetch_feed(&self, channel_id: &str) -> Result<Vec<CandidateVideo>> {
        if channel_id == PANIC_CHANNEL {
            panic!("feed parser blew up");
        }
        if channel_id == BROKEN_CHANNEL {
            return Err(AppError::Other(anyhow::anyhow!("HTTP 500")));
        }
        Ok(self.feeds.get(channel_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct StaticTranscripts {
    pub transcripts: HashMap<String, String>,
}

impl StaticTranscripts {
    pub fn with(mut self, video_id: &str, transcript: &str) -> Self {
        self.transcripts.insert(video_id.to_string(), transcript.to_string());
        self
    }
}

#[async_trait]
impl TranscriptSource for StaticTranscripts {
    async fn fetch_transcript(&self, video_id: &str) -> Result<Option<String>> {
        Ok(self.transcripts.get(video_id).cloned())
    }
}

/// Answers each kind of prompt with a well-formed reply.
#[derive(Default)]
pub struct RuleLlm {
    pub calls: AtomicUsize,
}

impl RuleLlm {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for RuleLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request.prompt;

        let reply = if prompt.contains("Format your response as") {
            let count = prompt.matches("\nTranscript: ").count();
            (1..=count)
                .map(|n| format!("Video {n} Summary: {FOUR_LINES}"))
                .collect::<Vec<_>>()
                .join("\n")
        } else if prompt.contains("editorial writer") {
            "• **Ana** ships a compiler\n• *Impressive* turnaround".to_string()
        } else if prompt.contains("newspaper headline") {
            "\"Developer Builds Compiler In One Day\"".to_string()
        } else {
            FOUR_LINES.to_string()
        };
        Ok(reply)
    }

    fn model(&self) -> &str {
        "rule-llm"
    }
}

/// A [`RuleLlm`] that holds each call open briefly and tracks how many
/// calls were in flight at once.
#[derive(Default)]
pub struct GaugeLlm {
    pub inner: RuleLlm,
    pub running: AtomicUsize,
    pub peak: AtomicUsize,
}

impl GaugeLlm {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for GaugeLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        let reply = self.inner.complete(request).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        reply
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}

pub fn video(id: &str, channel_id: &str, title: &str, published_at: DateTime<Utc>) -> CandidateVideo {
    CandidateVideo {
        id: id.to_string(),
        channel_id: channel_id.to_string(),
        title: title.to_string(),
        description: String::new(),
        published_at,
        thumbnail_url: format!("https://i.ytimg.com/vi/{id}/hqdefault.jpg"),
        views: Some(100),
        duration_seconds: None,
    }
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    Utc::now() - Duration::hours(hours)
}

pub fn transcript_text() -> String {
    "today we build a small compiler for a toy language using llvm and a hand written parser ".repeat(3)
}

pub async fn add_user(repo: &Repository, id: &str, timezone: &str, last_digest_at: Option<DateTime<Utc>>) {
    repo.upsert_user(User {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        timezone: timezone.to_string(),
        last_digest_at,
    })
    .await
    .unwrap();
}

pub async fn subscribe(repo: &Repository, user_id: &str, channel_id: &str, category: Option<&str>) {
    repo.upsert_subscriptions(vec![Subscription {
        id: channel_id.to_string(),
        user_id: user_id.to_string(),
        title: format!("Channel {channel_id}"),
        thumbnail_url: String::new(),
        category: category.map(str::to_string),
    }])
    .await
    .unwrap();
}

pub fn orchestrator(
    repo: &Repository,
    feeds: StaticFeeds,
    transcripts: StaticTranscripts,
    llm: Arc<RuleLlm>,
) -> DigestOrchestrator {
    DigestOrchestrator::new(
        repo.clone(),
        Arc::new(feeds),
        Arc::new(transcripts),
        llm,
        &PipelineConfig::without_pauses(),
    )
}
