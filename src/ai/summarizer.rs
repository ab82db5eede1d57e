use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;

use crate::config::PipelineConfig;
use crate::error::AppError;
use crate::models::SummaryErrorKind;

use super::client::{CompletionRequest, LlmClient};
use super::prompts::{self, BatchItem};

const MIN_TRANSCRIPT_CHARS: usize = 50;
const MIN_DESCRIPTION_CHARS: usize = 20;
const BATCH_TRANSCRIPT_CHARS: usize = 800;
const CHUNK_TRANSCRIPT_CHARS: usize = 1000;
const MAX_BATCH: usize = 3;
const SUMMARY_LINES: usize = 4;

static BATCH_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\*\*)?Video (\d+) Summary:(?:\*\*)?\s*(.*)$").expect("valid regex")
});

/// One video as handed to the summarizer.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub id: String,
    pub title: String,
    pub transcript: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarySource {
    Transcript,
    Description,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Summary(String),
    TranscriptMissing,
    LlmFailed { kind: SummaryErrorKind, reason: String },
}

/// Live streams and breaking news are summarized from their description.
fn is_live_content(request: &SummaryRequest) -> bool {
    let title = request.title.to_lowercase();
    let description = request
        .description
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();

    title.contains("live")
        || title.contains("stream")
        || title.contains("breaking")
        || description.contains("live stream")
        || description.contains("breaking news")
}

pub fn choose_source(request: &SummaryRequest) -> Option<SummarySource> {
    let has_transcript = request
        .transcript
        .as_deref()
        .is_some_and(|t| t.trim().chars().count() > MIN_TRANSCRIPT_CHARS);
    if has_transcript && !is_live_content(request) {
        return Some(SummarySource::Transcript);
    }

    let has_description = request
        .description
        .as_deref()
        .is_some_and(|d| d.trim().chars().count() > MIN_DESCRIPTION_CHARS);
    has_description.then_some(SummarySource::Description)
}

/// Splits a multi-video response on its `Video N Summary:` labels.
///
/// Keys are 1-based positions. Lines after a label belong to it until the
/// next label. Indices outside `1..=expected` and repeated labels are ignored.
pub fn parse_batch_response(response: &str, expected: usize) -> HashMap<usize, String> {
    fn finish(entry: Option<(usize, Vec<String>)>, summaries: &mut HashMap<usize, String>) {
        if let Some((index, lines)) = entry {
            let text = lines.join("\n").trim().to_string();
            if !text.is_empty() {
                summaries.entry(index).or_insert(text);
            }
        }
    }

    let mut summaries = HashMap::new();
    let mut current: Option<(usize, Vec<String>)> = None;

    for line in response.lines() {
        if let Some(caps) = BATCH_LABEL.captures(line) {
            finish(current.take(), &mut summaries);
            let index = caps[1].parse::<usize>().unwrap_or(0);
            if (1..=expected).contains(&index) && !summaries.contains_key(&index) {
                let first = caps[2].trim();
                let lines = if first.is_empty() {
                    Vec::new()
                } else {
                    vec![first.to_string()]
                };
                current = Some((index, lines));
            }
            continue;
        }

        if let Some((_, lines)) = current.as_mut() {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
    }
    finish(current.take(), &mut summaries);

    summaries
}

pub fn classify_failure(error: &AppError) -> SummaryErrorKind {
    match error {
        AppError::RateLimited(_) => SummaryErrorKind::ApiQuota,
        AppError::Http(e) if e.is_timeout() => SummaryErrorKind::LlmTimeout,
        _ => SummaryErrorKind::LlmFailed,
    }
}

fn truncate_chars(text: &str, max: usize) -> (String, bool) {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    let cut = chars.next().is_some();
    (head, cut)
}

fn decode_summary(text: &str) -> String {
    html_escape::decode_html_entities(text.trim()).into_owned()
}

fn line_count(summary: &str) -> usize {
    summary.lines().filter(|l| !l.trim().is_empty()).count()
}

#[derive(Debug, Clone)]
pub struct SummarizerSettings {
    pub batch_size: usize,
    pub call_pause: Duration,
    pub batch_pause: Duration,
    pub strict_shape: bool,
}

impl From<&PipelineConfig> for SummarizerSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            batch_size: config.summary_batch_size.clamp(1, MAX_BATCH),
            call_pause: Duration::from_millis(config.summary_call_pause_ms),
            batch_pause: Duration::from_millis(config.summary_batch_pause_ms),
            strict_shape: config.strict_summary_shape,
        }
    }
}

pub struct Summarizer {
    llm: Arc<dyn LlmClient>,
    settings: SummarizerSettings,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn LlmClient>, settings: SummarizerSettings) -> Self {
        Self { llm, settings }
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Whether a summary is acceptable. Off-shape summaries are only
    /// rejected in strict mode.
    fn accept_shape(&self, id: &str, summary: &str) -> bool {
        let lines = line_count(summary);
        if lines == SUMMARY_LINES {
            return true;
        }
        tracing::warn!("Summary for {} has {} lines instead of {}", id, lines, SUMMARY_LINES);
        !self.settings.strict_shape
    }

    pub async fn summarize_one(&self, request: &SummaryRequest) -> SummaryOutcome {
        let prompt = match choose_source(request) {
            Some(SummarySource::Transcript) => {
                let transcript = request.transcript.as_deref().unwrap_or_default();
                prompts::single_video_prompt(&request.title, transcript)
            }
            Some(SummarySource::Description) => {
                tracing::debug!("Using description for {}", request.id);
                let description = request.description.as_deref().unwrap_or_default();
                prompts::description_fallback_prompt(&request.title, description)
            }
            None => {
                tracing::info!("No transcript or description for {}", request.id);
                return SummaryOutcome::TranscriptMissing;
            }
        };

        let response = match self.llm.complete(CompletionRequest::new(prompt, 0.1, 150)).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Summary call failed for {}: {}", request.id, e);
                return SummaryOutcome::LlmFailed {
                    kind: classify_failure(&e),
                    reason: e.to_string(),
                };
            }
        };

        let summary = decode_summary(&response);
        if summary.is_empty() {
            return SummaryOutcome::LlmFailed {
                kind: SummaryErrorKind::LlmFailed,
                reason: "empty response".to_string(),
            };
        }
        if !self.accept_shape(&request.id, &summary) {
            return SummaryOutcome::LlmFailed {
                kind: SummaryErrorKind::LlmFailed,
                reason: format!("expected {} lines, got {}", SUMMARY_LINES, line_count(&summary)),
            };
        }

        SummaryOutcome::Summary(summary)
    }

    /// One call for up to three transcripts. Ids missing from the result
    /// were not answered; the caller decides what to do with them.
    pub async fn summarize_batch(&self, requests: &[SummaryRequest]) -> HashMap<String, String> {
        let batch: Vec<(&SummaryRequest, String)> = requests
            .iter()
            .take(MAX_BATCH)
            .filter_map(|request| {
                let transcript = request.transcript.as_deref()?;
                let (mut text, cut) = truncate_chars(transcript, BATCH_TRANSCRIPT_CHARS);
                if cut {
                    text.push_str("...");
                }
                Some((request, text))
            })
            .collect();
        if batch.is_empty() {
            return HashMap::new();
        }

        let items: Vec<BatchItem<'_>> = batch
            .iter()
            .map(|(request, transcript)| BatchItem {
                title: &request.title,
                transcript,
            })
            .collect();
        let prompt = prompts::batch_prompt(&items);

        let response = match self.llm.complete(CompletionRequest::new(prompt, 0.1, 400)).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Batch summary call failed for {} videos: {}", batch.len(), e);
                return HashMap::new();
            }
        };

        parse_batch_response(&response, batch.len())
            .into_iter()
            .filter_map(|(index, text)| {
                let (request, _) = batch.get(index - 1)?;
                let summary = decode_summary(&text);
                (!summary.is_empty() && self.accept_shape(&request.id, &summary))
                    .then(|| (request.id.clone(), summary))
            })
            .collect()
    }

    /// Batch what can be batched, then summarize every video the batch
    /// did not answer on its own. Each request id appears exactly once in
    /// the result, in input order.
    pub async fn summarize_with_fallback(&self, requests: Vec<SummaryRequest>) -> Vec<(String, SummaryOutcome)> {
        let mut outcomes = Vec::with_capacity(requests.len());

        for (chunk_index, chunk) in requests.chunks(self.settings.batch_size).enumerate() {
            if chunk_index > 0 && !self.settings.batch_pause.is_zero() {
                tokio::time::sleep(self.settings.batch_pause).await;
            }

            let chunk: Vec<SummaryRequest> = chunk
                .iter()
                .cloned()
                .map(|mut request| {
                    request.transcript = request
                        .transcript
                        .map(|t| truncate_chars(&t, CHUNK_TRANSCRIPT_CHARS).0);
                    request
                })
                .collect();

            let transcript_backed: Vec<SummaryRequest> = chunk
                .iter()
                .filter(|r| choose_source(r) == Some(SummarySource::Transcript))
                .cloned()
                .collect();

            let mut batched = if transcript_backed.len() >= 2 {
                self.summarize_batch(&transcript_backed).await
            } else {
                HashMap::new()
            };
            if !batched.is_empty() {
                tracing::debug!("Batch answered {}/{} videos", batched.len(), transcript_backed.len());
            }

            let mut made_call = false;
            for request in &chunk {
                if let Some(summary) = batched.remove(&request.id) {
                    outcomes.push((request.id.clone(), SummaryOutcome::Summary(summary)));
                    continue;
                }

                if choose_source(request).is_some() {
                    if made_call && !self.settings.call_pause.is_zero() {
                        tokio::time::sleep(self.settings.call_pause).await;
                    }
                    made_call = true;
                }
                let outcome = self.summarize_one(request).await;
                outcomes.push((request.id.clone(), outcome));
            }
        }

        outcomes
    }
}
