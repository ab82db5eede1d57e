use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

use super::captions::{extract_api_key, parse_caption_xml};
use super::TranscriptSource;

const WATCH_URL: &str = "https://www.youtube.com/watch";
const PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";
const DESKTOP_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ANDROID_USER_AGENT: &str =
    "Mozilla/5.0 (Linux; Android 11; SM-G973F) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
const ANDROID_CLIENT_NAME: &str = "ANDROID";
const ANDROID_CLIENT_VERSION: &str = "20.10.38";

static FORMAT_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&fmt=\w+$").expect("valid regex"));

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayerRequest<'a> {
    context: PlayerContext,
    video_id: &'a str,
}

#[derive(Debug, Serialize)]
struct PlayerContext {
    client: PlayerClient,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayerClient {
    client_name: &'static str,
    client_version: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct PlayerResponse {
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: Option<String>,
}

impl PlayerResponse {
    fn first_track(self) -> Option<CaptionTrack> {
        self.captions?
            .player_captions_tracklist_renderer?
            .caption_tracks
            .into_iter()
            .next()
    }
}

/// Transcript lookup through YouTube's internal player API: scrape the API
/// key from the watch page, ask the player endpoint for caption tracks, then
/// download the first track.
pub struct InnertubeTranscriptClient {
    client: Client,
}

impl InnertubeTranscriptClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_api_key(&self, video_id: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(WATCH_URL)
            .query(&[("v", video_id)])
            .header(USER_AGENT, DESKTOP_USER_AGENT)
            .header(ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header(ACCEPT_LANGUAGE, "*")
            .send()
            .await?;

        if !check_status(response.status(), "watch page", video_id)? {
            return Ok(None);
        }

        let html = response.text().await?;
        let key = extract_api_key(&html);
        if key.is_none() {
            tracing::debug!("No API key on watch page for {}", video_id);
        }
        Ok(key)
    }

    async fn fetch_caption_track(&self, video_id: &str, api_key: &str) -> Result<Option<CaptionTrack>> {
        let request = PlayerRequest {
            context: PlayerContext {
                client: PlayerClient {
                    client_name: ANDROID_CLIENT_NAME,
                    client_version: ANDROID_CLIENT_VERSION,
                },
            },
            video_id,
        };

        let response = self
            .client
            .post(PLAYER_URL)
            .query(&[("key", api_key)])
            .header(USER_AGENT, ANDROID_USER_AGENT)
            .header(ACCEPT, "application/json")
            .json(&request)
            .send()
            .await?;

        if !check_status(response.status(), "player API", video_id)? {
            return Ok(None);
        }

        let player: PlayerResponse = match response.json().await {
            Ok(player) => player,
            Err(e) => {
                tracing::debug!("Unreadable player response for {}: {}", video_id, e);
                return Ok(None);
            }
        };

        let track = player.first_track();
        match &track {
            Some(track) => tracing::debug!(
                "Caption track for {}: {}",
                video_id,
                track.language_code.as_deref().unwrap_or("unknown")
            ),
            None => tracing::debug!("No caption tracks for {}", video_id),
        }
        Ok(track)
    }

    async fn fetch_captions(&self, video_id: &str, track: &CaptionTrack) -> Result<Option<String>> {
        let url = FORMAT_PARAM.replace(&track.base_url, "");
        let response = self
            .client
            .get(&*url)
            .header(USER_AGENT, DESKTOP_USER_AGENT)
            .send()
            .await?;

        if !check_status(response.status(), "caption track", video_id)? {
            return Ok(None);
        }

        let xml = response.text().await?;
        Ok(parse_caption_xml(&xml))
    }
}

#[async_trait]
impl TranscriptSource for InnertubeTranscriptClient {
    async fn fetch_transcript(&self, video_id: &str) -> Result<Option<String>> {
        let Some(api_key) = self.fetch_api_key(video_id).await? else {
            return Ok(None);
        };

        let Some(track) = self.fetch_caption_track(video_id, &api_key).await? else {
            return Ok(None);
        };

        let transcript = self.fetch_captions(video_id, &track).await?;
        if let Some(text) = &transcript {
            tracing::debug!("Transcript for {}: {} chars", video_id, text.len());
        }
        Ok(transcript)
    }
}

/// `Ok(true)` to continue, `Ok(false)` when the resource is simply not there,
/// `Err` when the status is worth retrying (throttling or a server error).
fn check_status(status: StatusCode, step: &str, video_id: &str) -> Result<bool> {
    if status.is_success() {
        return Ok(true);
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return Err(AppError::Transcript(format!(
            "{step} returned {status} for {video_id}"
        )));
    }
    tracing::debug!("{} returned {} for {}", step, status, video_id);
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_caption_track() {
        let body = r#"{
            "captions": {
                "playerCaptionsTracklistRenderer": {
                    "captionTracks": [
                        {"baseUrl": "https://example.com/a&fmt=srv3", "languageCode": "en"},
                        {"baseUrl": "https://example.com/b", "languageCode": "de"}
                    ]
                }
            }
        }"#;
        let player: PlayerResponse = serde_json::from_str(body).unwrap();
        let track = player.first_track().unwrap();
        assert_eq!(track.language_code.as_deref(), Some("en"));
        assert_eq!(FORMAT_PARAM.replace(&track.base_url, ""), "https://example.com/a");
    }

    #[test]
    fn no_captions_block_means_no_track() {
        let player: PlayerResponse = serde_json::from_str(r#"{"playabilityStatus":{}}"#).unwrap();
        assert!(player.first_track().is_none());
    }

    #[test]
    fn request_body_shape() {
        let request = PlayerRequest {
            context: PlayerContext {
                client: PlayerClient {
                    client_name: ANDROID_CLIENT_NAME,
                    client_version: ANDROID_CLIENT_VERSION,
                },
            },
            video_id: "abc",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["videoId"], "abc");
        assert_eq!(json["context"]["client"]["clientName"], "ANDROID");
    }

    #[test]
    fn status_classification() {
        assert!(check_status(StatusCode::OK, "s", "v").unwrap());
        assert!(!check_status(StatusCode::NOT_FOUND, "s", "v").unwrap());
        assert!(check_status(StatusCode::TOO_MANY_REQUESTS, "s", "v").is_err());
        assert!(check_status(StatusCode::BAD_GATEWAY, "s", "v").is_err());
    }
}
