use std::sync::Arc;
use std::time::Duration;

use crate::db::Repository;
use crate::error::Result;

use super::client::{CompletionRequest, LlmClient};
use super::prompts;

fn clean_headline(raw: &str) -> String {
    raw.trim()
        .trim_start_matches(['"', '\''])
        .trim_end_matches(['"', '\''])
        .trim()
        .to_string()
}

/// Writes newspaper headlines for a user's videos that have neither a
/// summary nor a headline yet. Returns how many were written.
pub async fn generate_ai_titles_for_user(
    repository: Repository,
    llm: Arc<dyn LlmClient>,
    user_id: String,
    pause: Duration,
) -> Result<usize> {
    let videos = repository.videos_without_ai_title(&user_id).await?;
    tracing::debug!("Generating headlines for {} videos of {}", videos.len(), user_id);

    let mut written = 0;
    for (index, video) in videos.iter().enumerate() {
        if index > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }

        let request = CompletionRequest::new(prompts::headline_prompt(&video.title), 0.1, 50);
        let headline = match llm.complete(request).await {
            Ok(text) => clean_headline(&text),
            Err(e) => {
                tracing::warn!("Headline call failed for {}: {}", video.id, e);
                continue;
            }
        };
        if headline.is_empty() {
            continue;
        }

        repository.set_ai_title(&user_id, &video.id, headline).await?;
        written += 1;
    }

    tracing::info!("Wrote {} headlines for user {}", written, user_id);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateVideo, SummaryStatus, User};
    use async_trait::async_trait;
    use chrono::Utc;

    struct Quoted;

    #[async_trait]
    impl LlmClient for Quoted {
        async fn complete(&self, _request: CompletionRequest) -> Result<String> {
            Ok("\"Engineer Builds Tiny Rust Kernel\"\n".to_string())
        }

        fn model(&self) -> &str {
            "quoted"
        }
    }

    #[test]
    fn strips_surrounding_quotes() {
        assert_eq!(clean_headline(" 'Big News Today' "), "Big News Today");
        assert_eq!(clean_headline("It's fine"), "It's fine");
    }

    #[tokio::test]
    async fn only_unsummarized_videos_get_headlines() {
        let repo = Repository::open_in_memory().await.unwrap();
        repo.upsert_user(User {
            id: "u1".into(),
            email: "u1@example.com".into(),
            timezone: "UTC".into(),
            last_digest_at: None,
        })
        .await
        .unwrap();
        let videos = ["a", "b"]
            .into_iter()
            .map(|id| CandidateVideo {
                id: id.into(),
                channel_id: "c".into(),
                title: format!("Video {id}"),
                description: String::new(),
                published_at: Utc::now(),
                thumbnail_url: String::new(),
                views: None,
                duration_seconds: None,
            })
            .collect();
        repo.upsert_videos("u1", videos).await.unwrap();
        repo.save_summary("u1", "b", Some("done".into()), SummaryStatus::Success)
            .await
            .unwrap();

        let written = generate_ai_titles_for_user(repo.clone(), Arc::new(Quoted), "u1".into(), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(written, 1);

        let stored = repo.get_user_videos("u1").await.unwrap();
        let a = stored.iter().find(|v| v.id == "a").unwrap();
        let b = stored.iter().find(|v| v.id == "b").unwrap();
        assert_eq!(a.ai_title.as_deref(), Some("Engineer Builds Tiny Rust Kernel"));
        assert_eq!(b.ai_title, None);
    }
}
