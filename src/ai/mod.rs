mod client;
mod highlights;
pub mod prompts;
mod summarizer;
mod titles;

pub use client::{ChatCompletionClient, CompletionRequest, LlmClient};
pub use highlights::{load_highlights, HighlightSynthesizer};
pub use summarizer::{
    choose_source, classify_failure, parse_batch_response, Summarizer, SummarizerSettings,
    SummaryOutcome, SummaryRequest, SummarySource,
};
pub use titles::generate_ai_titles_for_user;
