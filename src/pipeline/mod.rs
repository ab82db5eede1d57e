mod aggregator;
mod jobs;
mod orchestrator;
mod summaries;
mod transcripts;

pub use aggregator::{DigestOutcome, VideoAggregator};
pub use jobs::{BackgroundJobs, DrainSummary};
pub use orchestrator::{BatchReport, DigestOrchestrator, HighlightsReport, UserRun};
pub use summaries::SummaryStage;
pub use transcripts::TranscriptStage;
