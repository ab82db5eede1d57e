use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    Success,
    TranscriptMissing,
    LlmFailed,
    Processing,
}

impl SummaryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStatus::Success => "success",
            SummaryStatus::TranscriptMissing => "transcript_missing",
            SummaryStatus::LlmFailed => "llm_failed",
            SummaryStatus::Processing => "processing",
        }
    }
}

impl fmt::Display for SummaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(SummaryStatus::Success),
            "transcript_missing" => Ok(SummaryStatus::TranscriptMissing),
            "llm_failed" => Ok(SummaryStatus::LlmFailed),
            "processing" => Ok(SummaryStatus::Processing),
            other => Err(format!("unknown summary status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryErrorKind {
    TranscriptMissing,
    LlmTimeout,
    LlmFailed,
    ApiQuota,
}

impl SummaryErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryErrorKind::TranscriptMissing => "transcript_missing",
            SummaryErrorKind::LlmTimeout => "llm_timeout",
            SummaryErrorKind::LlmFailed => "llm_failed",
            SummaryErrorKind::ApiQuota => "api_quota",
        }
    }
}

/// Per-video failure record kept for the daily stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryError {
    pub video_id: String,
    pub user_id: String,
    pub kind: SummaryErrorKind,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for status in [
            SummaryStatus::Success,
            SummaryStatus::TranscriptMissing,
            SummaryStatus::LlmFailed,
            SummaryStatus::Processing,
        ] {
            assert_eq!(status.as_str().parse::<SummaryStatus>(), Ok(status));
        }
        assert!("pending".parse::<SummaryStatus>().is_err());
    }
}
