mod digest;
mod highlight;
mod subscription;
mod summary;
mod usage;
mod user;
mod video;

pub use digest::{DigestCategory, DigestVideo, DigestView};
pub use highlight::Highlight;
pub use subscription::{category_or_default, Subscription, DEFAULT_CATEGORY};
pub use summary::{SummaryError, SummaryErrorKind, SummaryStatus};
pub use usage::{DailyStats, UsageMetric};
pub use user::User;
pub use video::{CandidateVideo, SummarizedVideo, TranscriptState, Video, TRANSCRIPT_UNAVAILABLE};
