use std::sync::LazyLock;

use regex::Regex;

// Only markers that almost never appear on long-form uploads.
const HASHTAG_MARKERS: &[&str] = &["#shorts", "#youtubeshorts", "#shortsvideo", "#shortsfeed"];
const TOKEN_MARKERS: &[&str] = &["shorts", "#short"];

static BAIT_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(wait for it|watch till end|wait for the end)\b").expect("valid regex")
});

static TINY_EXCLAIMED_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.{1,15}[!?]{2,}$").expect("valid regex"));

/// Whether an upload looks like a YouTube Short.
pub fn is_short_form(title: &str, description: &str) -> bool {
    let title_lower = title.to_lowercase();
    let description_lower = description.to_lowercase();

    let has_marker = [&title_lower, &description_lower]
        .iter()
        .any(|text| has_short_marker(text));

    let trimmed = title.trim();
    let matches_pattern = BAIT_PHRASE.is_match(trimmed) || TINY_EXCLAIMED_TITLE.is_match(trimmed);

    if has_marker || matches_pattern {
        tracing::debug!(
            "Filtering short: {:?} ({})",
            title,
            if has_marker { "marker" } else { "pattern" }
        );
    }

    has_marker || matches_pattern
}

fn has_short_marker(text: &str) -> bool {
    HASHTAG_MARKERS.iter().any(|marker| text.contains(marker))
        || text
            .split_whitespace()
            .any(|token| TOKEN_MARKERS.contains(&token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashtag_in_any_case() {
        assert!(is_short_form("My day #shorts", ""));
        assert!(is_short_form("My day #SHORTS", ""));
        assert!(is_short_form("Cat fails #Shorts!", ""));
        assert!(is_short_form("Normal title", "follow for more #YouTubeShorts"));
        assert!(is_short_form("Quick tip #short about rust", ""));
    }

    #[test]
    fn standalone_token_only() {
        assert!(is_short_form("Funniest moments shorts", ""));
        assert!(!is_short_form("Undershorts review", ""));
        assert!(!is_short_form("The shortstop who changed baseball", ""));
        assert!(!is_short_form("Shortage of chips explained", ""));
        assert!(!is_short_form("A short history of Rome", ""));
    }

    #[test]
    fn bait_phrases_and_tiny_titles() {
        assert!(is_short_form("He did WHAT... wait for it", ""));
        assert!(is_short_form("Watch till end to see the trick", ""));
        assert!(is_short_form("No way!!", ""));
        assert!(is_short_form("Is this real?!?", ""));
        assert!(!is_short_form("Why did the 2008 financial crisis happen??", ""));
        assert!(!is_short_form("Rust 1.80 release notes", ""));
    }
}
