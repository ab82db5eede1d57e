use std::sync::LazyLock;

use regex::Regex;

static API_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]INNERTUBE_API_KEY['"]\s*:\s*['"]([^'"]+)['"]"#).expect("valid regex")
});

static TEXT_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<text[^>]*>(.*?)</text>").expect("valid regex"));

// srv3 captions use <p> paragraphs with nested <s> word spans
static PARAGRAPH_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<p\b[^>]*>(.*?)</p>").expect("valid regex"));

static INNER_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

static STAGE_DIRECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Pull the Innertube API key out of a watch page.
pub fn extract_api_key(html: &str) -> Option<String> {
    API_KEY
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

/// Flatten a caption track into one line of text, without `[Music]`-style cues.
pub fn parse_caption_xml(xml: &str) -> Option<String> {
    let mut segments: Vec<String> = TEXT_SEGMENT
        .captures_iter(xml)
        .filter_map(|cap| cap.get(1))
        .map(|m| clean_segment(m.as_str()))
        .filter(|s| !s.is_empty())
        .collect();

    if segments.is_empty() {
        segments = PARAGRAPH_SEGMENT
            .captures_iter(xml)
            .filter_map(|cap| cap.get(1))
            .map(|m| clean_segment(&INNER_TAG.replace_all(m.as_str(), "")))
            .filter(|s| !s.is_empty())
            .collect();
    }

    let joined = segments.join(" ");
    let without_cues = STAGE_DIRECTION.replace_all(&joined, " ");
    let transcript = WHITESPACE.replace_all(&without_cues, " ").trim().to_string();

    if transcript.is_empty() {
        None
    } else {
        Some(transcript)
    }
}

// Caption text arrives entity-encoded, often twice (`&amp;#39;`).
fn clean_segment(raw: &str) -> String {
    let once = html_escape::decode_html_entities(raw);
    html_escape::decode_html_entities(&once).trim().to_string()
}
