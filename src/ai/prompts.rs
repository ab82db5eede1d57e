//! Prompt text for every LLM call the pipeline makes.

const FOUR_LINE_SHAPE: &str = "\
**[Creator's actual name]** [does what?] [emoji if it fits]
They [describe the setup or what the video is about], covering [main tools, events, or context].
They [explain the process or what unfolds], using [specific details: tools, actions, changes].
They end by [sharing the result, reflection, or takeaway] so the viewer knows how it wraps up.";

const STYLE_RULES: &str = "\
Style requirements:
- Bold **specific tools, names, techniques** that actually appear in the source
- Italicize *tone words, emotions, reflections*
- Use at most 1-2 emojis
- For old movies or reposted classics, call it \"vintage\" or \"classic\" content
- Focus on concrete actions and outcomes, not vague descriptions";

/// Phrases the highlight writer must never use.
pub const BANNED_HIGHLIGHT_PHRASES: &[&str] = &[
    "delve into",
    "spark curiosity",
    "testament to",
    "reminder of",
    "thrill of discovery",
];

const CATEGORY_EMOJIS: &[(&str, &str)] = &[
    ("Technology", "⚡"),
    ("Education", "📚"),
    ("Entertainment", "🎭"),
    ("News", "📰"),
    ("Music", "🎵"),
    ("Gaming", "🎮"),
    ("Lifestyle", "🌿"),
    ("Business", "💼"),
    ("Science", "🔬"),
    ("Sports", "⚽"),
];

/// Section emoji for a category; unknown categories share one.
pub fn category_emoji(category: &str) -> &'static str {
    CATEGORY_EMOJIS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category))
        .map(|(_, emoji)| *emoji)
        .unwrap_or("🌟")
}

pub struct BatchItem<'a> {
    pub title: &'a str,
    pub transcript: &'a str,
}

pub struct HighlightItem<'a> {
    pub title: &'a str,
    pub channel: &'a str,
    pub summary: &'a str,
}

pub fn single_video_prompt(title: &str, transcript: &str) -> String {
    format!(
        "You are a precise video summarization assistant. Write a summary with EXACTLY these 4 lines:

{FOUR_LINE_SHAPE}

Rules:
- Use the creator's actual name from the title, never generic terms like \"YouTuber\"
- Use ONLY information from the transcript and title below
- Do not add names, products, numbers or technologies that are not in the transcript
- Avoid generic phrases like \"discusses various topics\"

{STYLE_RULES}

Video Title: {title}

Transcript:
{transcript}

4-line summary:"
    )
}

pub fn description_fallback_prompt(title: &str, description: &str) -> String {
    format!(
        "You are a precise video summarization assistant. The transcript is unavailable, so use ONLY the title and description. Write a summary with EXACTLY these 4 lines:

{FOUR_LINE_SHAPE}

Rules:
- Use the creator's actual name from the title, never generic terms like \"content creator\"
- Use ONLY information from the title and description below
- For live streams or breaking news, say it is \"live coverage\" or \"breaking news\"
- Do not make up details that are not in the source
- Avoid generic phrases like \"discusses various topics\"

{STYLE_RULES}
- For news content, prefer news emojis like 📰 🗞️ 📺

Video Title: {title}

Description:
{description}

4-line summary:"
    )
}

pub fn batch_prompt(videos: &[BatchItem<'_>]) -> String {
    let sections = videos
        .iter()
        .enumerate()
        .map(|(index, video)| {
            format!(
                "Video {}: {}\nTranscript: {}",
                index + 1,
                video.title,
                video.transcript
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n");

    format!(
        "You are a precise video summarization assistant. Summarize each video below with EXACTLY these 4 lines:

{FOUR_LINE_SHAPE}

Rules:
- Use the creator's actual name from each title, never generic terms like \"YouTuber\"
- Use ONLY information from that video's transcript and title
- Do not add names, products, numbers or technologies that are not in the transcript
- Avoid generic phrases like \"discusses various topics\"

{STYLE_RULES}

Format your response as:
Video 1 Summary: [4-line summary]
Video 2 Summary: [4-line summary]
[etc.]

Videos to summarize:
{sections}

Summaries:"
    )
}

pub fn highlight_prompt(category: &str, emoji: &str, videos: &[HighlightItem<'_>]) -> String {
    let summaries = videos
        .iter()
        .map(|v| format!("\"{}\" by {}: {}", v.title, v.channel, v.summary))
        .collect::<Vec<_>>()
        .join("\n\n");
    let banned = BANNED_HIGHLIGHT_PHRASES
        .iter()
        .map(|p| format!("\"{p}\""))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are the editorial writer for the {category} section of a newspaper-style video digest. Write factual bullet points.

FORMATTING:
- **Bold** channel names, creator names and key specifics
- *Italicize* tone words and editorial commentary
- Use a few relevant emojis ({emoji} fits this section)
- Each bullet point goes on its own line and starts with •

CONTENT RULES:
- Only describe the videos listed below
- Never invent anything that is not in the summaries
- Point out trends, connections or contrasts between videos
- Keep it factual and direct, like a news brief; no philosophical language
- Never use the phrases {banned}
- Keep each bullet short and scannable

Video summaries:
{summaries}

Output only the bullet points, nothing else:"
    )
}

pub fn headline_prompt(title: &str) -> String {
    format!(
        "Rewrite this YouTube title as a professional newspaper headline of 6-7 words.

Original title: \"{title}\"

Rules:
- 6-7 words maximum
- Professional tone
- No hashtags, no brackets
- No mention of \"shorts\"

Headline:"
    )
}
