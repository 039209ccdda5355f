//! Article body model: an ordered list of editor blocks stored as JSON.
//!
//! Blocks are kept exactly as the editor sent them, including keys this
//! service does not know about. [`ContentBlock::read`] gives a lenient typed
//! view used for validation and word counting: a missing or malformed field
//! reads as empty, and a block without a known `type` carries no prose.

use serde_json::Value;

use crate::error::AppError;

/// Words read per minute when no override is configured.
pub const DEFAULT_WORDS_PER_MINUTE: usize = 200;

const DEFAULT_HEADING_LEVEL: u64 = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Heading { text: String, level: u64 },
    Paragraph { text: String },
    Image { url: String, alt: String, caption: String },
    Embed { url: String, caption: String },
    Quote { text: String, caption: String },
    List { items: Vec<String> },
    /// Anything without a recognised `type`.
    Other,
}

fn text(block: &Value, key: &str) -> String {
    block
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Accepts `3` and `"3"`; anything else is the default level.
fn level(block: &Value) -> u64 {
    match block.get("level") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(DEFAULT_HEADING_LEVEL),
        _ => DEFAULT_HEADING_LEVEL,
    }
}

fn items(block: &Value) -> Vec<String> {
    match block.get("items") {
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| v.as_str().unwrap_or_default().to_string())
            .collect(),
        _ => Vec::new(),
    }
}

impl ContentBlock {
    pub fn read(block: &Value) -> Self {
        match block.get("type").and_then(Value::as_str) {
            Some("heading") => ContentBlock::Heading {
                text: text(block, "text"),
                level: level(block),
            },
            Some("paragraph") => ContentBlock::Paragraph {
                text: text(block, "text"),
            },
            Some("image") => ContentBlock::Image {
                url: text(block, "url"),
                alt: text(block, "alt"),
                caption: text(block, "caption"),
            },
            Some("embed") => ContentBlock::Embed {
                url: text(block, "url"),
                caption: text(block, "caption"),
            },
            Some("quote") => ContentBlock::Quote {
                text: text(block, "text"),
                caption: text(block, "caption"),
            },
            Some("list") => ContentBlock::List { items: items(block) },
            _ => ContentBlock::Other,
        }
    }

    /// Prose carried by the block; media and unknown blocks carry none.
    pub fn plain_text(&self) -> String {
        match self {
            ContentBlock::Heading { text, .. }
            | ContentBlock::Paragraph { text }
            | ContentBlock::Quote { text, .. } => text.clone(),
            ContentBlock::List { items } => items.join(" "),
            ContentBlock::Image { .. } | ContentBlock::Embed { .. } | ContentBlock::Other => {
                String::new()
            }
        }
    }
}

/// Rejects blocks an editor could not render.
pub fn validate(blocks: &[Value]) -> Result<(), AppError> {
    for (idx, raw) in blocks.iter().enumerate() {
        match ContentBlock::read(raw) {
            ContentBlock::Heading { level, .. } if !(1..=6).contains(&level) => {
                return Err(AppError::Validation(format!(
                    "content[{}]: heading level must be between 1 and 6",
                    idx
                )));
            }
            ContentBlock::Image { url, .. } | ContentBlock::Embed { url, .. }
                if url.trim().is_empty() =>
            {
                return Err(AppError::Validation(format!(
                    "content[{}]: url is required",
                    idx
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Whole minutes to read `blocks`, never less than one.
pub fn estimate_reading_time(blocks: &[Value], words_per_minute: usize) -> i64 {
    let wpm = if words_per_minute == 0 {
        DEFAULT_WORDS_PER_MINUTE
    } else {
        words_per_minute
    };
    let text = blocks
        .iter()
        .map(|raw| ContentBlock::read(raw).plain_text())
        .collect::<Vec<_>>()
        .join(" ");
    let words = text.split_whitespace().count();
    words.div_ceil(wpm).max(1) as i64
}

/// Trims entries, drops blanks and repeats, keeps first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paragraph(words: usize) -> Value {
        json!({"type": "paragraph", "text": vec!["word"; words].join(" ")})
    }

    #[test]
    fn empty_content_reads_in_one_minute() {
        assert_eq!(estimate_reading_time(&[], DEFAULT_WORDS_PER_MINUTE), 1);
    }

    #[test]
    fn reading_time_rounds_up_and_never_decreases() {
        assert_eq!(estimate_reading_time(&[paragraph(200)], 200), 1);
        assert_eq!(estimate_reading_time(&[paragraph(201)], 200), 2);

        let mut last = 0;
        for words in (0..1000).step_by(37) {
            let minutes = estimate_reading_time(&[paragraph(words)], 200);
            assert!(minutes >= last);
            last = minutes;
        }
    }

    #[test]
    fn only_prose_blocks_count() {
        let blocks = vec![
            json!({"type": "heading", "text": "two words", "level": 2}),
            json!({"type": "image", "url": "https://img", "alt": "many words that do not count", "caption": "nor these"}),
            json!({"type": "list", "items": ["a b", "c"]}),
        ];
        let text: Vec<String> = blocks
            .iter()
            .map(|b| ContentBlock::read(b).plain_text())
            .collect();
        assert_eq!(text, vec!["two words", "", "a b c"]);
        assert_eq!(estimate_reading_time(&blocks, 4), 2);
    }

    #[test]
    fn malformed_blocks_count_as_empty() {
        let blocks = vec![
            json!({"text": "no type here"}),
            json!({"type": "video", "text": "not prose we know"}),
            json!({"type": "heading", "text": "one two", "level": "2"}),
            json!({"type": "quote", "text": 42}),
            json!({"type": "list", "items": ["x y", null, 7]}),
            json!("not even an object"),
            json!(null),
        ];
        assert_eq!(estimate_reading_time(&blocks, 4), 1);
        assert_eq!(estimate_reading_time(&blocks, 3), 2);
        assert!(validate(&blocks).is_ok());
    }

    #[test]
    fn blocks_read_leniently_with_heading_default() {
        assert_eq!(
            ContentBlock::read(&json!({"type": "heading", "text": "Intro", "id": "b7"})),
            ContentBlock::Heading {
                text: "Intro".into(),
                level: 2
            }
        );
        assert_eq!(
            ContentBlock::read(&json!({"type": "heading", "level": " 4 "})),
            ContentBlock::Heading {
                text: String::new(),
                level: 4
            }
        );
        assert_eq!(
            ContentBlock::read(&json!({"type": "paragraph"})),
            ContentBlock::Paragraph { text: String::new() }
        );
        assert_eq!(ContentBlock::read(&json!({"type": "video"})), ContentBlock::Other);
    }

    #[test]
    fn validation_checks_levels_and_urls() {
        assert!(validate(&[json!({"type": "heading", "text": "h", "level": 7})]).is_err());
        assert!(validate(&[json!({"type": "heading", "level": 0})]).is_err());
        assert!(validate(&[json!({"type": "embed", "url": " "})]).is_err());
        assert!(validate(&[json!({"type": "image"})]).is_err());
        assert!(validate(&[paragraph(3)]).is_ok());
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated_in_order() {
        let tags = normalize_tags(vec![
            " saving ".into(),
            "budget".into(),
            "saving".into(),
            "".into(),
        ]);
        assert_eq!(tags, vec!["saving", "budget"]);
    }
}
