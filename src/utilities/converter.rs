//! Structured-output recovery.
//!
//! [`extract_blog_record`] turns whatever the pipeline produced into a
//! [`BlogRecord`]. It tries, in order:
//!
//! 1. the value itself as a record;
//! 2. the value under `summarizing_task`, `reporting_task` or `final_output`;
//! 3. a fenced `json` block (first `{` to last `}`) in the text form;
//! 4. synthesis from the prose;
//! 5. a fixed record.
//!
//! It never fails and every field of the result is non-empty.

use std::panic::{self, AssertUnwindSafe};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::types::BlogRecord;

/// Title used when none can be derived.
pub const DEFAULT_TITLE: &str = "Generated Blog Post";

/// Body used when the raw output is empty.
pub const PLACEHOLDER_POST: &str =
    "The blog post was generated but its content could not be recovered. Please try again.";

/// Meta description used when no leading sentence fits.
pub const GENERIC_META_DESCRIPTION: &str =
    "Read our latest blog post for fresh insights, practical tips and expert analysis.";

/// Preview used when the derived one is too short.
pub const GENERIC_PREVIEW: &str =
    "Discover fresh insights and practical takeaways in our latest blog post.";

/// Maximum meta description length in characters.
pub const META_DESCRIPTION_LIMIT: usize = 160;

const TITLE_LIMIT: usize = 100;
const MIN_PREVIEW_LEN: usize = 10;
const KNOWN_KEYS: [&str; 3] = ["summarizing_task", "reporting_task", "final_output"];
const MAX_DEPTH: usize = 8;

static JSON_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)```[ \t]*json[^\n]*\n?(.*?)```").unwrap());
static OPEN_JSON_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)```[ \t]*json").unwrap());
static BOLD_LEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\*\*|__)(.+?)(?:\*\*|__)").unwrap());
static MARKDOWN_MARKERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[#*_`>]+").unwrap());
static SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());

/// Which step produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    Direct,
    Nested,
    Fenced,
    Synthesized,
    LastResort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub record: BlogRecord,
    pub stage: ExtractionStage,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Convert a pipeline result into a blog record.
pub fn extract_blog_record(result: &Value) -> Extraction {
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| extract_inner(result)));
    match attempt {
        Ok(extraction) if extraction.record.is_complete() => extraction,
        Ok(_) => {
            log::warn!("Extraction produced an incomplete record; using last-resort record");
            last_resort(result)
        }
        Err(_) => {
            log::warn!("Extraction panicked; using last-resort record");
            last_resort(result)
        }
    }
}

fn extract_inner(result: &Value) -> Extraction {
    if let Some((record, depth)) = find_record(result, 0) {
        let stage = if depth == 0 {
            ExtractionStage::Direct
        } else {
            ExtractionStage::Nested
        };
        log::debug!("Extraction accepted structured record ({stage:?})");
        return Extraction { record, stage };
    }

    let text = primary_text(result, 0);
    if let Some(record) = fenced_record(&text) {
        log::debug!("Extraction accepted fenced JSON record");
        return Extraction {
            record,
            stage: ExtractionStage::Fenced,
        };
    }

    log::info!("Extraction falling back to synthesis from prose");
    Extraction {
        record: synthesize(&text),
        stage: ExtractionStage::Synthesized,
    }
}

// ---------------------------------------------------------------------------
// States 1 and 2
// ---------------------------------------------------------------------------

/// Accept `value` as a record, descending through known keys.
///
/// A string holding a JSON object is parsed and re-examined.
fn find_record(value: &Value, depth: usize) -> Option<(BlogRecord, usize)> {
    if depth > MAX_DEPTH {
        return None;
    }
    if let Some(record) = BlogRecord::from_value(value) {
        return Some((record, depth));
    }
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if !trimmed.starts_with('{') {
                return None;
            }
            let parsed: Value = serde_json::from_str(trimmed).ok()?;
            find_record(&parsed, depth)
        }
        Value::Object(map) => KNOWN_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|inner| find_record(inner, depth + 1)),
        _ => None,
    }
}

/// Text form of a result: strings as-is, known-key payloads unwrapped
/// (text values first), anything else serialized.
fn primary_text(value: &Value, depth: usize) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Object(map) if depth <= MAX_DEPTH => {
            let known: Vec<&Value> = KNOWN_KEYS.iter().filter_map(|key| map.get(*key)).collect();
            match known.iter().find(|inner| inner.is_string()).or_else(|| known.first()) {
                Some(inner) => primary_text(inner, depth + 1),
                None => value.to_string(),
            }
        }
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// State 3
// ---------------------------------------------------------------------------

/// Parse the span from the first `{` to the last `}` of `text`.
pub fn brace_span_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(v @ Value::Object(_)) => Some(v),
        _ => None,
    }
}

fn fenced_record(text: &str) -> Option<BlogRecord> {
    JSON_FENCE
        .captures_iter(text)
        .filter_map(|cap| brace_span_object(&cap[1]))
        .find_map(|v| BlogRecord::from_value(&v))
}

/// Recover a JSON object from model output: the whole text, then each
/// fenced `json` block, then the outermost brace span.
pub fn recover_json_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(v @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(v);
    }
    JSON_FENCE
        .captures_iter(trimmed)
        .find_map(|cap| brace_span_object(&cap[1]))
        .or_else(|| brace_span_object(trimmed))
}

// ---------------------------------------------------------------------------
// State 4
// ---------------------------------------------------------------------------

/// Build a record from prose. Title, meta description and preview come only
/// from the text outside JSON fences; without any they are the generic ones.
pub fn synthesize(text: &str) -> BlogRecord {
    let prose = strip_json_fences(text);
    let sentences = sentences(&prose);

    let blog_post = if !prose.is_empty() {
        prose.clone()
    } else if !text.trim().is_empty() {
        text.trim().to_string()
    } else {
        PLACEHOLDER_POST.to_string()
    };

    BlogRecord {
        title: derive_title(&prose, &sentences),
        blog_post,
        meta_description: derive_meta_description(&sentences),
        blog_preview: derive_preview(&sentences),
    }
}

/// The text with every fenced `json` block removed, remaining spans rejoined.
/// An unterminated fence runs to the end of the text.
fn strip_json_fences(text: &str) -> String {
    let mut spans: Vec<&str> = JSON_FENCE.split(text).collect();
    if let Some(last) = spans.last_mut() {
        let tail: &str = last;
        if let Some(open) = OPEN_JSON_FENCE.find(tail) {
            *last = &tail[..open.start()];
        }
    }
    spans
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn derive_title(source: &str, sentences: &[String]) -> String {
    let first_line = source.lines().map(str::trim).find(|l| !l.is_empty());
    if let Some(line) = first_line {
        if line.starts_with('#') {
            let heading = clean_inline(line.trim_start_matches('#'));
            if !heading.is_empty() {
                return heading;
            }
        }
        if let Some(cap) = BOLD_LEAD.captures(line) {
            let bold = clean_inline(&cap[1]);
            if !bold.is_empty() {
                return bold;
            }
        }
    }
    match sentences.first() {
        Some(first) => {
            let truncated: String = first.chars().take(TITLE_LIMIT).collect();
            let truncated = truncated.trim().to_string();
            if truncated.is_empty() {
                DEFAULT_TITLE.to_string()
            } else {
                truncated
            }
        }
        None => DEFAULT_TITLE.to_string(),
    }
}

fn derive_meta_description(sentences: &[String]) -> String {
    let mut meta = String::new();
    for sentence in sentences {
        let candidate_len = if meta.is_empty() {
            sentence.chars().count()
        } else {
            meta.chars().count() + 1 + sentence.chars().count()
        };
        if candidate_len > META_DESCRIPTION_LIMIT {
            break;
        }
        if !meta.is_empty() {
            meta.push(' ');
        }
        meta.push_str(sentence);
    }
    if meta.is_empty() {
        GENERIC_META_DESCRIPTION.to_string()
    } else {
        meta
    }
}

fn derive_preview(sentences: &[String]) -> String {
    let preview = sentences.iter().take(2).cloned().collect::<Vec<_>>().join(" ");
    if preview.chars().count() < MIN_PREVIEW_LEN {
        GENERIC_PREVIEW.to_string()
    } else {
        preview
    }
}

/// Remove markdown heading, emphasis, code and quote markers.
fn clean_inline(text: &str) -> String {
    let stripped = MARKDOWN_MARKERS.replace_all(text, "");
    SPACE_RUN.replace_all(stripped.trim(), " ").to_string()
}

/// Split cleaned text into sentences. Line breaks always end a sentence.
pub fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for line in text.lines() {
        let line = clean_inline(line);
        let mut current = String::new();
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            current.push(c);
            let at_boundary = matches!(c, '.' | '!' | '?')
                && chars.peek().map_or(true, |next| next.is_whitespace());
            if at_boundary {
                let sentence = current.trim();
                if !sentence.is_empty() {
                    out.push(sentence.to_string());
                }
                current.clear();
            }
        }
        let rest = current.trim();
        if !rest.is_empty() {
            out.push(rest.to_string());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// State 5
// ---------------------------------------------------------------------------

fn last_resort(result: &Value) -> Extraction {
    let raw = match result {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    Extraction {
        record: BlogRecord {
            title: DEFAULT_TITLE.to_string(),
            blog_post: if raw.is_empty() { PLACEHOLDER_POST.to_string() } else { raw },
            meta_description: GENERIC_META_DESCRIPTION.to_string(),
            blog_preview: GENERIC_PREVIEW.to_string(),
        },
        stage: ExtractionStage::LastResort,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> Value {
        Value::String(s.to_string())
    }

    fn assert_complete(e: &Extraction) {
        assert!(e.record.is_complete(), "incomplete record: {:?}", e.record);
        assert!(e.record.meta_description.chars().count() <= META_DESCRIPTION_LIMIT);
    }

    #[test]
    fn test_direct_record() {
        let v = json!({"title": "T", "blog_post": "B", "meta_description": "M", "blog_preview": "P"});
        let e = extract_blog_record(&v);
        assert_eq!(e.stage, ExtractionStage::Direct);
        assert_eq!(e.record.title, "T");
    }

    #[test]
    fn test_fenced_round_trip_without_fallback() {
        let raw = "Here you go:\n```json\n{\"title\":\"T\",\"blog_post\":\"B\",\"meta_description\":\"M\",\"blog_preview\":\"P\"}\n```";
        let e = extract_blog_record(&text(raw));
        assert_eq!(e.stage, ExtractionStage::Fenced);
        assert_eq!(
            e.record,
            BlogRecord {
                title: "T".into(),
                blog_post: "B".into(),
                meta_description: "M".into(),
                blog_preview: "P".into(),
            }
        );
    }

    #[test]
    fn test_nested_under_known_key() {
        let v = json!({
            "reporting_task": "draft",
            "summarizing_task": {"title": "T", "blog_post": "B", "meta_description": "M", "blog_preview": "P"}
        });
        let e = extract_blog_record(&v);
        assert_eq!(e.stage, ExtractionStage::Nested);
        assert_eq!(e.record.blog_post, "B");
    }

    #[test]
    fn test_nested_json_string_under_known_key() {
        let v = json!({
            "final_output": "{\"title\": \"T\", \"blog_post\": \"B\", \"meta_description\": \"M\", \"blog_preview\": \"P\"}"
        });
        assert_eq!(extract_blog_record(&v).stage, ExtractionStage::Nested);
    }

    #[test]
    fn test_json_string_is_direct() {
        let raw = r#"  {"title": "T", "blog_post": "B", "meta_description": "M", "blog_preview": "P"} "#;
        assert_eq!(extract_blog_record(&text(raw)).stage, ExtractionStage::Direct);
    }

    #[test]
    fn test_fenced_missing_field_falls_back() {
        let raw = "# Edge Computing Today\n\nEdge computing is growing fast. It cuts latency.\n\n```json\n{\"title\": \"T\", \"blog_post\": \"B\"}\n```";
        let e = extract_blog_record(&text(raw));
        assert_eq!(e.stage, ExtractionStage::Synthesized);
        assert_eq!(e.record.title, "Edge Computing Today");
        assert!(!e.record.blog_post.contains("```"));
        assert!(e.record.blog_post.contains("It cuts latency."));
        assert_complete(&e);
    }

    #[test]
    fn test_fence_only_uses_generic_fields() {
        let raw = "```json\n{}\n```";
        let e = extract_blog_record(&text(raw));
        assert_eq!(e.stage, ExtractionStage::Synthesized);
        assert_eq!(e.record.title, DEFAULT_TITLE);
        assert_eq!(e.record.blog_post, raw);
        assert_eq!(e.record.meta_description, GENERIC_META_DESCRIPTION);
        assert_eq!(e.record.blog_preview, GENERIC_PREVIEW);
    }

    #[test]
    fn test_unterminated_fence() {
        let raw = "```json\n{\"title\": \"T\"";
        let e = extract_blog_record(&text(raw));
        assert_eq!(e.record.title, DEFAULT_TITLE);
        assert_eq!(e.record.blog_post, raw);
        assert_eq!(e.record.meta_description, GENERIC_META_DESCRIPTION);

        let with_prose = "# Rust at the Edge\n\nSmall binaries help.\n```json\n{\"title\": \"T\"";
        let e = extract_blog_record(&text(with_prose));
        assert_eq!(e.record.title, "Rust at the Edge");
        assert_eq!(e.record.blog_post, "# Rust at the Edge\n\nSmall binaries help.");
    }

    #[test]
    fn test_text_under_known_key_preferred_over_partial_object() {
        let v = json!({
            "summarizing_task": {"title": "T"},
            "reporting_task": "# Edge Computing Today\n\nEdge computing cuts latency."
        });
        let e = extract_blog_record(&v);
        assert_eq!(e.stage, ExtractionStage::Synthesized);
        assert_eq!(e.record.title, "Edge Computing Today");
        assert_eq!(e.record.meta_description, "Edge Computing Today Edge computing cuts latency.");
    }

    #[test]
    fn test_empty_string() {
        let e = extract_blog_record(&text(""));
        assert_eq!(e.record.title, DEFAULT_TITLE);
        assert_eq!(e.record.blog_post, PLACEHOLDER_POST);
        assert_eq!(e.record.meta_description, GENERIC_META_DESCRIPTION);
        assert_eq!(e.record.blog_preview, GENERIC_PREVIEW);
        assert_complete(&e);
    }

    #[test]
    fn test_null_and_non_string_values() {
        assert_complete(&extract_blog_record(&Value::Null));
        assert_complete(&extract_blog_record(&json!([1, 2, 3])));
        assert_complete(&extract_blog_record(&json!({"unrelated": true})));
    }

    #[test]
    fn test_pure_prose() {
        let raw = "Edge computing brings data processing closer to devices. This reduces latency! Many industries benefit?";
        let e = extract_blog_record(&text(raw));
        assert_eq!(e.stage, ExtractionStage::Synthesized);
        assert_eq!(e.record.title, "Edge computing brings data processing closer to devices.");
        assert_eq!(
            e.record.blog_preview,
            "Edge computing brings data processing closer to devices. This reduces latency!"
        );
        assert_eq!(e.record.meta_description, raw);
        assert_complete(&e);
    }

    #[test]
    fn test_bold_title() {
        let raw = "**The Future of AI** is here. More text follows.";
        assert_eq!(extract_blog_record(&text(raw)).record.title, "The Future of AI");
    }

    #[test]
    fn test_title_truncated_to_100_chars() {
        let raw = "a".repeat(250);
        let e = extract_blog_record(&text(&raw));
        assert_eq!(e.record.title.chars().count(), 100);
        assert_eq!(e.record.meta_description, GENERIC_META_DESCRIPTION);
    }

    #[test]
    fn test_meta_description_budget() {
        let sentence = "This sentence is exactly fifty characters long ok.";
        let raw = format!("{sentence} {sentence} {sentence} {sentence}");
        let e = extract_blog_record(&text(&raw));
        assert_eq!(e.record.meta_description, format!("{sentence} {sentence} {sentence}"));
        assert!(e.record.meta_description.chars().count() <= 160);
    }

    #[test]
    fn test_meta_strips_markdown_and_splits_lines() {
        let raw = "## Heading\n*Emphasis* matters\n- `code` point.";
        let e = extract_blog_record(&text(raw));
        assert_eq!(e.record.title, "Heading");
        assert_eq!(e.record.meta_description, "Heading Emphasis matters - code point.");
    }

    #[test]
    fn test_short_preview_uses_generic() {
        let e = extract_blog_record(&text("Hi."));
        assert_eq!(e.record.blog_preview, GENERIC_PREVIEW);
        assert_eq!(e.record.title, "Hi.");
    }

    #[test]
    fn test_recover_json_object() {
        assert!(recover_json_object("{\"a\": 1}").is_some());
        assert!(recover_json_object("text ```json\n{\"a\": 1}\n``` more").is_some());
        assert!(recover_json_object("prefix {\"a\": 1} suffix").is_some());
        assert!(recover_json_object("no json here").is_none());
        assert!(recover_json_object("} backwards {").is_none());
    }

    #[test]
    fn test_sentences() {
        assert_eq!(
            sentences("One. Two!\nThree without stop\nv1.2 is out."),
            vec!["One.", "Two!", "Three without stop", "v1.2 is out."]
        );
    }
}
