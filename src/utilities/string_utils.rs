//! String utility functions: template interpolation and HTML text extraction.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_\-]*)\}").unwrap());
static PARAGRAPH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p\s*>").unwrap());
static SCRIPT_STYLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").unwrap());
static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r\n]+").unwrap());

/// Interpolate `{key}` placeholders in a template.
///
/// Only identifiers (`{letter_or_underscore...}`) are treated as
/// placeholders, so literal JSON braces pass through untouched.
///
/// # Errors
/// Returns the name of the first placeholder missing from `inputs`.
pub fn interpolate_only(input: &str, inputs: &HashMap<String, String>) -> Result<String, String> {
    if !input.contains('{') {
        return Ok(input.to_string());
    }

    if let Some(missing) = VARIABLE_PATTERN
        .captures_iter(input)
        .map(|cap| cap[1].to_string())
        .find(|v| !inputs.contains_key(v))
    {
        return Err(missing);
    }

    Ok(VARIABLE_PATTERN
        .replace_all(input, |cap: &regex::Captures<'_>| {
            inputs.get(&cap[1]).cloned().unwrap_or_default()
        })
        .into_owned())
}

/// Placeholder names used by a template, first occurrence order, no repeats.
pub fn template_variables(input: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for cap in VARIABLE_PATTERN.captures_iter(input) {
        if !names.iter().any(|n| n == &cap[1]) {
            names.push(cap[1].to_string());
        }
    }
    names
}

/// Decode the common named entities and numeric character references.
pub fn decode_html_entities(text: &str) -> String {
    let numeric = NUMERIC_ENTITY.replace_all(text, |cap: &regex::Captures<'_>| {
        let raw = &cap[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default()
    });
    numeric
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Remove tags, decode entities and collapse whitespace.
pub fn strip_html(fragment: &str) -> String {
    let without_scripts = SCRIPT_STYLE_PATTERN.replace_all(fragment, " ");
    let without_tags = TAG_PATTERN.replace_all(&without_scripts, " ");
    let decoded = decode_html_entities(&without_tags);
    WHITESPACE_RUN.replace_all(&decoded, " ").trim().to_string()
}

/// Text of every `<p>` element in document order.
pub fn html_paragraphs(html: &str) -> Vec<String> {
    let html = SCRIPT_STYLE_PATTERN.replace_all(html, " ");
    PARAGRAPH_PATTERN
        .captures_iter(&html)
        .map(|cap| strip_html(&cap[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_interpolate_only_basic() {
        let result =
            interpolate_only("Write about {topic} in a {tone} tone.", &inputs(&[("topic", "AI"), ("tone", "casual")]))
                .unwrap();
        assert_eq!(result, "Write about AI in a casual tone.");
    }

    #[test]
    fn test_interpolate_only_leaves_json() {
        let template = r#"Return {"title": "..."} for {topic}"#;
        let result = interpolate_only(template, &inputs(&[("topic", "AI")])).unwrap();
        assert_eq!(result, r#"Return {"title": "..."} for AI"#);
    }

    #[test]
    fn test_template_variables() {
        assert_eq!(
            template_variables(r#"About {topic}, {tone}, {topic} and {"json": 1}"#),
            vec!["topic", "tone"]
        );
        assert!(template_variables("no placeholders").is_empty());
    }

    #[test]
    fn test_interpolate_only_missing_var() {
        let result = interpolate_only("Hello {name}!", &HashMap::new());
        assert_eq!(result, Err("name".to_string()));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_html_entities("a &amp; b &#39;c&#x27; &lt;d&gt;"), "a & b 'c' <d>");
        assert_eq!(decode_html_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_html_paragraphs() {
        let html = r#"<html><script>var x = "<p>no</p>";</script>
            <p class="lead">First <b>bold</b>
            line.</p><div>skip</div><P>Second &amp; last</P></html>"#;
        assert_eq!(html_paragraphs(html), vec!["First bold line.", "Second & last"]);
    }
}
