//! Lightweight HTML handling for scraped pages and content analysis

use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>").unwrap()
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n+").unwrap());
static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").unwrap());
static META_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<meta\b[^>]*>").unwrap());
static CONTENT_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)\bcontent\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

/// Remove `<script>` and `<style>` blocks
pub fn strip_scripts(html: &str) -> String {
    SCRIPT_STYLE_RE.replace_all(html, " ").into_owned()
}

pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Readable text of an HTML document; plain text passes through unchanged apart
/// from whitespace cleanup.
pub fn html_to_text(html: &str) -> String {
    let without_scripts = strip_scripts(html);
    let text = TAG_RE.replace_all(&without_scripts, "\n");
    let text = decode_entities(&text);
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    BLANK_LINES_RE
        .replace_all(joined.trim(), "\n")
        .into_owned()
}

pub fn extract_title(html: &str) -> String {
    TITLE_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .unwrap_or_default()
}

/// `content` of the first `<meta>` whose `attr` equals `value`, e.g.
/// `meta_content(html, "property", "article:published_time")`.
pub fn meta_content(html: &str, attr: &str, value: &str) -> Option<String> {
    let needle_dq = format!("{attr}=\"{value}\"").to_ascii_lowercase();
    let needle_sq = format!("{attr}='{value}'").to_ascii_lowercase();
    META_RE.find_iter(html).find_map(|tag| {
        let lowered = tag.as_str().to_ascii_lowercase();
        if !lowered.contains(&needle_dq) && !lowered.contains(&needle_sq) {
            return None;
        }
        CONTENT_ATTR_RE.captures(tag.as_str()).and_then(|c| {
            c.get(1)
                .or_else(|| c.get(2))
                .map(|m| decode_entities(m.as_str()))
        })
    })
}

/// Cut `text` to at most `max_chars` characters, ending in "..." when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
        <title>Moon &amp; Tides</title>
        <meta name="description" content="How the moon moves water">
        <meta content='2021-04-02T10:00:00Z' property='article:published_time'>
        <style>body { color: red }</style>
        </head><body><h1>Tides</h1><script>var x = 1;</script><p>The moon pulls.</p></body></html>"#;

    #[test]
    fn text_drops_markup_scripts_and_styles() {
        let text = html_to_text(PAGE);
        assert!(text.contains("Tides"));
        assert!(text.contains("The moon pulls."));
        assert!(!text.contains("var x"));
        assert!(!text.contains("color: red"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn head_metadata_is_extracted() {
        assert_eq!(extract_title(PAGE), "Moon & Tides");
        assert_eq!(
            meta_content(PAGE, "name", "description").as_deref(),
            Some("How the moon moves water")
        );
        assert_eq!(
            meta_content(PAGE, "property", "article:published_time").as_deref(),
            Some("2021-04-02T10:00:00Z")
        );
        assert_eq!(meta_content(PAGE, "name", "keywords"), None);
    }

    #[test]
    fn truncation_is_char_based() {
        let long = "é".repeat(400);
        let cut = truncate_chars(&long, 300);
        assert_eq!(cut.chars().count(), 300);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_chars("short", 300), "short");
    }
}
