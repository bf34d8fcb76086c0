//! Plain-text fallback for HTML bodies

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static INVISIBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(head|style|script|title)\b[^>]*>.*?</(head|style|script|title)\s*>")
        .unwrap()
});
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(?:b|strong)\b[^>]*>(.*?)</(?:b|strong)\s*>").unwrap());
static ITALIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(?:i|em)\b[^>]*>(.*?)</(?:i|em)\s*>").unwrap());
static LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#).unwrap()
});
static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h[1-6]\b[^>]*>(.*?)</h[1-6]\s*>").unwrap());
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<li\b[^>]*>").unwrap());
static BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(?:p|div|ul|ol|table|tr|blockquote|section|article|header|footer)\b[^>]*>|<hr\s*/?>")
        .unwrap()
});
static CELL_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</t[dh]\s*>").unwrap());
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]+)|([0-9]+));").unwrap());
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Convert an HTML document into a readable plain-text approximation
///
/// Bold becomes `**text**`, italics `_text_`, links `text (url)`, list items
/// `* item`; block elements are separated by blank lines and all remaining
/// markup is dropped.
///
/// ```
/// use curled_mail::templates::html_to_text;
///
/// assert_eq!(html_to_text("<b>Ada</b>"), "**Ada**");
/// ```
pub fn html_to_text(html: &str) -> String {
    let text = COMMENT.replace_all(html, "");
    let text = INVISIBLE.replace_all(&text, "");
    let text = WHITESPACE.replace_all(&text, " ");

    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = BOLD.replace_all(&text, "**$1**");
    let text = ITALIC.replace_all(&text, "_${1}_");
    let text = LINK.replace_all(&text, |caps: &Captures| {
        let href = &caps[1];
        let label = TAG.replace_all(&caps[2], "");
        let label = label.trim();

        if label.is_empty() || label == href || href.starts_with('#') {
            if label.is_empty() {
                href.to_string()
            } else {
                label.to_string()
            }
        } else {
            format!("{} ({})", label, href.trim_start_matches("mailto:"))
        }
    });
    let text = HEADING.replace_all(&text, "\n\n$1\n\n");
    let text = LIST_ITEM.replace_all(&text, "\n* ");
    let text = BLOCK.replace_all(&text, "\n\n");
    let text = CELL_END.replace_all(&text, " ");
    let text = TAG.replace_all(&text, "");

    let text = decode_entities(&text);

    let lines: Vec<&str> = text.split('\n').map(str::trim).collect();
    let text = lines.join("\n");

    BLANK_LINES.replace_all(&text, "\n\n").trim().to_string()
}

/// Decode the character references commonly found in mail bodies
fn decode_entities(text: &str) -> String {
    let text = NUMERIC_ENTITY.replace_all(text, |caps: &Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse().ok(),
            (None, None) => None,
        };

        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    // &amp; last so that "&amp;lt;" stays "&lt;"
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&copy;", "\u{a9}")
        .replace("&amp;", "&")
}
