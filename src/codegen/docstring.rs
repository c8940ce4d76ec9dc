//! Docstring cleanup for emitted methods
//!
//! eBay's contract descriptions carry HTML markup, entities and a handful of
//! recurring typos. The typo table is data; add rows, not branches.

use once_cell::sync::Lazy;
use regex::Regex;

/// Known typos in eBay descriptions: (wrong, right)
pub static TYPOS: &[(&str, &str)] = &[
    ("retreive", "retrieve"),
    ("recieve", "receive"),
    ("seperate", "separate"),
    ("occurence", "occurrence"),
    ("sucessful", "successful"),
    ("the the ", "the "),
    ("a an ", "an "),
];

static ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&amp;", "&"),
];

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Width of an emitted doc line, excluding the `/// ` prefix
pub const WRAP_WIDTH: usize = 88;

/// First paragraph of `raw` as one clean line
pub fn clean(raw: &str) -> String {
    let paragraph = raw.split("\n\n").next().unwrap_or("");
    let paragraph = paragraph.split("<br><br>").next().unwrap_or("");

    let mut text = TAG.replace_all(paragraph, " ").into_owned();
    for (entity, plain) in ENTITIES {
        text = text.replace(entity, plain);
    }
    text = SPACE.replace_all(&text, " ").trim().to_string();
    for (wrong, right) in TYPOS {
        text = text.replace(wrong, right);
    }

    text.replace('[', "\\[").replace(']', "\\]")
}

/// Greedy word wrap
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markup_and_entities() {
        let raw = "This call <b>retreives</b> the item&apos;s <a href=\"x\">details</a> &amp; more.";
        assert_eq!(clean(raw), "This call retrieves the item's details & more.");
    }

    #[test]
    fn test_first_paragraph_only() {
        let raw = "Summary line.\n\nLong explanation that is dropped.";
        assert_eq!(clean(raw), "Summary line.");
        assert_eq!(clean("One.<br><br>Two."), "One.");
    }

    #[test]
    fn test_escapes_brackets() {
        assert_eq!(clean("filter=price:[10..50]"), "filter=price:\\[10..50\\]");
    }

    #[test]
    fn test_wrap() {
        let lines = wrap("aa bb cc dd", 5);
        assert_eq!(lines, vec!["aa bb", "cc dd"]);
        assert!(wrap("", 10).is_empty());
    }
}
