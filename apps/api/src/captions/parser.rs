//! Response Parser: splits raw model output into caption body and hashtags.
//!
//! Never fails: output with no hashtags is a caption with an empty tag list.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// `#` followed by one or more word characters. Shared with the scorer.
static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\w+").expect("valid hashtag regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedCaption {
    pub caption: String,
    pub hashtags: Vec<String>,
}

/// All hashtags in `text`, left to right, duplicates kept.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    HASHTAG_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn count_hashtags(text: &str) -> usize {
    HASHTAG_RE.find_iter(text).count()
}

/// Removes every hashtag from `raw`, then normalizes whitespace: runs of spaces
/// and tabs collapse to one space, each line is trimmed, and the result is
/// trimmed. Line breaks survive; punctuation next to a removed tag is kept.
pub fn parse_response(raw: &str) -> ParsedCaption {
    let hashtags = extract_hashtags(raw);
    let stripped = HASHTAG_RE.replace_all(raw, "");

    let caption = stripped
        .lines()
        .map(collapse_spaces)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    ParsedCaption { caption, hashtags }
}

fn collapse_spaces(line: &str) -> String {
    line.split([' ', '\t'])
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
