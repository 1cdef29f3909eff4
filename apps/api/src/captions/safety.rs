//! Safety gate: denylist and shouting checks, independent of the quality score.
//!
//! A failed gate is not an error: the variant is still returned, flagged with
//! reasons, and the caller decides whether to filter it.

use crate::models::variant::SafetyReport;

/// Matched case-insensitively as substrings.
pub const BANNED_WORDS: &[&str] = &["spam", "scam", "fake", "clickbait"];

/// Uppercase share of all characters above which a caption reads as shouting.
pub const MAX_CAPS_RATIO: f64 = 0.3;

pub const REASON_PROBLEMATIC_WORDS: &str = "Contains potentially problematic words";
pub const REASON_EXCESSIVE_CAPS: &str = "Excessive capitalization";

pub fn check_safety(text: &str) -> SafetyReport {
    let mut reasons = Vec::new();

    let lowered = text.to_lowercase();
    if BANNED_WORDS.iter().any(|word| lowered.contains(word)) {
        reasons.push(REASON_PROBLEMATIC_WORDS.to_string());
    }

    if caps_ratio(text) > MAX_CAPS_RATIO {
        reasons.push(REASON_EXCESSIVE_CAPS.to_string());
    }

    SafetyReport {
        ok: reasons.is_empty(),
        reasons,
    }
}

/// Uppercase characters over total characters; 0 for empty text.
fn caps_ratio(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let upper = text.chars().filter(|c| c.is_uppercase()).count();
    upper as f64 / total as f64
}
