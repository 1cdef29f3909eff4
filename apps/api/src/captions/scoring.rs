//! Caption scoring: pluggable, trait-based quality heuristic used to rank variants.
//!
//! Default: `HeuristicScorer` (pure, deterministic, no provider call).
//! `AppState` carries an `Arc<dyn CaptionScorer>` so a learned scorer can replace it later.
//!
//! Signals are evaluated in a fixed order (length, hashtag count, keyword overlap).
//! Order only affects the reasons list; contributions are summed onto a base of 50
//! and the total is clamped to `[0, 100]`.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use serde::Serialize;

use crate::captions::parser::count_hashtags;

pub const BASE_SCORE: i64 = 50;
pub const OPTIMAL_LENGTH: RangeInclusive<usize> = 120..=180;
pub const GOOD_HASHTAG_COUNT: RangeInclusive<usize> = 3..=5;
pub const POINTS_PER_KEYWORD_MATCH: i64 = 5;

pub const REASON_OPTIMAL_LENGTH: &str = "Optimal length";
pub const REASON_GOOD_HASHTAG_COUNT: &str = "Good hashtag count";
pub const REASON_BRAND_RELEVANT: &str = "Brand relevant";

/// What a scorer looks at. `target_audience` is part of the contract even though
/// the heuristic draws no signal from it.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    pub text: &'a str,
    pub brief: &'a str,
    #[allow(dead_code)]
    pub target_audience: &'a str,
}

/// One measured property of a caption and its contribution to the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum ScoreSignal {
    Length { chars: usize },
    HashtagCount { count: usize },
    KeywordOverlap { matches: usize },
}

impl ScoreSignal {
    pub fn delta(&self) -> i64 {
        match *self {
            ScoreSignal::Length { chars } => {
                if OPTIMAL_LENGTH.contains(&chars) {
                    20
                } else if chars < *OPTIMAL_LENGTH.start() {
                    -10
                } else {
                    -15
                }
            }
            ScoreSignal::HashtagCount { count } => {
                if GOOD_HASHTAG_COUNT.contains(&count) {
                    15
                } else if count < *GOOD_HASHTAG_COUNT.start() {
                    -10
                } else {
                    -5
                }
            }
            ScoreSignal::KeywordOverlap { matches } => i64::try_from(matches)
                .unwrap_or(i64::MAX)
                .saturating_mul(POINTS_PER_KEYWORD_MATCH),
        }
    }

    /// Only positive outcomes explain themselves.
    pub fn reason(&self) -> Option<&'static str> {
        match *self {
            ScoreSignal::Length { chars } if OPTIMAL_LENGTH.contains(&chars) => {
                Some(REASON_OPTIMAL_LENGTH)
            }
            ScoreSignal::HashtagCount { count } if GOOD_HASHTAG_COUNT.contains(&count) => {
                Some(REASON_GOOD_HASHTAG_COUNT)
            }
            ScoreSignal::KeywordOverlap { matches } if matches > 0 => Some(REASON_BRAND_RELEVANT),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub score: u8,
    pub reasons: Vec<String>,
    pub signals: Vec<ScoreSignal>,
}

/// The caption scorer trait. Implement this to swap ranking strategies without
/// touching the orchestrator or handlers.
pub trait CaptionScorer: Send + Sync {
    fn score(&self, input: &ScoreInput<'_>) -> ScoreBreakdown;

    /// Short label for logs, e.g. "heuristic".
    fn backend(&self) -> &'static str;
}

/// Length / hashtag / keyword-overlap heuristic.
pub struct HeuristicScorer;

impl CaptionScorer for HeuristicScorer {
    fn score(&self, input: &ScoreInput<'_>) -> ScoreBreakdown {
        let signals = vec![
            ScoreSignal::Length {
                chars: input.text.chars().count(),
            },
            ScoreSignal::HashtagCount {
                count: count_hashtags(input.text),
            },
            ScoreSignal::KeywordOverlap {
                matches: keyword_matches(input.text, input.brief),
            },
        ];

        let total = signals
            .iter()
            .fold(BASE_SCORE, |acc, signal| acc.saturating_add(signal.delta()));

        let reasons = signals
            .iter()
            .filter_map(ScoreSignal::reason)
            .map(String::from)
            .collect();

        ScoreBreakdown {
            score: total.clamp(0, 100) as u8,
            reasons,
            signals,
        }
    }

    fn backend(&self) -> &'static str {
        "heuristic"
    }
}

/// Scores `text` with the default heuristic.
#[allow(dead_code)]
pub fn score_caption(text: &str, brief: &str, target_audience: &str) -> ScoreBreakdown {
    HeuristicScorer.score(&ScoreInput {
        text,
        brief,
        target_audience,
    })
}

/// Counts brief words (lowercased, whitespace-split) present in the text's word set.
/// A brief word repeated N times counts N times.
fn keyword_matches(text: &str, brief: &str) -> usize {
    let text_words: HashSet<String> = text.split_whitespace().map(str::to_lowercase).collect();

    brief
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|word| text_words.contains(word))
        .count()
}
