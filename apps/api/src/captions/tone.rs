//! Tone and emoji levers: map the workbench sliders onto prompt directives.
//!
//! Each table is scanned in order; a level below an entry's bound takes that
//! entry's label, and anything past the last bound takes the fallback.

/// Voice register requested through the tone slider (`0.0..=1.0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneLevel {
    Formal,
    Conversational,
    Playful,
}

const TONE_THRESHOLDS: &[(f64, ToneLevel)] = &[
    (0.3, ToneLevel::Formal),
    (0.7, ToneLevel::Conversational),
];

impl ToneLevel {
    pub fn from_level(level: f64) -> Self {
        TONE_THRESHOLDS
            .iter()
            .find(|(bound, _)| level < *bound)
            .map(|(_, tone)| *tone)
            .unwrap_or(ToneLevel::Playful)
    }

    pub fn label(self) -> &'static str {
        match self {
            ToneLevel::Formal => "formal",
            ToneLevel::Conversational => "conversational",
            ToneLevel::Playful => "playful",
        }
    }
}

/// Emoji density requested through the emoji slider (`0.0..=3.0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmojiLevel {
    None,
    Minimal,
    Moderate,
}

const EMOJI_THRESHOLDS: &[(f64, EmojiLevel)] = &[
    (1.0, EmojiLevel::None),
    (2.0, EmojiLevel::Minimal),
];

impl EmojiLevel {
    pub fn from_level(level: f64) -> Self {
        EMOJI_THRESHOLDS
            .iter()
            .find(|(bound, _)| level < *bound)
            .map(|(_, emoji)| *emoji)
            .unwrap_or(EmojiLevel::Moderate)
    }

    pub fn label(self) -> &'static str {
        match self {
            EmojiLevel::None => "no emojis",
            EmojiLevel::Minimal => "minimal emojis",
            EmojiLevel::Moderate => "moderate emojis",
        }
    }
}
