use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

pub const TONE_LEVEL_MAX: f64 = 1.0;
pub const EMOJI_LEVEL_MAX: f64 = 3.0;

/// One "generate captions" action from the workbench.
///
/// `requested_variant_count` is non-zero by construction; a payload with `0`
/// fails to deserialize. Tone and emoji levels are clamped on read, not on write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub brief: String,
    pub target_audience: String,
    #[serde(default)]
    pub persona_voice_traits: Vec<String>,
    #[serde(default = "default_tone_level")]
    pub tone_level: f64,
    #[serde(default = "default_emoji_level")]
    pub emoji_level: f64,
    pub requested_variant_count: NonZeroU32,
}

fn default_tone_level() -> f64 {
    0.5
}

fn default_emoji_level() -> f64 {
    1.0
}

impl GenerationRequest {
    /// Tone lever clamped to `[0, 1]`.
    pub fn tone_level(&self) -> f64 {
        clamp_level(self.tone_level, TONE_LEVEL_MAX)
    }

    /// Emoji lever clamped to `[0, 3]`.
    pub fn emoji_level(&self) -> f64 {
        clamp_level(self.emoji_level, EMOJI_LEVEL_MAX)
    }

    pub fn variant_count(&self) -> usize {
        self.requested_variant_count.get() as usize
    }
}

/// NaN reads as the lower bound.
fn clamp_level(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request_with_levels(tone: f64, emoji: f64) -> GenerationRequest {
        GenerationRequest {
            brief: "Summer launch".to_string(),
            target_audience: "students".to_string(),
            persona_voice_traits: vec![],
            tone_level: tone,
            emoji_level: emoji,
            requested_variant_count: NonZeroU32::new(1).unwrap(),
        }
    }

    #[test]
    fn test_levels_are_clamped() {
        let r = request_with_levels(1.7, -2.0);
        assert_eq!(r.tone_level(), 1.0);
        assert_eq!(r.emoji_level(), 0.0);

        let r = request_with_levels(-0.1, 9.0);
        assert_eq!(r.tone_level(), 0.0);
        assert_eq!(r.emoji_level(), 3.0);
    }

    #[test]
    fn test_nan_levels_read_as_zero() {
        let r = request_with_levels(f64::NAN, f64::NAN);
        assert_eq!(r.tone_level(), 0.0);
        assert_eq!(r.emoji_level(), 0.0);
    }

    #[test]
    fn test_zero_variant_count_is_rejected() {
        let payload = json!({
            "brief": "Launch",
            "target_audience": "runners",
            "requested_variant_count": 0
        });
        assert!(serde_json::from_value::<GenerationRequest>(payload).is_err());
    }

    #[test]
    fn test_optional_fields_default() {
        let payload = json!({
            "brief": "Launch",
            "target_audience": "runners",
            "requested_variant_count": 2
        });
        let r: GenerationRequest = serde_json::from_value(payload).unwrap();
        assert!(r.persona_voice_traits.is_empty());
        assert_eq!(r.tone_level(), 0.5);
        assert_eq!(r.emoji_level(), 1.0);
        assert_eq!(r.variant_count(), 2);
    }
}
