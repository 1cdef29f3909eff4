// Shared prompt fragments.
// Each pipeline that needs LLM calls defines its own prompts.rs alongside it;
// this file holds the pieces every caption prompt must carry.

/// Opening line of every caption prompt.
pub const BRAND_SAFETY_PREAMBLE: &str =
    "You are a brand-safe social media copywriter for D2C brands.";

/// House rules appended to every caption prompt.
pub const CAPTION_GUIDELINES: &str = "\
Guidelines:
- Avoid spam, clickbait, and prohibited or unverifiable claims
- Keep the caption under 180 characters
- Include 3-5 relevant hashtags
- Keep the tone brand-safe";

/// Output contract for the user turn.
pub const CAPTION_OUTPUT_INSTRUCTION: &str =
    "Return only the caption text with hashtags. No preamble, no quotes, no explanations.";
