//! Prompt Builder: turns a workbench request into the single prompt string sent to Gemini.
//!
//! Layout: system block (preamble, persona, tone, emoji), house guidelines, user turn.
//! Pure and infallible; empty optional fields simply drop their line.

use crate::captions::tone::{EmojiLevel, ToneLevel};
use crate::llm_client::prompts::{
    BRAND_SAFETY_PREAMBLE, CAPTION_GUIDELINES, CAPTION_OUTPUT_INSTRUCTION,
};
use crate::models::persona::PersonaVoiceProfile;
use crate::models::request::GenerationRequest;

pub fn build_prompt(request: &GenerationRequest, persona: Option<&PersonaVoiceProfile>) -> String {
    let mut system = vec![BRAND_SAFETY_PREAMBLE.to_string()];

    if let Some(name) = persona
        .and_then(|p| p.display_name.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        system.push(format!("Write in the voice of the persona \"{name}\"."));
    }

    let traits = voice_traits(request, persona);
    if !traits.is_empty() {
        system.push(format!("Voice traits: {}.", traits.join(", ")));
    }

    system.push(format!(
        "Tone: {}.",
        ToneLevel::from_level(request.tone_level()).label()
    ));
    system.push(format!(
        "Emoji usage: {}.",
        EmojiLevel::from_level(request.emoji_level()).label()
    ));

    let user = format!(
        "Brief: {}\nTarget audience: {}\n\n{}",
        request.brief, request.target_audience, CAPTION_OUTPUT_INSTRUCTION
    );

    format!("{}\n\n{}\n\n{}", system.join("\n"), CAPTION_GUIDELINES, user)
}

/// Request traits win when present; otherwise the persona profile's traits apply.
fn voice_traits<'a>(
    request: &'a GenerationRequest,
    persona: Option<&'a PersonaVoiceProfile>,
) -> Vec<&'a str> {
    let from_request = non_blank(&request.persona_voice_traits);
    if !from_request.is_empty() {
        return from_request;
    }
    persona
        .map(|p| non_blank(&p.voice_traits))
        .unwrap_or_default()
}

fn non_blank(traits: &[String]) -> Vec<&str> {
    traits
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect()
}
