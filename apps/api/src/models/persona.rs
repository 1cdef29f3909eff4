use serde::{Deserialize, Serialize};

/// Voice profile supplied by the caller's persona store. Steers generation only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaVoiceProfile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub voice_traits: Vec<String>,
}
