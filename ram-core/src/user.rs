//! User profile: persona, language and the interaction history.

use serde::{Deserialize, Serialize};

use crate::history::Interaction;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
    Pt,
    Ru,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Pt => "pt",
            Language::Ru => "ru",
        }
    }

    /// Instruction appended to every model prompt.
    pub fn instruction(&self) -> &'static str {
        match self {
            Language::Es => "IMPORTANT: Respond ONLY in Spanish (Español).",
            Language::Pt => "IMPORTANT: Respond ONLY in Portuguese (Português).",
            Language::Ru => "IMPORTANT: Respond ONLY in Russian (Русский).",
            Language::En => "IMPORTANT: Respond in English.",
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "es" | "spanish" => Ok(Language::Es),
            "pt" | "portuguese" => Ok(Language::Pt),
            "ru" | "russian" => Ok(Language::Ru),
            other => Err(format!("unsupported language '{other}' (expected en|es|pt|ru)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    /// Archetype name, e.g. "The Dopamine Hunter".
    #[serde(rename = "type")]
    pub archetype: String,
    pub description: String,
    pub power_trait: String,
    pub kryptonite: String,
}

impl Persona {
    pub fn fallback() -> Self {
        Self {
            archetype: "The Mystery Brain".to_string(),
            description: "You defy classification, and that is your power.".to_string(),
            power_trait: "Enigma".to_string(),
            kryptonite: "Forms".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    #[serde(default)]
    pub has_onboarded: bool,
    pub name: String,
    /// Absent on records written before localization existed.
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub persona: Option<Persona>,
    /// 0-100, shown on the share card.
    #[serde(default)]
    pub chaos_level: u8,
    /// Most-recent-first; absent on records written before sequencing existed.
    #[serde(default)]
    pub history: Vec<Interaction>,
}

impl UserState {
    /// Placeholder profile for history written before onboarding finished.
    pub fn anonymous() -> Self {
        Self {
            has_onboarded: false,
            name: "Space Cadet".to_string(),
            language: Language::En,
            persona: None,
            chaos_level: 0,
            history: Vec::new(),
        }
    }

    pub fn new(name: impl Into<String>, language: Language, persona: Persona, chaos_level: u8) -> Self {
        Self {
            has_onboarded: true,
            name: name.into(),
            language,
            persona: Some(persona),
            chaos_level: chaos_level.min(100),
            history: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_user_without_history_or_language_loads() {
        let json = r#"{"hasOnboarded": true, "name": "Sam", "persona": null, "chaosLevel": 42}"#;
        let user: UserState = serde_json::from_str(json).unwrap();
        assert_eq!(user.language, Language::En);
        assert!(user.history.is_empty());
        assert_eq!(user.chaos_level, 42);
    }

    #[test]
    fn persona_uses_type_key() {
        let json = serde_json::to_string(&Persona::fallback()).unwrap();
        assert!(json.contains("\"type\":\"The Mystery Brain\""));
        assert!(json.contains("\"powerTrait\":\"Enigma\""));
    }

    #[test]
    fn chaos_level_is_clamped() {
        let u = UserState::new("x", Language::Pt, Persona::fallback(), 250);
        assert_eq!(u.chaos_level, 100);
        assert!(u.has_onboarded);
    }
}
