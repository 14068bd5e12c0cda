use std::env;
use std::fs;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    /// Public base URL (ngrok or deployed host), used for the greeting clip.
    pub public_url: String,
    /// WebSocket URL Twilio should connect its media stream to.
    pub stream_url: String,
    pub business_info_path: String,
    pub llm_provider: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub ollama_url: String,
    pub whisper_url: String,
    pub elevenlabs_api_key: String,
    pub elevenlabs_voice_id: String,
    pub calendar_url: String,
    pub twilio_auth_token: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            public_url: env::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            stream_url: env::var("STREAM_URL")
                .unwrap_or_else(|_| "ws://localhost:3000/media".to_string()),
            business_info_path: env::var("BUSINESS_INFO_PATH")
                .unwrap_or_else(|_| "data/info.json".to_string()),
            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            whisper_url: env::var("WHISPER_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            elevenlabs_api_key: env::var("ELEVENLABS_API_KEY").unwrap_or_default(),
            elevenlabs_voice_id: env::var("ELEVENLABS_VOICE_ID").unwrap_or_default(),
            calendar_url: env::var("CALENDAR_URL")
                .unwrap_or_else(|_| "http://localhost:4000".to_string()),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
        }
    }
}

/// Read-only business profile loaded once at startup and injected into every
/// session; the oracle prompt and the scheduling resolver both draw on it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub name: String,
    /// Bookable staff. The resolver works over the first two entries; the
    /// first is the default when the caller has no preference.
    pub staff: Vec<String>,
    #[serde(default)]
    pub pricing: Vec<PriceOption>,
    #[serde(default)]
    pub fallback_responses: Vec<String>,
    /// Greeting clip path under the public URL, played before the stream
    /// connects.
    #[serde(default = "default_greeting_clip")]
    pub greeting_clip: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceOption {
    pub duration_minutes: i64,
    pub price: String,
}

fn default_greeting_clip() -> String {
    "audio/greeting.mp3".to_string()
}

impl BusinessProfile {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read business profile {path}: {e}"))?;
        let profile: BusinessProfile = serde_json::from_str(&raw)?;
        anyhow::ensure!(
            profile.staff.len() >= 2,
            "business profile must list at least two staff members"
        );
        Ok(profile)
    }

    pub fn fallback_response(&self) -> &str {
        self.fallback_responses
            .first()
            .map(String::as_str)
            .unwrap_or("I'm sorry, I didn't catch that. Could you say it again?")
    }

    /// Resolve (preferred, alternate) from the caller's staff preference.
    /// "Any" or an unrecognized name falls back to the first staff member.
    pub fn staff_pair(&self, preference: &str) -> (String, String) {
        let first = self.staff[0].clone();
        let second = self.staff[1].clone();

        let preferred = if preference.eq_ignore_ascii_case("any") {
            first.clone()
        } else {
            self.staff
                .iter()
                .take(2)
                .find(|s| s.eq_ignore_ascii_case(preference))
                .cloned()
                .unwrap_or_else(|| first.clone())
        };

        let alternate = if preferred == first { second } else { first };
        (preferred, alternate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> BusinessProfile {
        BusinessProfile {
            name: "Senthein Massage".to_string(),
            staff: vec!["Angie".to_string(), "Bell".to_string()],
            pricing: vec![],
            fallback_responses: vec!["Sorry, could you repeat that?".to_string()],
            greeting_clip: default_greeting_clip(),
        }
    }

    #[test]
    fn test_staff_pair_any_defaults_to_first() {
        let (preferred, alternate) = profile().staff_pair("Any");
        assert_eq!(preferred, "Angie");
        assert_eq!(alternate, "Bell");
    }

    #[test]
    fn test_staff_pair_named() {
        let (preferred, alternate) = profile().staff_pair("bell");
        assert_eq!(preferred, "Bell");
        assert_eq!(alternate, "Angie");
    }

    #[test]
    fn test_staff_pair_unknown_name() {
        let (preferred, alternate) = profile().staff_pair("Chris");
        assert_eq!(preferred, "Angie");
        assert_eq!(alternate, "Bell");
    }

    #[test]
    fn test_fallback_response_default() {
        let mut p = profile();
        p.fallback_responses.clear();
        assert!(p.fallback_response().contains("didn't catch"));
    }
}
