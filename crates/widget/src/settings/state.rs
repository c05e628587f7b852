use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use pigeon_client::{ClientConfig, DEFAULT_ENDPOINT};
use pigeon_storage::{DEFAULT_GREETING_KEY, DEFAULT_HISTORY_KEY, TranscriptKeys};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

pub const DEFAULT_LANGUAGE: &str = "en-US";
pub const DEFAULT_FALLBACK_MESSAGE: &str = "Sorry, something went wrong. Please try again.";
pub const DEFAULT_PREFERRED_VOICES: [&str; 2] = [
    "Google UK English Female",
    "Microsoft Zira Desktop - English (United States)",
];

/// Static widget configuration, fixed for the lifetime of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_preferred_voices")]
    pub preferred_voices: Vec<String>,
    #[serde(default)]
    pub read_aloud: bool,
    #[serde(default = "default_history_key")]
    pub history_key: String,
    #[serde(default = "default_greeting_key")]
    pub greeting_key: String,
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            language: default_language(),
            preferred_voices: default_preferred_voices(),
            read_aloud: false,
            history_key: default_history_key(),
            greeting_key: default_greeting_key(),
            fallback_message: default_fallback_message(),
        }
    }
}

impl WidgetSettings {
    /// Layers a JSON document from the host page over the defaults.
    pub fn from_json(raw: &str) -> Result<Self, SettingsError> {
        let figment =
            Figment::from(Serialized::defaults(WidgetSettings::default())).merge(Json::string(raw));

        let settings = figment.extract::<WidgetSettings>().context(ExtractSnafu {
            stage: "extract-widget-settings",
        })?;
        Ok(settings.normalized())
    }

    /// Like [`Self::from_json`], but falls back to defaults on absent or malformed input.
    pub fn load(raw: Option<&str>) -> Self {
        let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
            tracing::info!("no widget settings supplied, using defaults");
            return Self::default();
        };

        match Self::from_json(raw) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!("failed to parse widget settings: {error}. using defaults");
                Self::default()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.endpoint = non_blank_or(self.endpoint, default_endpoint);
        self.language = non_blank_or(self.language, default_language);
        self.history_key = non_blank_or(self.history_key, default_history_key);
        self.greeting_key = non_blank_or(self.greeting_key, default_greeting_key);
        self.fallback_message = non_blank_or(self.fallback_message, default_fallback_message);
        self.preferred_voices = self
            .preferred_voices
            .into_iter()
            .map(|voice| voice.trim().to_string())
            .filter(|voice| !voice.is_empty())
            .collect();

        self
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.endpoint)
    }

    pub fn transcript_keys(&self) -> TranscriptKeys {
        TranscriptKeys::new(&self.history_key, &self.greeting_key)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            read_aloud: self.read_aloud,
            selected_voice: None,
        }
    }
}

/// Per-session mutable preferences held by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionConfig {
    pub read_aloud: bool,
    /// Voice remembered from the last successful preferred-voice lookup.
    pub selected_voice: Option<String>,
}

impl SessionConfig {
    pub fn toggle_read_aloud(&mut self) -> bool {
        self.read_aloud = !self.read_aloud;
        self.read_aloud
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to extract widget settings on `{stage}`: {source}"))]
    Extract {
        stage: &'static str,
        source: figment::Error,
    },
}

fn non_blank_or(value: String, fallback: fn() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback()
    } else {
        trimmed.to_string()
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_preferred_voices() -> Vec<String> {
    DEFAULT_PREFERRED_VOICES
        .iter()
        .map(|voice| voice.to_string())
        .collect()
}

fn default_history_key() -> String {
    DEFAULT_HISTORY_KEY.to_string()
}

fn default_greeting_key() -> String {
    DEFAULT_GREETING_KEY.to_string()
}

fn default_fallback_message() -> String {
    DEFAULT_FALLBACK_MESSAGE.to_string()
}
