//! Client configuration
//!
//! Defaults, overlaid by an optional TOML file, overlaid by environment
//! variables. The CLI applies its own overrides last.

use crate::{MurmurError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "murmur.toml";

const ENV_BASE_URL: &str = "MURMUR_BASE_URL";
const ENV_LOCALE: &str = "MURMUR_LOCALE";

/// How replies to overlapping sends are rendered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseOrdering {
    /// Render every reply in the order it arrives
    #[default]
    Completion,
    /// Drop a reply if a later-issued send has already been rendered
    Latest,
}

/// Configuration for the chat client
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root URL of the chat service
    pub base_url: String,

    /// Locale handed to the speech recognizer
    pub speech_locale: String,

    /// Whether to create a speech recognizer at all
    pub enable_voice: bool,

    /// Whether to play `audio_url` attachments
    pub enable_audio_playback: bool,

    /// Whether starting a new session asks for confirmation first
    pub confirm_new_session: bool,

    /// Rendering order for overlapping replies
    pub ordering: ResponseOrdering,

    /// Whisper model used by the local recognizer
    pub whisper_model: PathBuf,

    /// Upper bound for a single capture session in seconds
    pub max_listen_secs: f32,

    /// Trailing silence (seconds) that ends a capture session
    pub silence_secs: f32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            speech_locale: "en-US".to_string(),
            enable_voice: true,
            enable_audio_playback: true,
            confirm_new_session: true,
            ordering: ResponseOrdering::Completion,
            whisper_model: PathBuf::from("models/ggml-base.en.bin"),
            max_listen_secs: 10.0,
            silence_secs: 1.2,
        }
    }
}

impl ClientConfig {
    /// Create a configuration pointing at the given service
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults; a file that exists but does not
    /// parse is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Config file {} not found; using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        Self::from_toml(&content).map_err(|e| match e {
            MurmurError::Config(msg) => {
                MurmurError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| MurmurError::Config(e.to_string()))
    }

    /// Apply `MURMUR_*` environment overrides
    pub fn apply_env(self) -> Self {
        self.apply_overrides(std::env::var(ENV_BASE_URL).ok(), std::env::var(ENV_LOCALE).ok())
    }

    fn apply_overrides(mut self, base_url: Option<String>, locale: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|v| !v.trim().is_empty()) {
            info!("Using base URL from {}", ENV_BASE_URL);
            self.base_url = url;
        }
        if let Some(locale) = locale.filter(|v| !v.trim().is_empty()) {
            self.speech_locale = locale;
        }
        self
    }

    /// Set the service root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the recognizer locale
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.speech_locale = locale.into();
        self
    }

    /// Set the reply ordering policy
    pub fn with_ordering(mut self, ordering: ResponseOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Skip the new-session confirmation prompt
    pub fn without_confirmation(mut self) -> Self {
        self.confirm_new_session = false;
        self
    }

    /// Disable voice input
    pub fn without_voice(mut self) -> Self {
        self.enable_voice = false;
        self
    }

    /// Disable audio playback of replies
    pub fn without_audio_playback(mut self) -> Self {
        self.enable_audio_playback = false;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            MurmurError::Config(format!("Invalid base_url {:?}: {}", self.base_url, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(MurmurError::Config(format!(
                "base_url must be http or https, got {}",
                url.scheme()
            )));
        }

        if self.speech_locale.trim().is_empty() {
            return Err(MurmurError::Config("speech_locale must not be empty".into()));
        }

        if self.max_listen_secs <= 0.0 || self.silence_secs <= 0.0 {
            return Err(MurmurError::Config(
                "max_listen_secs and silence_secs must be positive".into(),
            ));
        }

        if self.silence_secs >= self.max_listen_secs {
            warn!(
                "silence_secs ({}) >= max_listen_secs ({}); captures will always run to the cap",
                self.silence_secs, self.max_listen_secs
            );
        }

        Ok(())
    }
}
