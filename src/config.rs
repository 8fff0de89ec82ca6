//! Persistent client settings.
//!
//! Settings live in a JSON file. Keys missing from the file take their
//! default values, so files written by older versions keep loading.

use crate::client::DEFAULT_URL;
use crate::error::Result;
use crate::session::PacingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Base URL of the Ollama server.
    pub ollama_url: String,
    /// System prompt sent with every request. Empty means none.
    pub system_prompt: String,
    /// Model used most recently. Empty means none.
    pub last_model: String,
    /// Typewriter pacing.
    pub pacing: PacingConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_URL.to_string(),
            system_prompt: String::new(),
            last_model: String::new(),
            pacing: PacingConfig::default(),
        }
    }
}

impl ChatConfig {
    /// Load settings from `path`.
    ///
    /// A missing or unreadable file yields the defaults; a malformed one is
    /// logged and also yields the defaults.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                debug!(path = %path.display(), %err, "no config file, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(config) => config.normalized(),
            Err(err) => {
                warn!(path = %path.display(), %err, "malformed config, using defaults");
                Self::default()
            }
        }
    }

    /// Save settings to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_pretty_json(path, &self.clone().normalized())
    }

    /// `<config dir>/chatwheel/config.json`, falling back to the working
    /// directory when the platform has no config dir.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("chatwheel"))
            .unwrap_or_default()
            .join("config.json")
    }

    /// The system prompt, if one is set.
    pub fn system_prompt(&self) -> Option<&str> {
        non_blank(&self.system_prompt)
    }

    /// The last used model, if any.
    pub fn last_model(&self) -> Option<&str> {
        non_blank(&self.last_model)
    }

    fn normalized(mut self) -> Self {
        self.ollama_url = self.ollama_url.trim().trim_end_matches('/').to_string();
        if self.ollama_url.is_empty() {
            self.ollama_url = DEFAULT_URL.to_string();
        }
        if self.system_prompt.trim().is_empty() {
            self.system_prompt.clear();
        }
        self.last_model = self.last_model.trim().to_string();
        self
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// Write `value` as JSON indented by four spaces.
pub(crate) fn write_pretty_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    out.push(b'\n');
    std::fs::write(path, out)?;
    Ok(())
}
