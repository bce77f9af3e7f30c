use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SolaceError};

/// Environment variable overriding `general.base_url`.
pub const ENV_BASE_URL: &str = "CHATBOT_BASE_URL";
/// Environment variable overriding `general.port`.
pub const ENV_PORT: &str = "PORT";

/// Top-level configuration for the Solace service.
///
/// Loaded from a TOML file; every section falls back to its defaults when
/// absent. `CHATBOT_BASE_URL` and `PORT` may override the file afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolaceConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub responses: ResponsesConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub journal: JournalConfig,
}

impl SolaceConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SolaceConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| SolaceError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Apply `CHATBOT_BASE_URL` and `PORT` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using an arbitrary key lookup.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            let url = url.trim();
            if url.is_empty() {
                warn!(key = ENV_BASE_URL, "Ignoring empty override");
            } else {
                self.general.base_url = url.to_string();
            }
        }
        if let Some(raw) = lookup(ENV_PORT) {
            match raw.trim().parse::<u16>() {
                Ok(port) if port != 0 => self.general.port = port,
                _ => warn!(key = ENV_PORT, value = %raw, "Ignoring invalid port override"),
            }
        }
    }
}

/// Listener and logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Address the HTTP server binds to.
    pub host: String,
    /// HTTP server port.
    pub port: u16,
    /// Full URL of the chat endpoint, used by the probe client.
    pub base_url: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            base_url: "http://127.0.0.1:8000/chat".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Rolling conversation memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Maximum number of turns kept per session.
    pub limit: usize,
    /// Minutes after which the last turn is no longer considered fresh.
    pub expiry_minutes: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            expiry_minutes: 10,
        }
    }
}

/// Canned response table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponsesConfig {
    /// CSV file with `emotion,response` columns.
    pub path: String,
    /// Fixed seed for response selection. Random when unset.
    pub seed: Option<u64>,
}

impl Default for ResponsesConfig {
    fn default() -> Self {
        Self {
            path: "data/responses.csv".to_string(),
            seed: None,
        }
    }
}

/// Web search provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    /// Provider API key. Searches fail soft while this is empty.
    pub api_key: String,
    /// Interface language.
    pub hl: String,
    /// Country.
    pub gl: String,
    /// Upper bound on a single search call.
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://serpapi.com/search".to_string(),
            api_key: String::new(),
            hl: "en".to_string(),
            gl: "us".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Emotion classifier backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierBackend {
    /// Built-in keyword lexicon, no network.
    #[default]
    Lexicon,
    /// HTTP text-classification inference endpoint.
    Remote,
}

/// Emotion classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub backend: ClassifierBackend,
    /// Inference URL for the remote backend.
    pub endpoint: String,
    /// Bearer token for the remote backend.
    pub api_token: String,
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: ClassifierBackend::Lexicon,
            endpoint: "https://api-inference.huggingface.co/models/j-hartmann/emotion-english-distilroberta-base".to_string(),
            api_token: String::new(),
            timeout_secs: 10,
        }
    }
}

/// Typo correction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub enabled: bool,
    /// Optional file of extra vocabulary words, most frequent first.
    pub vocabulary_path: Option<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            vocabulary_path: None,
        }
    }
}

/// Per-session turn log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Directory holding `{session}_memory.csv` files.
    pub dir: String,
    /// Session used when a request does not name one.
    pub default_session: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            dir: ".".to_string(),
            default_session: "default_user".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = SolaceConfig::default();
        assert_eq!(config.general.port, 8000);
        assert_eq!(config.general.base_url, "http://127.0.0.1:8000/chat");
        assert_eq!(config.memory.limit, 5);
        assert_eq!(config.memory.expiry_minutes, 10);
        assert_eq!(config.search.hl, "en");
        assert_eq!(config.search.gl, "us");
        assert_eq!(config.classifier.backend, ClassifierBackend::Lexicon);
        assert!(config.normalizer.enabled);
        assert_eq!(config.journal.default_session, "default_user");
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
port = 9001
log_level = "debug"

[memory]
limit = 3
expiry_minutes = 1

[search]
api_key = "secret"
timeout_secs = 2

[classifier]
backend = "remote"
"#;
        let file = create_temp_config(content);
        let config = SolaceConfig::load(file.path()).unwrap();
        assert_eq!(config.general.port, 9001);
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.host, "127.0.0.1");
        assert_eq!(config.memory.limit, 3);
        assert_eq!(config.search.api_key, "secret");
        assert_eq!(config.search.endpoint, "https://serpapi.com/search");
        assert_eq!(config.classifier.backend, ClassifierBackend::Remote);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = SolaceConfig::load(file.path()).unwrap();
        assert_eq!(config.memory.limit, 5);
        assert_eq!(config.responses.path, "data/responses.csv");
        assert!(config.responses.seed.is_none());
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("[memory\nlimit = ");
        let result = SolaceConfig::load(file.path());
        assert!(matches!(result, Err(SolaceError::Config(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = SolaceConfig::load_or_default(Path::new("/nonexistent/solace.toml"));
        assert_eq!(config.general.port, 8000);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("solace.toml");
        let mut config = SolaceConfig::default();
        config.memory.limit = 8;
        config.responses.seed = Some(42);
        config.save(&path).unwrap();

        let loaded = SolaceConfig::load(&path).unwrap();
        assert_eq!(loaded.memory.limit, 8);
        assert_eq!(loaded.responses.seed, Some(42));
    }

    #[test]
    fn test_env_overrides_apply() {
        let mut config = SolaceConfig::default();
        config.apply_overrides_from(lookup(&[
            (ENV_BASE_URL, "http://chat.internal:7000/chat"),
            (ENV_PORT, "7000"),
        ]));
        assert_eq!(config.general.base_url, "http://chat.internal:7000/chat");
        assert_eq!(config.general.port, 7000);
    }

    #[test]
    fn test_invalid_port_override_ignored() {
        let mut config = SolaceConfig::default();
        config.apply_overrides_from(lookup(&[(ENV_PORT, "eighty")]));
        assert_eq!(config.general.port, 8000);

        config.apply_overrides_from(lookup(&[(ENV_PORT, "0")]));
        assert_eq!(config.general.port, 8000);
    }

    #[test]
    fn test_blank_base_url_override_ignored() {
        let mut config = SolaceConfig::default();
        config.apply_overrides_from(lookup(&[(ENV_BASE_URL, "   ")]));
        assert_eq!(config.general.base_url, "http://127.0.0.1:8000/chat");
    }

    #[test]
    fn test_no_overrides_leaves_config_untouched() {
        let mut config = SolaceConfig::default();
        config.apply_overrides_from(|_| None);
        assert_eq!(config.general.port, 8000);
    }

    #[test]
    fn test_example_config_parses() {
        let example = include_str!("../../../solace.example.toml");
        let config: SolaceConfig = toml::from_str(example).unwrap();
        assert_eq!(config.general.port, 8000);
        assert_eq!(config.classifier.backend, ClassifierBackend::Lexicon);
        assert_eq!(config.journal.default_session, "default_user");
        assert!(config.responses.seed.is_none());
    }
}
