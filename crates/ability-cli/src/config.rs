//! Host configuration.
//!
//! Reads `config/default.toml`.  Every section and field has a default, so
//! a missing file, a missing section, or a partial section all work.
//! Secrets never live in the TOML: `[llm] api_key_env` names the
//! environment variable (usually set through `.env`) that holds the key.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ability_agent::LlmClientConfig;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub http: HttpConfig,
    pub abilities: AbilitiesConfig,
}

impl AppConfig {
    /// Load `path`, or the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config in {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub user: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".into(),
            user: "default".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `openai` or `anthropic`.
    pub provider: String,
    pub model: String,
    /// Overrides the provider's endpoint (OpenAI-compatible servers).
    pub base_url: Option<String>,
    pub api_key_env: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            base_url: None,
            api_key_env: "OPENAI_API_KEY".into(),
            max_tokens: 512,
            timeout_secs: 20,
        }
    }
}

impl LlmConfig {
    /// Client configuration with the key taken from `api_key`.
    pub fn client_config(&self, api_key: String) -> Result<LlmClientConfig> {
        let config = match (self.provider.to_lowercase().as_str(), &self.base_url) {
            ("openai", None) => LlmClientConfig::openai(api_key, &self.model),
            ("openai", Some(base_url)) => {
                LlmClientConfig::openai_compatible(api_key, &self.model, base_url)
            }
            ("anthropic", None) => LlmClientConfig::anthropic(api_key, &self.model),
            ("anthropic", Some(base_url)) => LlmClientConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                ..LlmClientConfig::anthropic(api_key, &self.model)
            },
            (other, _) => bail!("unknown llm provider `{other}` (expected openai or anthropic)"),
        };
        Ok(config
            .with_max_tokens(self.max_tokens)
            .with_timeout_secs(self.timeout_secs))
    }

    /// The API key from the environment, if set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Hard limit on one invocation, after which the host tears it down.
    pub timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { timeout_secs: 300 }
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: ability_adapters::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AbilitiesConfig {
    /// Directory of `<ability>/config.json` manifests overriding the
    /// built-in hotwords.
    pub dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
