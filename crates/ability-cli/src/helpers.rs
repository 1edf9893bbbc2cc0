//! Startup plumbing: tracing, the text model, storage, and the host.

use std::sync::Arc;
use std::time::Duration;

use ability_adapters::{HttpFetcher, WeatherClient};
use ability_agent::{AgentError, LlmClient, Message, TextModel};
use ability_skills::{AbilityHost, HostSettings, builtin_abilities, load_manifests_from_dir};
use ability_store::{Database, FileStorage, LocalFileStorage, MemoryStorage, SqliteStorage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, StorageBackend};

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Install the global subscriber.  `RUST_LOG` wins over `default_level`.
/// Logs go to stderr; stdout carries the conversation.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Text model
// ---------------------------------------------------------------------------

/// Stands in when no API key is configured.  Every call fails, so each
/// ability takes its no-model fallback path.
struct Unconfigured {
    provider: String,
}

#[async_trait]
impl TextModel for Unconfigured {
    async fn generate(
        &self,
        _prompt: &str,
        _history: &[Message],
        _system_prompt: Option<&str>,
    ) -> ability_agent::Result<String> {
        Err(AgentError::MissingApiKey {
            provider: self.provider.clone(),
        })
    }
}

pub fn build_model(config: &AppConfig) -> Result<Arc<dyn TextModel>> {
    let Some(api_key) = config.llm.api_key() else {
        warn!(
            env = %config.llm.api_key_env,
            "no API key set, abilities will run without a language model"
        );
        return Ok(Arc::new(Unconfigured {
            provider: config.llm.provider.clone(),
        }));
    };

    let client = LlmClient::new(config.llm.client_config(api_key)?)
        .context("failed to build LLM client")?;
    info!(provider = %config.llm.provider, model = %config.llm.model, "language model ready");
    Ok(Arc::new(client))
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

pub async fn build_storage(config: &AppConfig, user: &str) -> Result<Arc<dyn FileStorage>> {
    let data_dir = &config.storage.data_dir;
    let storage: Arc<dyn FileStorage> = match config.storage.backend {
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        StorageBackend::File => {
            Arc::new(LocalFileStorage::new(data_dir, user).context("invalid user name")?)
        }
        StorageBackend::Sqlite => {
            tokio::fs::create_dir_all(data_dir)
                .await
                .with_context(|| format!("failed to create {}", data_dir.display()))?;
            let db = Database::open_and_migrate(data_dir.join("abilities.db"))
                .await
                .context("failed to open database")?;
            Arc::new(SqliteStorage::new(db, user).context("invalid user name")?)
        }
    };
    info!(backend = ?config.storage.backend, user, "storage ready");
    Ok(storage)
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// A host with every built-in ability registered and manifest overrides
/// from `[abilities] dir` applied.
pub fn build_host(
    config: &AppConfig,
    model: Arc<dyn TextModel>,
    storage: Arc<dyn FileStorage>,
) -> Result<AbilityHost> {
    let fetcher = HttpFetcher::new(
        &config.http.user_agent,
        Duration::from_secs(config.http.timeout_secs.max(1)),
    )
    .context("failed to build HTTP client")?;

    let mut host = AbilityHost::new(model, storage).with_settings(HostSettings {
        session_timeout: config.session.timeout(),
    });
    for ability in builtin_abilities(WeatherClient::new(fetcher)) {
        host.register(ability)?;
    }

    if let Some(dir) = &config.abilities.dir {
        let manifests = load_manifests_from_dir(dir)
            .with_context(|| format!("failed to read manifests from {}", dir.display()))?;
        let applied = host.apply_manifests(&manifests)?;
        info!(dir = %dir.display(), applied, "manifest overrides applied");
    }
    Ok(host)
}
