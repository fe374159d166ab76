//! routerchat configuration loader.
//!
//! Values come from an optional TOML file, then environment overrides, then
//! CLI flags (applied by the caller).

use rc_llm::{DEFAULT_HISTORY_CAPACITY, Provider, ProviderConfig, ProviderSet};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouterChatConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_provider")]
    pub provider: Provider,
    /// Overrides the active provider's default model.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_provider() -> Provider {
    Provider::OpenRouter
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            history_capacity: default_history_capacity(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct KeysConfig {
    pub openrouter_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
}

impl KeysConfig {
    pub fn get(&self, provider: Provider) -> Option<&str> {
        let key = match provider {
            Provider::OpenRouter => &self.openrouter_api_key,
            Provider::OpenAI => &self.openai_api_key,
            Provider::Anthropic => &self.anthropic_api_key,
        };
        key.as_deref().filter(|k| !k.trim().is_empty())
    }

    fn set(&mut self, provider: Provider, key: String) {
        let slot = match provider {
            Provider::OpenRouter => &mut self.openrouter_api_key,
            Provider::OpenAI => &mut self.openai_api_key,
            Provider::Anthropic => &mut self.anthropic_api_key,
        };
        *slot = Some(key);
    }
}

impl fmt::Debug for KeysConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("KeysConfig");
        for provider in Provider::ALL {
            s.field(provider.as_str(), &self.get(provider).map(|_| "<set>"));
        }
        s.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openrouter: ProviderEndpointConfig,
    #[serde(default)]
    pub openai: ProviderEndpointConfig,
    #[serde(default)]
    pub anthropic: ProviderEndpointConfig,
}

impl ProvidersConfig {
    pub fn get(&self, provider: Provider) -> &ProviderEndpointConfig {
        match provider {
            Provider::OpenRouter => &self.openrouter,
            Provider::OpenAI => &self.openai,
            Provider::Anthropic => &self.anthropic,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderEndpointConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderConfig {
    /// Shell command that receives each reply on stdin, e.g. `glow -`.
    #[serde(default)]
    pub command: Option<String>,
}

impl RouterChatConfig {
    /// Loads `path`, or the default location when `None`. Only an explicitly
    /// requested file has to exist.
    pub async fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let explicit = path.is_some();
        let path = path.unwrap_or_else(default_config_path);

        let mut cfg = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Self::from_toml(&contents)
                .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                Self::default()
            }
            Err(e) => return Err(anyhow::anyhow!("read config {}: {e}", path.display())),
        };

        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        for provider in Provider::ALL {
            if let Some(key) = lookup(provider.api_key_env()) {
                self.keys.set(provider, key);
            }
        }
        if let Some(v) = lookup("ROUTERCHAT_PROVIDER") {
            match v.parse::<Provider>() {
                Ok(provider) => self.general.provider = provider,
                Err(e) => tracing::warn!(%e, "ignoring ROUTERCHAT_PROVIDER"),
            }
        }
        if let Some(v) = lookup("ROUTERCHAT_MODEL") {
            self.general.model = Some(v);
        }
        if let Some(v) = lookup("ROUTERCHAT_RENDER_COMMAND") {
            self.render.command = Some(v);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.general.history_capacity == 0 {
            return Err(anyhow::anyhow!("general.history_capacity must be > 0"));
        }
        if self.general.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("general.request_timeout_secs must be > 0"));
        }
        for provider in Provider::ALL {
            if let Some(url) = self.providers.get(provider).base_url.as_deref() {
                if url.trim().is_empty() {
                    return Err(anyhow::anyhow!(
                        "providers.{provider}.base_url must not be empty"
                    ));
                }
            }
        }
        Ok(())
    }

    /// The chat loop needs at least one usable provider.
    pub fn ensure_any_key(&self) -> anyhow::Result<()> {
        if self.provider_set().with_keys().next().is_some() {
            return Ok(());
        }
        Err(anyhow::anyhow!(
            "no API key configured; set one of OPENROUTER_API_KEY, OPENAI_API_KEY, ANTHROPIC_API_KEY"
        ))
    }

    pub fn provider_set(&self) -> ProviderSet {
        Provider::ALL
            .into_iter()
            .fold(ProviderSet::default(), |set, provider| {
                let endpoint = self.providers.get(provider);
                let mut cfg =
                    ProviderConfig::new(provider, self.keys.get(provider).map(str::to_string));
                if let Some(url) = endpoint.base_url.as_deref() {
                    cfg = cfg.with_base_url(url.trim());
                }
                if let Some(model) = endpoint.default_model.as_deref() {
                    if !model.trim().is_empty() {
                        cfg = cfg.with_default_model(model.trim());
                    }
                }
                set.with(cfg)
            })
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.general.request_timeout_secs)
    }
}

pub fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".routerchat").join("config.toml")
}
