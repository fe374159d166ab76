use crate::error::LlmError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry of the conversation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenRouter,
    OpenAI,
    Anthropic,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenRouter, Provider::OpenAI, Provider::Anthropic];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenRouter => "openrouter",
            Provider::OpenAI => "openai",
            Provider::Anthropic => "anthropic",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Anthropic => "https://api.anthropic.com/v1",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenRouter => "openai/gpt-oss-20b:free",
            Provider::OpenAI => "chatgpt-4o-latest",
            Provider::Anthropic => "claude-3-5-sonnet-latest",
        }
    }

    pub fn auth_scheme(self) -> AuthScheme {
        match self {
            Provider::OpenRouter | Provider::OpenAI => AuthScheme::Bearer,
            Provider::Anthropic => AuthScheme::AnthropicKey,
        }
    }

    /// Environment variable conventionally holding this provider's key.
    pub fn api_key_env(self) -> &'static str {
        match self {
            Provider::OpenRouter => "OPENROUTER_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| {
                LlmError::Validation(format!(
                    "unknown provider {s:?}; expected one of: openrouter, openai, anthropic"
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`.
    Bearer,
    /// `x-api-key: <key>` plus the `anthropic-version` header.
    AnthropicKey,
}

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

impl AuthScheme {
    pub fn headers(self, api_key: &str) -> Vec<(String, String)> {
        match self {
            AuthScheme::Bearer => vec![("Authorization".to_string(), format!("Bearer {api_key}"))],
            AuthScheme::AnthropicKey => vec![
                ("x-api-key".to_string(), api_key.to_string()),
                (
                    "anthropic-version".to_string(),
                    ANTHROPIC_VERSION.to_string(),
                ),
            ],
        }
    }
}

/// Endpoint and credentials for one provider. Read-only once the session starts.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub base_url: String,
    pub auth_scheme: AuthScheme,
    pub api_key: Option<String>,
    pub default_model: String,
}

impl ProviderConfig {
    pub fn new(provider: Provider, api_key: Option<String>) -> Self {
        Self {
            provider,
            base_url: provider.default_base_url().to_string(),
            auth_scheme: provider.auth_scheme(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            default_model: provider.default_model().to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn require_api_key(&self) -> crate::error::Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            LlmError::Config(format!(
                "missing API key for {}; set {}",
                self.provider,
                self.provider.api_key_env()
            ))
        })
    }

    pub fn auth_headers(&self) -> crate::error::Result<Vec<(String, String)>> {
        Ok(self.auth_scheme.headers(self.require_api_key()?))
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("auth_scheme", &self.auth_scheme)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// One [`ProviderConfig`] per provider; unconfigured providers have no key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSet {
    openrouter: ProviderConfig,
    openai: ProviderConfig,
    anthropic: ProviderConfig,
}

impl ProviderSet {
    pub fn with(mut self, config: ProviderConfig) -> Self {
        self.insert(config);
        self
    }

    pub fn insert(&mut self, config: ProviderConfig) {
        match config.provider {
            Provider::OpenRouter => self.openrouter = config,
            Provider::OpenAI => self.openai = config,
            Provider::Anthropic => self.anthropic = config,
        }
    }

    pub fn get(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::OpenRouter => &self.openrouter,
            Provider::OpenAI => &self.openai,
            Provider::Anthropic => &self.anthropic,
        }
    }

    /// Providers that have an API key, in [`Provider::ALL`] order.
    pub fn with_keys(&self) -> impl Iterator<Item = Provider> + '_ {
        Provider::ALL
            .into_iter()
            .filter(|p| self.get(*p).api_key.is_some())
    }
}

impl Default for ProviderSet {
    fn default() -> Self {
        Self {
            openrouter: ProviderConfig::new(Provider::OpenRouter, None),
            openai: ProviderConfig::new(Provider::OpenAI, None),
            anthropic: ProviderConfig::new(Provider::Anthropic, None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    pub provider: Provider,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!(" OpenRouter ".parse::<Provider>().unwrap(), Provider::OpenRouter);
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAI);
        assert_eq!("ANTHROPIC".parse::<Provider>().unwrap(), Provider::Anthropic);
        let err = "mistral".parse::<Provider>().expect_err("unknown provider");
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let cfg = ProviderConfig::new(Provider::OpenAI, None).with_base_url("http://x/v1/");
        assert_eq!(cfg.endpoint("/chat/completions"), "http://x/v1/chat/completions");
        assert_eq!(cfg.endpoint("models"), "http://x/v1/models");
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let cfg = ProviderConfig::new(Provider::Anthropic, Some("  ".to_string()));
        let err = cfg.auth_headers().expect_err("blank key should be rejected");
        assert_eq!(err.kind(), "config");
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn anthropic_auth_uses_vendor_headers() {
        let cfg = ProviderConfig::new(Provider::Anthropic, Some("sk-ant".to_string()));
        let headers = cfg.auth_headers().expect("key present");
        assert!(headers.contains(&("x-api-key".to_string(), "sk-ant".to_string())));
        assert!(headers.contains(&("anthropic-version".to_string(), "2023-06-01".to_string())));
        assert!(!headers.iter().any(|(k, _)| k == "Authorization"));
    }

    #[test]
    fn debug_output_redacts_key() {
        let cfg = ProviderConfig::new(Provider::OpenAI, Some("sk-secret".to_string()));
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
