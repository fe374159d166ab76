//! Model listing and the per-provider inclusion rules.

use crate::error::{LlmError, Result};
use crate::transport::{HttpRequest, Transport};
use crate::types::{ModelEntry, Provider, ProviderConfig};
use serde_json::Value;

pub const MAX_SELECTABLE_MODELS: usize = 500;

const MODELS_PATH: &str = "models";
const OPENROUTER_FREE_SUFFIX: &str = ":free";
const OPENROUTER_VENDOR_PREFIXES: [&str; 2] = ["openai/", "anthropic/"];

/// Whether a listed model id should be offered for selection.
pub fn is_selectable(provider: Provider, id: &str) -> bool {
    match provider {
        Provider::OpenRouter => {
            id.ends_with(OPENROUTER_FREE_SUFFIX)
                || OPENROUTER_VENDOR_PREFIXES
                    .iter()
                    .any(|prefix| id.starts_with(prefix))
        }
        Provider::OpenAI => id.contains("gpt"),
        Provider::Anthropic => true,
    }
}

/// Decodes a `{"data":[{"id":..}]}` listing and keeps selectable ids in
/// source order, capped at [`MAX_SELECTABLE_MODELS`].
pub fn filter_catalog(provider: Provider, raw: &[u8]) -> Result<Vec<ModelEntry>> {
    let json: Value = serde_json::from_slice(raw)
        .map_err(|e| LlmError::Parse(format!("{provider} model listing is not valid JSON: {e}")))?;

    let Some(data) = json.get("data").and_then(Value::as_array) else {
        if let Some(message) = json.pointer("/error/message").and_then(Value::as_str) {
            return Err(LlmError::Api(message.to_string()));
        }
        return Err(LlmError::UnexpectedFormat(format!(
            "{provider} model listing has no data array"
        )));
    };

    Ok(data
        .iter()
        .filter_map(|entry| entry.get("id").and_then(Value::as_str))
        .filter(|id| is_selectable(provider, id))
        .take(MAX_SELECTABLE_MODELS)
        .map(|id| ModelEntry {
            id: id.to_string(),
            provider,
        })
        .collect())
}

/// The OpenRouter listing is public; the direct vendor listings need a key.
pub fn models_request(config: &ProviderConfig) -> Result<HttpRequest> {
    let request = HttpRequest::get(config.endpoint(MODELS_PATH));
    match config.provider {
        Provider::OpenRouter => match config.api_key.as_deref() {
            Some(key) => Ok(request.headers(config.auth_scheme.headers(key))),
            None => Ok(request),
        },
        Provider::OpenAI | Provider::Anthropic => Ok(request.headers(config.auth_headers()?)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFetch {
    pub provider: Provider,
    pub models: Vec<ModelEntry>,
    /// Set when the list is empty for any reason, including failures.
    pub diagnostic: Option<String>,
}

impl CatalogFetch {
    fn failed(provider: Provider, err: &LlmError) -> Self {
        tracing::warn!(
            provider = %provider,
            error_kind = err.kind(),
            error = %err,
            "model catalog fetch failed"
        );
        Self {
            provider,
            models: Vec::new(),
            diagnostic: Some(format!("{provider} catalog unavailable ({}): {err}", err.kind())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Fetches and filters the provider's catalog. Never fails: problems come
/// back as an empty list with a diagnostic.
#[tracing::instrument(level = "info", skip_all, fields(provider = %config.provider))]
pub async fn fetch_models(transport: &dyn Transport, config: &ProviderConfig) -> CatalogFetch {
    let provider = config.provider;
    let request = match models_request(config) {
        Ok(r) => r,
        Err(e) => return CatalogFetch::failed(provider, &e),
    };
    let raw = match transport.send(request).await {
        Ok(raw) => raw,
        Err(e) => return CatalogFetch::failed(provider, &e),
    };
    let models = match filter_catalog(provider, &raw) {
        Ok(models) => models,
        Err(e) => return CatalogFetch::failed(provider, &e),
    };

    tracing::info!(selectable = models.len(), "model catalog fetched");
    let diagnostic = if models.is_empty() {
        Some(format!("{provider} catalog has no selectable models"))
    } else {
        None
    };
    CatalogFetch {
        provider,
        models,
        diagnostic,
    }
}
