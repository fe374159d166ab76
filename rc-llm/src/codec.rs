use crate::anthropic::AnthropicCodec;
use crate::error::{LlmError, Result};
use crate::history::HistoryBuffer;
use crate::openai::OpenAiCodec;
use crate::openrouter::OpenRouterCodec;
use crate::transport::HttpRequest;
use crate::types::{Provider, ProviderConfig};
use serde_json::Value;

/// Provider-specific request encoding and response decoding.
///
/// Codecs are pure: they never touch the network or the history they read.
pub trait ProviderCodec: Send + Sync {
    fn provider(&self) -> Provider;

    /// Path of the chat endpoint relative to the provider base URL.
    fn chat_path(&self) -> &'static str;

    fn build_auth_headers(&self, config: &ProviderConfig) -> Result<Vec<(String, String)>> {
        config.auth_headers()
    }

    fn encode_request(
        &self,
        config: &ProviderConfig,
        model: &str,
        history: &HistoryBuffer,
    ) -> Result<HttpRequest>;

    fn decode_response(&self, raw: &[u8]) -> Result<String>;
}

static OPENROUTER: OpenRouterCodec = OpenRouterCodec;
static OPENAI: OpenAiCodec = OpenAiCodec;
static ANTHROPIC: AnthropicCodec = AnthropicCodec;

pub fn codec_for(provider: Provider) -> &'static dyn ProviderCodec {
    match provider {
        Provider::OpenRouter => &OPENROUTER,
        Provider::OpenAI => &OPENAI,
        Provider::Anthropic => &ANTHROPIC,
    }
}

/// Builds a JSON POST to `path` carrying the codec's auth headers.
pub(crate) fn json_post(
    codec: &dyn ProviderCodec,
    config: &ProviderConfig,
    body: &impl serde::Serialize,
) -> Result<HttpRequest> {
    let headers = codec.build_auth_headers(config)?;
    let body = serde_json::to_vec(body)?;
    Ok(HttpRequest::post(config.endpoint(codec.chat_path()), body)
        .headers(headers)
        .header("Content-Type", "application/json"))
}

/// Shared fallback chain: reply text at `reply_pointer`, else `error.message`,
/// else an unexpected-format error. Unparseable bytes are a parse error.
pub(crate) fn decode_reply(provider: Provider, raw: &[u8], reply_pointer: &str) -> Result<String> {
    let json: Value = serde_json::from_slice(raw).map_err(|e| {
        LlmError::Parse(format!("{provider} response is not valid JSON: {e}"))
    })?;

    if let Some(text) = json.pointer(reply_pointer).and_then(Value::as_str) {
        return Ok(text.to_string());
    }
    if let Some(message) = json.pointer("/error/message").and_then(Value::as_str) {
        return Err(LlmError::Api(message.to_string()));
    }
    Err(LlmError::UnexpectedFormat(format!(
        "{provider} response has neither {reply_pointer} nor /error/message"
    )))
}
