use crate::codec::{ProviderCodec, decode_reply, json_post};
use crate::error::Result;
use crate::history::HistoryBuffer;
use crate::transport::HttpRequest;
use crate::types::{Message, Provider, ProviderConfig, Role};
use serde::Serialize;

const ANTHROPIC_MESSAGES_PATH: &str = "messages";
const ANTHROPIC_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicCodec;

impl ProviderCodec for AnthropicCodec {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn chat_path(&self) -> &'static str {
        ANTHROPIC_MESSAGES_PATH
    }

    fn encode_request(
        &self,
        config: &ProviderConfig,
        model: &str,
        history: &HistoryBuffer,
    ) -> Result<HttpRequest> {
        let req = AnthropicRequest::new(model, history);
        json_post(self, config, &req)
    }

    fn decode_response(&self, raw: &[u8]) -> Result<String> {
        decode_reply(Provider::Anthropic, raw, "/content/0/text")
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> AnthropicRequest<'a> {
    fn new(model: &'a str, history: &'a HistoryBuffer) -> Self {
        // The messages API rejects conversations that open with an assistant
        // turn, which eviction can produce.
        let messages = history
            .iter()
            .skip_while(|m| m.role() == Role::Assistant)
            .map(to_anthropic_message)
            .collect();
        Self {
            model,
            max_tokens: ANTHROPIC_MAX_TOKENS,
            messages,
        }
    }
}

fn to_anthropic_message(m: &Message) -> AnthropicMessage<'_> {
    AnthropicMessage {
        role: m.role().as_str(),
        content: m.content(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn config() -> ProviderConfig {
        ProviderConfig::new(Provider::Anthropic, Some("sk-ant-test".to_string()))
    }

    #[test]
    fn encode_uses_vendor_headers_and_max_tokens() {
        let mut history = HistoryBuffer::new(8);
        history.append(Role::User, "hello");

        let req = AnthropicCodec
            .encode_request(&config(), "claude-3-5-sonnet-latest", &history)
            .expect("encode");
        assert_eq!(req.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(req.header_value("x-api-key"), Some("sk-ant-test"));
        assert_eq!(req.header_value("anthropic-version"), Some("2023-06-01"));
        assert_eq!(req.header_value("authorization"), None);

        let body: Value = serde_json::from_slice(req.body.as_deref().expect("body")).expect("json");
        assert_eq!(
            body,
            json!({
                "model": "claude-3-5-sonnet-latest",
                "max_tokens": 4096,
                "messages": [{"role": "user", "content": "hello"}]
            })
        );
    }

    #[test]
    fn encode_drops_leading_assistant_turns() {
        let mut history = HistoryBuffer::new(8);
        history.append(Role::Assistant, "orphaned by eviction");
        history.append(Role::User, "next question");
        history.append(Role::Assistant, "answer");

        let req = AnthropicCodec
            .encode_request(&config(), "claude", &history)
            .expect("encode");
        let body: Value = serde_json::from_slice(req.body.as_deref().expect("body")).expect("json");
        let roles: Vec<&str> = body["messages"]
            .as_array()
            .expect("messages")
            .iter()
            .filter_map(|m| m["role"].as_str())
            .collect();
        assert_eq!(roles, vec!["user", "assistant"]);
    }

    #[test]
    fn decode_reads_first_text_block() {
        let raw = br#"{"id":"msg_1","type":"message","role":"assistant","content":[{"type":"text","text":"Bonjour"}],"stop_reason":"end_turn"}"#;
        assert_eq!(AnthropicCodec.decode_response(raw).expect("reply"), "Bonjour");
    }

    #[test]
    fn decode_surfaces_error_message() {
        let raw = br#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err = AnthropicCodec.decode_response(raw).expect_err("api error");
        assert_eq!(err.kind(), "api");
        assert!(err.to_string().ends_with("Overloaded"));
    }

    #[test]
    fn decode_ignores_openai_shape() {
        let raw = br#"{"choices":[{"message":{"content":"wrong dialect"}}]}"#;
        let err = AnthropicCodec.decode_response(raw).expect_err("wrong shape");
        assert_eq!(err.kind(), "unexpected_format");
    }
}
