use crate::codec::{ProviderCodec, decode_reply, json_post};
use crate::error::Result;
use crate::history::HistoryBuffer;
use crate::transport::HttpRequest;
use crate::types::{Message, Provider, ProviderConfig};
use serde::Serialize;

pub(crate) const CHAT_COMPLETIONS_PATH: &str = "chat/completions";
pub(crate) const CHAT_REPLY_POINTER: &str = "/choices/0/message/content";

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiCodec;

impl ProviderCodec for OpenAiCodec {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    fn chat_path(&self) -> &'static str {
        CHAT_COMPLETIONS_PATH
    }

    fn encode_request(
        &self,
        config: &ProviderConfig,
        model: &str,
        history: &HistoryBuffer,
    ) -> Result<HttpRequest> {
        let req = ChatCompletionRequest::new(model, history);
        json_post(self, config, &req)
    }

    fn decode_response(&self, raw: &[u8]) -> Result<String> {
        decode_reply(Provider::OpenAI, raw, CHAT_REPLY_POINTER)
    }
}

/// `chat/completions` body shared by OpenAI and OpenAI-compatible routers.
#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<ReasoningOptions>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReasoningOptions {
    pub(crate) exclude: bool,
}

#[derive(Debug, Serialize)]
struct ChatCompletionMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatCompletionRequest<'a> {
    pub(crate) fn new(model: &'a str, history: &'a HistoryBuffer) -> Self {
        Self {
            model,
            messages: history.iter().map(to_chat_message).collect(),
            reasoning: None,
        }
    }

    pub(crate) fn with_reasoning(mut self, reasoning: ReasoningOptions) -> Self {
        self.reasoning = Some(reasoning);
        self
    }
}

fn to_chat_message(m: &Message) -> ChatCompletionMessage<'_> {
    ChatCompletionMessage {
        role: m.role().as_str(),
        content: m.content(),
    }
}
