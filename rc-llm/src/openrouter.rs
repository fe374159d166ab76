//! OpenRouter speaks the OpenAI chat-completions dialect; the only request
//! difference is that reasoning traces are excluded from replies.

use crate::codec::{ProviderCodec, decode_reply, json_post};
use crate::error::Result;
use crate::history::HistoryBuffer;
use crate::openai::{
    CHAT_COMPLETIONS_PATH, CHAT_REPLY_POINTER, ChatCompletionRequest, ReasoningOptions,
};
use crate::transport::HttpRequest;
use crate::types::{Provider, ProviderConfig};

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenRouterCodec;

impl ProviderCodec for OpenRouterCodec {
    fn provider(&self) -> Provider {
        Provider::OpenRouter
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
        let req = ChatCompletionRequest::new(model, history)
            .with_reasoning(ReasoningOptions { exclude: true });
        json_post(self, config, &req)
    }

    fn decode_response(&self, raw: &[u8]) -> Result<String> {
        decode_reply(Provider::OpenRouter, raw, CHAT_REPLY_POINTER)
    }
}
