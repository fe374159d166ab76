//! Conversation core for routerchat.
//!
//! Provider codecs for OpenRouter, OpenAI and Anthropic, a bounded history
//! buffer, model catalog filtering, and the session controller tying them to
//! a pluggable byte transport.

mod anthropic;
mod catalog;
mod codec;
mod error;
mod history;
mod openai;
mod openrouter;
mod session;
mod transport;
mod types;

pub use anthropic::AnthropicCodec;
pub use catalog::{
    CatalogFetch, MAX_SELECTABLE_MODELS, fetch_models, filter_catalog, is_selectable,
    models_request,
};
pub use codec::{ProviderCodec, codec_for};
pub use error::{LlmError, Result};
pub use history::{DEFAULT_HISTORY_CAPACITY, HistoryBuffer};
pub use openai::OpenAiCodec;
pub use openrouter::OpenRouterCodec;
pub use session::{ActiveModel, Session, SessionState};
pub use transport::{
    DEFAULT_REQUEST_TIMEOUT, HttpRequest, Method, ReqwestTransport, Transport,
};
pub use types::{
    ANTHROPIC_VERSION, AuthScheme, Message, ModelEntry, Provider, ProviderConfig, ProviderSet,
    Role,
};
