//! Conversation controller: owns the history and the active model selection.

use crate::catalog::{CatalogFetch, fetch_models};
use crate::codec::codec_for;
use crate::error::{LlmError, Result};
use crate::history::{DEFAULT_HISTORY_CAPACITY, HistoryBuffer};
use crate::transport::Transport;
use crate::types::{ModelEntry, Provider, ProviderConfig, ProviderSet, Role};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingReply,
    /// A catalog was fetched and a numbered choice is pending.
    ModelSelection,
}

/// The model requests are sent to, tagged with the provider that serves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveModel {
    pub provider: Provider,
    pub model: String,
}

pub struct Session {
    transport: Arc<dyn Transport>,
    providers: ProviderSet,
    active: ActiveModel,
    history: HistoryBuffer,
    catalog: Vec<ModelEntry>,
    state: SessionState,
}

impl Session {
    /// Starts on `provider` with that provider's default model.
    pub fn new(transport: Arc<dyn Transport>, providers: ProviderSet, provider: Provider) -> Self {
        let model = providers.get(provider).default_model.clone();
        Self {
            transport,
            providers,
            active: ActiveModel { provider, model },
            history: HistoryBuffer::new(DEFAULT_HISTORY_CAPACITY),
            catalog: Vec::new(),
            state: SessionState::Idle,
        }
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history = HistoryBuffer::new(capacity);
        self
    }

    /// Blank ids are ignored so a missing override keeps the default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.active.model = model.trim().to_string();
        }
        self
    }

    /// Sends one user turn and returns the assistant reply.
    ///
    /// Empty input is rejected without touching history or the network. On
    /// any later failure the user message stays in history and no assistant
    /// message is recorded; nothing is retried.
    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(provider = %self.active.provider, model = %self.active.model)
    )]
    pub async fn submit(&mut self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(LlmError::InvalidInput(
                "message must not be empty".to_string(),
            ));
        }
        if self.state == SessionState::ModelSelection {
            tracing::debug!("pending model selection abandoned by new message");
        }

        self.state = SessionState::AwaitingReply;
        self.history.append(Role::User, text);
        tracing::debug!(history_len = self.history.len(), "user message appended");

        let started = Instant::now();
        let outcome = self.exchange().await;
        self.state = SessionState::Idle;

        match outcome {
            Ok(reply) => {
                self.history.append(Role::Assistant, reply.as_str());
                tracing::info!(
                    latency_ms = started.elapsed().as_millis() as u64,
                    reply_len = reply.len(),
                    history_len = self.history.len(),
                    "turn completed"
                );
                Ok(reply)
            }
            Err(e) => {
                tracing::warn!(
                    error_kind = e.kind(),
                    error = %e,
                    history_len = self.history.len(),
                    "turn failed; assistant message not recorded"
                );
                Err(e)
            }
        }
    }

    async fn exchange(&self) -> Result<String> {
        let codec = codec_for(self.active.provider);
        let config = self.providers.get(self.active.provider);
        let request = codec.encode_request(config, &self.active.model, &self.history)?;
        let raw = self.transport.send(request).await?;
        codec.decode_response(&raw)
    }

    /// Fetches the active provider's catalog and remembers it for
    /// [`Session::select_model`].
    pub async fn list_models(&mut self) -> CatalogFetch {
        let fetched = fetch_models(
            self.transport.as_ref(),
            self.providers.get(self.active.provider),
        )
        .await;
        self.catalog = fetched.models.clone();
        self.state = if self.catalog.is_empty() {
            SessionState::Idle
        } else {
            SessionState::ModelSelection
        };
        fetched
    }

    /// Picks a model by its 1-based position in the last fetched catalog.
    /// An invalid number leaves the active model unchanged.
    pub fn select_model(&mut self, number: usize) -> Result<&ActiveModel> {
        self.state = SessionState::Idle;
        if self.catalog.is_empty() {
            return Err(LlmError::Validation(
                "no model catalog loaded; list models first".to_string(),
            ));
        }
        let Some(entry) = number.checked_sub(1).and_then(|i| self.catalog.get(i)) else {
            return Err(LlmError::Validation(format!(
                "model number must be between 1 and {}, got {number}",
                self.catalog.len()
            )));
        };

        self.active = ActiveModel {
            provider: entry.provider,
            model: entry.id.clone(),
        };
        tracing::info!(provider = %self.active.provider, model = %self.active.model, "model selected");
        Ok(&self.active)
    }

    pub fn cancel_selection(&mut self) {
        self.state = SessionState::Idle;
    }

    /// Uses a free-form model id on the active provider.
    pub fn set_model(&mut self, model: &str) -> Result<&ActiveModel> {
        self.state = SessionState::Idle;
        let model = model.trim();
        if model.is_empty() {
            return Err(LlmError::Validation("model id must not be empty".to_string()));
        }
        self.active.model = model.to_string();
        tracing::info!(provider = %self.active.provider, model = %self.active.model, "model set");
        Ok(&self.active)
    }

    /// Makes `provider` active on its default model. History is kept.
    pub fn switch_provider(&mut self, provider: Provider) -> &ActiveModel {
        self.state = SessionState::Idle;
        self.catalog.clear();
        self.active = ActiveModel {
            provider,
            model: self.providers.get(provider).default_model.clone(),
        };
        tracing::info!(provider = %provider, model = %self.active.model, "provider switched");
        &self.active
    }

    /// Starts a new conversation; the model selection is kept.
    pub fn reset(&mut self) {
        self.history.clear();
        self.state = SessionState::Idle;
    }

    pub fn current_model(&self) -> &str {
        &self.active.model
    }

    pub fn current_provider(&self) -> Provider {
        self.active.provider
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn catalog(&self) -> &[ModelEntry] {
        &self.catalog
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn provider_config(&self, provider: Provider) -> &ProviderConfig {
        self.providers.get(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::stub::{Canned, StubTransport};
    use crate::types::Message;
    use serde_json::Value;

    fn providers() -> ProviderSet {
        ProviderSet::default()
            .with(ProviderConfig::new(Provider::OpenAI, Some("sk-openai".to_string())))
            .with(ProviderConfig::new(Provider::OpenRouter, Some("sk-or".to_string())))
    }

    fn session(stub: &Arc<StubTransport>, provider: Provider) -> Session {
        Session::new(stub.clone(), providers(), provider)
    }

    fn transcript(session: &Session) -> Vec<(Role, String)> {
        session
            .history()
            .iter()
            .map(|m| (m.role(), m.content().to_string()))
            .collect()
    }

    #[tokio::test]
    async fn submit_appends_user_and_assistant_on_success() {
        let stub = Arc::new(StubTransport::with_body(
            r#"{"choices":[{"message":{"content":"hi there"}}]}"#,
        ));
        let mut session = session(&stub, Provider::OpenAI);

        let reply = session.submit("hello").await.expect("reply");
        assert_eq!(reply, "hi there");
        assert_eq!(
            transcript(&session),
            vec![
                (Role::User, "hello".to_string()),
                (Role::Assistant, "hi there".to_string()),
            ]
        );
        assert_eq!(session.state(), SessionState::Idle);

        let requests = stub.requests();
        assert_eq!(requests[0].url, "https://api.openai.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn api_error_keeps_only_the_user_message() {
        let stub = Arc::new(StubTransport::with_body(r#"{"error":{"message":"rate limited"}}"#));
        let mut session = session(&stub, Provider::OpenAI);

        let err = session.submit("hello").await.expect_err("api error");
        assert!(matches!(&err, LlmError::Api(m) if m == "rate limited"));
        assert_eq!(transcript(&session), vec![(Role::User, "hello".to_string())]);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn failed_turn_is_resent_with_the_next_one() {
        let stub = Arc::new(StubTransport::new(vec![
            Canned::Fail("connection reset"),
            Canned::Body(r#"{"choices":[{"message":{"content":"ok"}}]}"#),
        ]));
        let mut session = session(&stub, Provider::OpenRouter);

        let err = session.submit("first").await.expect_err("transport");
        assert_eq!(err.kind(), "transport");
        session.submit("second").await.expect("reply");

        let requests = stub.requests();
        let body: Value =
            serde_json::from_slice(requests[1].body.as_deref().expect("body")).expect("json");
        let contents: Vec<&str> = body["messages"]
            .as_array()
            .expect("messages")
            .iter()
            .filter_map(|m| m["content"].as_str())
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn empty_submission_never_reaches_transport() {
        let stub = Arc::new(StubTransport::new(vec![]));
        let mut session = session(&stub, Provider::OpenAI);

        for blank in ["", "   ", "\n"] {
            let err = session.submit(blank).await.expect_err("rejected");
            assert_eq!(err.kind(), "invalid_input");
        }
        assert!(session.history().is_empty());
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn round_trip_grows_history_by_one_assistant_message() {
        let stub = Arc::new(StubTransport::with_body(
            r#"{"content":[{"type":"text","text":"from claude"}]}"#,
        ));
        let providers = providers().with(ProviderConfig::new(
            Provider::Anthropic,
            Some("sk-ant".to_string()),
        ));
        let mut session = Session::new(stub.clone(), providers, Provider::Anthropic);
        session.history.push(Message::user("earlier"));
        session.history.push(Message::assistant("earlier reply"));
        let before = session.history().len();

        session.submit("now").await.expect("reply");
        assert_eq!(session.history().len(), before + 2);
        assert_eq!(
            session.history().last().map(Message::role),
            Some(Role::Assistant)
        );
        assert_eq!(stub.requests()[0].header_value("x-api-key"), Some("sk-ant"));
    }

    #[tokio::test]
    async fn missing_key_is_config_error_without_network() {
        let stub = Arc::new(StubTransport::new(vec![]));
        let mut session = session(&stub, Provider::Anthropic);

        let err = session.submit("hello").await.expect_err("no key");
        assert_eq!(err.kind(), "config");
        assert_eq!(stub.call_count(), 0);
        assert_eq!(transcript(&session), vec![(Role::User, "hello".to_string())]);
    }

    #[tokio::test]
    async fn history_capacity_bounds_the_request() {
        let stub = Arc::new(StubTransport::new(vec![
            Canned::Body(r#"{"choices":[{"message":{"content":"r1"}}]}"#),
            Canned::Body(r#"{"choices":[{"message":{"content":"r2"}}]}"#),
            Canned::Body(r#"{"choices":[{"message":{"content":"r3"}}]}"#),
        ]));
        let mut session = session(&stub, Provider::OpenAI).with_history_capacity(3);
        session.submit("q1").await.expect("r1");
        session.submit("q2").await.expect("r2");

        assert_eq!(
            transcript(&session),
            vec![
                (Role::Assistant, "r1".to_string()),
                (Role::User, "q2".to_string()),
                (Role::Assistant, "r2".to_string()),
            ]
        );

        session.submit("q3").await.expect("r3");
        let requests = stub.requests();
        assert_eq!(requests.len(), 3);
        let body: Value =
            serde_json::from_slice(requests[2].body.as_deref().expect("body")).expect("json");
        let sent: Vec<(&str, &str)> = body["messages"]
            .as_array()
            .expect("messages")
            .iter()
            .filter_map(|m| Some((m["role"].as_str()?, m["content"].as_str()?)))
            .collect();
        assert_eq!(
            sent,
            vec![("user", "q2"), ("assistant", "r2"), ("user", "q3")]
        );
    }

    #[tokio::test]
    async fn select_model_uses_one_based_numbers() {
        let stub = Arc::new(StubTransport::with_body(
            r#"{"data":[{"id":"openai/gpt-4:paid"},{"id":"meta/llama:free"},{"id":"anthropic/claude-3"}]}"#,
        ));
        let mut session = session(&stub, Provider::OpenRouter);
        let default_model = session.current_model().to_string();

        let fetched = session.list_models().await;
        assert_eq!(fetched.models.len(), 3);
        assert_eq!(session.state(), SessionState::ModelSelection);

        for bad in [0, 4, usize::MAX] {
            let err = session.select_model(bad).expect_err("out of range");
            assert_eq!(err.kind(), "validation");
            assert_eq!(session.current_model(), default_model);
            assert_eq!(session.state(), SessionState::Idle);
        }

        let active = session.select_model(2).expect("valid").clone();
        assert_eq!(active.model, "meta/llama:free");
        assert_eq!(active.provider, Provider::OpenRouter);
        assert_eq!(session.current_model(), "meta/llama:free");
    }

    #[tokio::test]
    async fn select_without_catalog_is_rejected() {
        let stub = Arc::new(StubTransport::new(vec![Canned::Fail("offline")]));
        let mut session = session(&stub, Provider::OpenRouter);

        let fetched = session.list_models().await;
        assert!(fetched.diagnostic.is_some());
        assert_eq!(session.state(), SessionState::Idle);

        let err = session.select_model(1).expect_err("nothing to select");
        assert_eq!(err.kind(), "validation");
        assert_eq!(session.current_model(), "openai/gpt-oss-20b:free");
    }

    #[tokio::test]
    async fn submit_abandons_pending_selection() {
        let stub = Arc::new(StubTransport::new(vec![
            Canned::Body(r#"{"data":[{"id":"x/y:free"}]}"#),
            Canned::Body(r#"{"choices":[{"message":{"content":"hey"}}]}"#),
        ]));
        let mut session = session(&stub, Provider::OpenRouter);
        session.list_models().await;
        assert_eq!(session.state(), SessionState::ModelSelection);

        session.submit("hi").await.expect("reply");
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.current_model(), "openai/gpt-oss-20b:free");
    }

    #[test]
    fn switch_provider_tags_model_explicitly() {
        let stub = Arc::new(StubTransport::new(vec![]));
        let mut session = session(&stub, Provider::OpenRouter).with_model("anthropic/claude-3");
        assert_eq!(session.current_provider(), Provider::OpenRouter);

        let active = session.switch_provider(Provider::Anthropic).clone();
        assert_eq!(active.provider, Provider::Anthropic);
        assert_eq!(active.model, "claude-3-5-sonnet-latest");
        assert!(session.catalog().is_empty());
    }

    #[test]
    fn set_model_rejects_blank_ids() {
        let stub = Arc::new(StubTransport::new(vec![]));
        let mut session = session(&stub, Provider::OpenAI);

        assert_eq!(session.set_model("  ").expect_err("blank").kind(), "validation");
        assert_eq!(session.current_model(), "chatgpt-4o-latest");

        session.set_model(" gpt-4o-mini ").expect("set");
        assert_eq!(session.current_model(), "gpt-4o-mini");
        assert_eq!(session.current_provider(), Provider::OpenAI);
    }

    #[tokio::test]
    async fn reset_clears_history_but_keeps_model() {
        let stub = Arc::new(StubTransport::with_body(
            r#"{"choices":[{"message":{"content":"x"}}]}"#,
        ));
        let mut session = session(&stub, Provider::OpenAI).with_model("gpt-4o");
        session.submit("q").await.expect("reply");
        session.reset();
        assert!(session.history().is_empty());
        assert_eq!(session.current_model(), "gpt-4o");
    }
}
