//! Byte delivery for provider calls.
//!
//! The transport never interprets status codes: a 4xx/5xx body is handed back
//! as-is so the codec can surface the provider's own error message.

use crate::error::Result;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::fmt;
use std::time::{Duration, Instant};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn is_secret_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("authorization") || name.eq_ignore_ascii_case("x-api-key")
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                let v = if is_secret_header(k) { "<redacted>" } else { v.as_str() };
                (k.as_str(), v)
            })
            .collect();
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .finish()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one request and returns the full response body.
    async fn send(&self, request: HttpRequest) -> Result<Bytes>;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(%e, "reqwest client build failed; falling back to default client");
                reqwest::Client::new()
            });
        Self { http }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(level = "debug", skip_all, fields(method = ?request.method, url = %request.url))]
    async fn send(&self, request: HttpRequest) -> Result<Bytes> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        };
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let started = Instant::now();
        let mut response = builder.send().await?;
        let status = response.status();

        let mut buffer = BytesMut::new();
        let mut chunks = 0usize;
        while let Some(chunk) = response.chunk().await? {
            buffer.extend_from_slice(&chunk);
            chunks += 1;
        }

        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                bytes = buffer.len(),
                "provider returned non-success status; passing body through"
            );
        }
        tracing::debug!(
            status = status.as_u16(),
            bytes = buffer.len(),
            chunks,
            latency_ms = started.elapsed().as_millis() as u64,
            "response received"
        );
        Ok(buffer.freeze())
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use super::{HttpRequest, Transport};
    use crate::error::{LlmError, Result};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub(crate) enum Canned {
        Body(&'static str),
        Fail(&'static str),
    }

    /// Replays canned bodies in order and records every request it sees.
    pub(crate) struct StubTransport {
        responses: Mutex<VecDeque<Canned>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl StubTransport {
        pub(crate) fn new(responses: Vec<Canned>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn with_body(body: &'static str) -> Self {
            Self::new(vec![Canned::Body(body)])
        }

        pub(crate) fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().expect("stub lock").clone()
        }

        pub(crate) fn call_count(&self) -> usize {
            self.requests.lock().expect("stub lock").len()
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn send(&self, request: HttpRequest) -> Result<Bytes> {
            self.requests.lock().expect("stub lock").push(request);
            match self.responses.lock().expect("stub lock").pop_front() {
                Some(Canned::Body(body)) => Ok(Bytes::from_static(body.as_bytes())),
                Some(Canned::Fail(reason)) => Err(LlmError::Transport(reason.to_string())),
                None => Err(LlmError::Transport("stub has no canned response".to_string())),
            }
        }
    }
}
