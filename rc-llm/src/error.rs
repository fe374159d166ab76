use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    /// A provider was used without its API key.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("parse error: {0}")]
    Parse(String),

    /// Well-formed error payload returned by the provider, message kept verbatim.
    #[error("api error: {0}")]
    Api(String),

    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("validation error: {0}")]
    Validation(String),
}

impl LlmError {
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::Config(_) => "config",
            LlmError::Transport(_) => "transport",
            LlmError::Parse(_) => "parse",
            LlmError::Api(_) => "api",
            LlmError::UnexpectedFormat(_) => "unexpected_format",
            LlmError::InvalidInput(_) => "invalid_input",
            LlmError::Validation(_) => "validation",
        }
    }

    /// The detail without the kind prefix that `Display` adds.
    pub fn message(&self) -> &str {
        match self {
            LlmError::Config(m)
            | LlmError::Transport(m)
            | LlmError::Parse(m)
            | LlmError::Api(m)
            | LlmError::UnexpectedFormat(m)
            | LlmError::InvalidInput(m)
            | LlmError::Validation(m) => m,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
