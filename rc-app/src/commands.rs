//! Slash-command parser for the chat loop.

use rc_llm::{LlmError, Provider};

pub const HELP: &str = "Commands:
  /model             list models for the active provider and pick one
  /model <n>         pick model number <n> from the last list
  /model use <id>    use a model id directly
  /provider [name]   show or switch provider (openrouter, openai, anthropic)
  /new               start a new conversation
  /status            show provider, model and history size
  /help              show this help
  /quit              exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Help,
    New,
    Status,
    ListModels,
    SelectModel(usize),
    UseModel(String),
    ShowProvider,
    SwitchProvider(Provider),
    /// Recognized shape but bad arguments, or an unknown command.
    Invalid(String),
}

/// Returns `None` for ordinary chat input.
pub fn parse_command(input: &str) -> Option<Command> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    let command = match parts.as_slice() {
        ["/quit"] | ["/exit"] => Command::Quit,
        ["/help"] => Command::Help,
        ["/new"] => Command::New,
        ["/status"] => Command::Status,
        ["/model"] => Command::ListModels,
        ["/model", "use", rest @ ..] if !rest.is_empty() => Command::UseModel(rest.join(" ")),
        ["/model", "use"] => Command::Invalid("Usage: /model use <model_id>".to_string()),
        ["/model", n] => match parse_selection(n) {
            Ok(n) => Command::SelectModel(n),
            Err(_) => Command::Invalid(
                "Usage: /model | /model <number> | /model use <model_id>".to_string(),
            ),
        },
        ["/provider"] => Command::ShowProvider,
        ["/provider", name] => match name.parse::<Provider>() {
            Ok(p) => Command::SwitchProvider(p),
            Err(e) => Command::Invalid(e.to_string()),
        },
        _ => Command::Invalid(format!("Unknown command {:?}. Try /help", parts[0])),
    };
    Some(command)
}

/// Parses a 1-based model number typed at the selection prompt. Range
/// checking against the catalog happens in the session.
pub fn parse_selection(input: &str) -> Result<usize, LlmError> {
    let trimmed = input.trim();
    trimmed
        .parse::<usize>()
        .map_err(|_| LlmError::Validation(format!("not a model number: {trimmed:?}")))
}
