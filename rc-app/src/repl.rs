//! Interactive read/evaluate loop driving a [`Session`].

use crate::commands::{Command, HELP, parse_command, parse_selection};
use crate::render::{Render, render_or_print};
use anyhow::Result;
use rc_llm::{CatalogFetch, LlmError, Session};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

const PROMPT: &str = "> ";
const SELECTION_PROMPT: &str = "Enter model number to use: ";

enum Flow {
    Continue,
    Quit,
}

pub async fn run(mut session: Session, renderer: Box<dyn Render>) -> Result<()> {
    let mut rl = DefaultEditor::new()
        .map_err(|e| anyhow::anyhow!("initialize line editor: {e}"))?;

    println!("Commands: /model to change model, /help for more, /quit to exit");
    println!(
        "Current Model: {} ({})",
        session.current_model(),
        session.current_provider()
    );

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                tracing::error!(error = %err, "line editor failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        if let Err(e) = rl.add_history_entry(line.as_str()) {
            tracing::debug!(%e, "line not added to editor history");
        }

        let flow = match parse_command(&line) {
            Some(command) => handle_command(&mut session, &mut rl, command).await,
            None => {
                chat_turn(&mut session, renderer.as_ref(), &line).await;
                Flow::Continue
            }
        };
        if let Flow::Quit = flow {
            break;
        }
    }

    tracing::info!(
        history_len = session.history().len(),
        "chat loop finished"
    );
    Ok(())
}

async fn chat_turn(session: &mut Session, renderer: &dyn Render, line: &str) {
    match session.submit(line).await {
        Ok(reply) => render_or_print(renderer, &reply).await,
        Err(e) => report(&e),
    }
}

async fn handle_command(
    session: &mut Session,
    rl: &mut DefaultEditor,
    command: Command,
) -> Flow {
    match command {
        Command::Quit => return Flow::Quit,
        Command::Help => println!("{HELP}"),
        Command::New => {
            session.reset();
            println!("Started a new conversation.");
        }
        Command::Status => {
            let history = session.history();
            println!(
                "provider={}\nmodel={}\nhistory={}/{}",
                session.current_provider(),
                session.current_model(),
                history.len(),
                history.capacity()
            );
        }
        Command::ListModels => {
            println!("Fetching {} models...", session.current_provider());
            let fetched = session.list_models().await;
            print_catalog(&fetched);
            if !fetched.is_empty() {
                prompt_selection(session, rl);
            }
        }
        Command::SelectModel(number) => match session.select_model(number).cloned() {
            Ok(active) => println!("Model set to: {}", active.model),
            Err(e) => report_keeping_model(session, &e),
        },
        Command::UseModel(id) => match session.set_model(&id).cloned() {
            Ok(active) => println!("Model set to: {}", active.model),
            Err(e) => report_keeping_model(session, &e),
        },
        Command::ShowProvider => {
            println!("provider={}", session.current_provider());
        }
        Command::SwitchProvider(provider) => {
            let active = session.switch_provider(provider).clone();
            println!("Provider set to: {} (model {})", active.provider, active.model);
            if session.provider_config(provider).api_key.is_none() {
                println!(
                    "warning: {} is not set; requests to {provider} will fail",
                    provider.api_key_env()
                );
            }
        }
        Command::Invalid(message) => println!("{message}"),
    }
    Flow::Continue
}

fn print_catalog(fetched: &CatalogFetch) {
    if let Some(diagnostic) = fetched.diagnostic.as_deref() {
        eprintln!("{diagnostic}");
    }
    if fetched.is_empty() {
        return;
    }
    println!("--- Available {} Models ---", fetched.provider);
    for (i, entry) in fetched.models.iter().enumerate() {
        println!("[{}] {}", i + 1, entry.id);
    }
}

fn prompt_selection(session: &mut Session, rl: &mut DefaultEditor) {
    let input = match rl.readline(SELECTION_PROMPT) {
        Ok(input) => input,
        Err(_) => {
            session.cancel_selection();
            return;
        }
    };
    let outcome = parse_selection(&input).and_then(|n| session.select_model(n).cloned());
    match outcome {
        Ok(active) => println!("Model set to: {}", active.model),
        Err(e) => {
            session.cancel_selection();
            report_keeping_model(session, &e);
        }
    }
}

fn report(err: &LlmError) {
    eprintln!("{}", format_error(err));
}

fn format_error(err: &LlmError) -> String {
    format!("error[{}]: {}", err.kind(), err.message())
}

fn report_keeping_model(session: &Session, err: &LlmError) {
    report(err);
    eprintln!("Keeping model: {}", session.current_model());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_name_their_kind_once() {
        let err = LlmError::Api("rate limited".to_string());
        assert_eq!(format_error(&err), "error[api]: rate limited");

        let err = LlmError::Validation("model number must be between 1 and 3, got 9".to_string());
        assert_eq!(
            format_error(&err),
            "error[validation]: model number must be between 1 and 3, got 9"
        );
    }
}
