//! routerchat: terminal chat client for OpenRouter, OpenAI and Anthropic.

mod commands;
mod config;
mod init;
mod render;
mod repl;

use clap::{Parser, Subcommand};
use config::RouterChatConfig;
use rc_llm::{Provider, ReqwestTransport, Session};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Debug, Parser)]
#[command(
    name = "routerchat",
    version,
    about = "Terminal chat client for OpenRouter, OpenAI and Anthropic"
)]
struct Cli {
    /// Config file (default: ~/.routerchat/config.toml).
    #[arg(long, global = true, env = "ROUTERCHAT_CONFIG")]
    config: Option<PathBuf>,
    /// Provider to start on: openrouter, openai or anthropic.
    #[arg(long, global = true, value_parser = parse_provider)]
    provider: Option<Provider>,
    /// Model id to start with.
    #[arg(long, global = true)]
    model: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat (default).
    Chat,
    /// Print the selectable models for a provider.
    Models,
    /// Write a config template to ~/.routerchat (idempotent).
    Init,
}

fn parse_provider(s: &str) -> Result<Provider, String> {
    s.parse::<Provider>().map_err(|e| e.to_string())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    init_tracing()?;
    install_panic_hook();
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Chat);

    match command {
        Command::Init => {
            let report = init::initialize_default().await?;
            if report.created.is_empty() {
                println!(
                    "routerchat init: already initialized at {}",
                    report.root.display()
                );
            } else {
                for path in &report.created {
                    println!("created {}", path.display());
                }
            }
            println!("next: edit {}", report.root.join("config.toml").display());
            Ok(())
        }
        Command::Models => {
            let cfg = load_config(cli.config, cli.provider, cli.model).await?;
            let mut session = build_session(&cfg);
            let fetched = session.list_models().await;
            if let Some(diagnostic) = fetched.diagnostic.as_deref() {
                eprintln!("{diagnostic}");
            }
            for (i, entry) in fetched.models.iter().enumerate() {
                println!("[{}] {}", i + 1, entry.id);
            }
            Ok(())
        }
        Command::Chat => {
            let cfg = load_config(cli.config, cli.provider, cli.model).await?;
            cfg.ensure_any_key()?;
            let session = build_session(&cfg);
            let renderer = render::renderer_for(cfg.render.command.as_deref());
            repl::run(session, renderer).await
        }
    }
}

async fn load_config(
    path: Option<PathBuf>,
    provider: Option<Provider>,
    model: Option<String>,
) -> anyhow::Result<RouterChatConfig> {
    let mut cfg = RouterChatConfig::load(path).await?;
    if let Some(provider) = provider {
        cfg.general.provider = provider;
    }
    if let Some(model) = model {
        cfg.general.model = Some(model);
    }
    tracing::debug!(config = ?cfg, "configuration loaded");
    Ok(cfg)
}

fn build_session(cfg: &RouterChatConfig) -> Session {
    let transport = Arc::new(ReqwestTransport::new(cfg.request_timeout()));
    let session = Session::new(transport, cfg.provider_set(), cfg.general.provider)
        .with_history_capacity(cfg.general.history_capacity);
    let session = match cfg.general.model.as_deref() {
        Some(model) => session.with_model(model),
        None => session,
    };
    tracing::info!(
        provider = %session.current_provider(),
        model = %session.current_model(),
        history_capacity = cfg.general.history_capacity,
        "session created"
    );
    session
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(v) => v,
        Err(_) => EnvFilter::new("warn"),
    };
    let log_format = std::env::var("ROUTERCHAT_LOG_FORMAT")
        .unwrap_or_else(|_| "compact".to_string())
        .to_ascii_lowercase();

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .init();
        }
        "pretty" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .pretty()
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .compact()
                .init();
        }
        other => {
            return Err(anyhow::anyhow!(
                "unsupported ROUTERCHAT_LOG_FORMAT={other:?}; expected one of: json, pretty, compact"
            ));
        }
    }

    tracing::debug!(
        log_format = %log_format,
        env_filter = ?std::env::var("RUST_LOG").ok(),
        "tracing initialized"
    );
    Ok(())
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_to_string(panic_info.payload());
        tracing::error!(
            panic_location = %location,
            panic_payload = %payload,
            "panic captured"
        );
        default_hook(panic_info);
    }));
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return msg.to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}
