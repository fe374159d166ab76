//! Reply rendering. The chat loop never depends on a renderer succeeding:
//! on failure it logs and prints the raw text instead.

use anyhow::Result;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[async_trait]
pub trait Render: Send + Sync {
    async fn render(&self, text: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

#[async_trait]
impl Render for PlainRenderer {
    async fn render(&self, text: &str) -> Result<()> {
        println!("{text}");
        Ok(())
    }
}

/// Pipes each reply into a shell command such as `glow -`.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    command: String,
}

impl CommandRenderer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl Render for CommandRenderer {
    #[tracing::instrument(level = "debug", skip_all, fields(command = %self.command))]
    async fn render(&self, text: &str) -> Result<()> {
        let mut child = Command::new("/bin/sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow::anyhow!("spawn renderer {:?}: {e}", self.command))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow::anyhow!("renderer stdin unavailable"))?;
        let write_result = stdin.write_all(text.as_bytes()).await;
        drop(stdin);

        let status = child.wait().await?;
        if !status.success() {
            return Err(anyhow::anyhow!(
                "renderer {:?} exited with {status}",
                self.command
            ));
        }
        // A renderer may close stdin early and still succeed.
        if let Err(e) = write_result {
            tracing::debug!(%e, "renderer closed stdin before reading the full reply");
        }
        Ok(())
    }
}

pub fn renderer_for(command: Option<&str>) -> Box<dyn Render> {
    match command.map(str::trim).filter(|c| !c.is_empty()) {
        Some(command) => Box::new(CommandRenderer::new(command)),
        None => Box::new(PlainRenderer),
    }
}

/// Renders `text`, falling back to plain output when the renderer fails.
pub async fn render_or_print(renderer: &dyn Render, text: &str) {
    if let Err(e) = renderer.render(text).await {
        tracing::warn!(error = %e, "render failed; showing raw text");
        println!("{text}");
    }
}
