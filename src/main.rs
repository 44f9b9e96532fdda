//! http-tanker - terminal HTTP request workbench
//!
//! Two front ends share one engine and one store:
//! - interactive menus (crossterm + ratatui inline prompts)
//! - agent tools served as JSON-RPC over stdio (`tanker mcp`)

use std::io;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};

use tanker::app::{AppContext, Navigator};
use tanker::config::{Cli, Config, Mode};
use tanker::constants::APP_VERSION;
use tanker::messages::Signal;
use tanker::network::HttpEngine;
use tanker::prompt::terminal::TerminalPrompter;
use tanker::storage::Storage;
use tanker::tools::{self, ToolBox};
use tanker::ui::TerminalRenderer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from(Cli::parse());

    // Log to file; stdout carries the UI or the protocol
    let (subscriber, _guard) = config
        .log_subscriber()
        .with_context(|| format!("Failed to create {}", config.db_dir.display()))?;
    tracing::subscriber::set_global_default(subscriber).context("Failed to install logger")?;

    tracing::info!(version = APP_VERSION, db = %config.db_dir.display(), mode = ?config.mode, "Starting");

    let store = Storage::open(&config.db_dir)
        .with_context(|| format!("Failed to open database in {}", config.db_dir.display()))?;
    let store = Arc::new(store);
    let engine = HttpEngine::new(config.engine()).context("Failed to build HTTP client")?;

    match config.mode {
        Mode::AgentTools => {
            let toolbox = ToolBox::new(engine, store);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            tools::serve(&toolbox, stdin, tokio::io::stdout()).await?;
        }
        Mode::Interactive => {
            let ctx = AppContext::new(
                engine,
                store,
                Arc::new(TerminalPrompter::new()),
                Arc::new(TerminalRenderer::new()),
            );
            Navigator::new(ctx).run(Signal::Home).await;
            execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
        }
    }

    tracing::info!("Shutting down");
    Ok(())
}
