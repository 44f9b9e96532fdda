//! App context - the collaborators every workflow works with

use std::path::PathBuf;
use std::sync::Arc;

use crate::network::HttpEngine;
use crate::prompt::{Answer, PromptError, Prompter, Question};
use crate::storage::Storage;
use crate::ui::Renderer;

/// Shared by the navigator and every workflow it launches
pub struct AppContext {
    pub engine: HttpEngine,
    pub store: Arc<Storage>,
    pub prompter: Arc<dyn Prompter>,
    pub renderer: Arc<dyn Renderer>,
    /// Directory proposed when saving binary responses
    pub download_dir: PathBuf,
}

impl AppContext {
    pub fn new(
        engine: HttpEngine,
        store: Arc<Storage>,
        prompter: Arc<dyn Prompter>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        AppContext {
            engine,
            store,
            prompter,
            renderer,
            download_dir: default_download_dir(),
        }
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Asks on the blocking pool so prompts never stall the runtime
    pub async fn ask(&self, question: Question) -> Result<Answer, PromptError> {
        let prompter = Arc::clone(&self.prompter);
        tokio::task::spawn_blocking(move || prompter.ask(&question))
            .await
            .map_err(|e| PromptError::Unexpected(e.to_string()))?
    }

    pub async fn choose(&self, message: &str, options: Vec<String>) -> Result<String, PromptError> {
        match self.ask(Question::select(message, options)).await? {
            Answer::Choice(choice) => Ok(choice),
            other => Err(unexpected(other)),
        }
    }

    pub async fn text(&self, question: Question) -> Result<String, PromptError> {
        match self.ask(question).await? {
            Answer::Text(text) | Answer::Choice(text) => Ok(text),
            other => Err(unexpected(other)),
        }
    }

    pub async fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError> {
        match self.ask(Question::confirm(message, default)).await? {
            Answer::Bool(value) => Ok(value),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(answer: Answer) -> PromptError {
    PromptError::Unexpected(format!("answer of the wrong kind: {:?}", answer))
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
}
