//! Prompt provider - "ask a question, get a typed answer"
//!
//! Workflows only ever see [`Prompter`]. The terminal implementation draws
//! with ratatui; tests script the answers.

pub mod terminal;

#[cfg(test)]
pub mod scripted;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

pub use terminal::TerminalPrompter;

/// Input check run before an answer is accepted; `Err` holds the message shown
pub type Validator = Arc<dyn Fn(&str) -> Result<(), String> + Send + Sync>;

/// A single prompt
#[derive(Clone)]
pub enum Question {
    /// Pick one of `options`
    Select {
        message: String,
        options: Vec<String>,
        default: Option<String>,
    },
    /// One line of free text, masked when `secret`
    Input {
        message: String,
        default: Option<String>,
        secret: bool,
        validator: Option<Validator>,
    },
    Confirm {
        message: String,
        default: bool,
    },
    /// Multi-line text edited in an external editor
    Editor {
        message: String,
        initial: String,
        extension: String,
        validator: Option<Validator>,
    },
}

impl Question {
    pub fn select(message: impl Into<String>, options: Vec<String>) -> Self {
        Question::Select {
            message: message.into(),
            options,
            default: None,
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Question::Input {
            message: message.into(),
            default: None,
            secret: false,
            validator: None,
        }
    }

    pub fn secret(message: impl Into<String>) -> Self {
        Question::Input {
            message: message.into(),
            default: None,
            secret: true,
            validator: None,
        }
    }

    pub fn confirm(message: impl Into<String>, default: bool) -> Self {
        Question::Confirm {
            message: message.into(),
            default,
        }
    }

    pub fn editor(message: impl Into<String>, initial: impl Into<String>) -> Self {
        Question::Editor {
            message: message.into(),
            initial: initial.into(),
            extension: ".json".to_string(),
            validator: None,
        }
    }

    /// Sets the default of a select or input question
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        match &mut self {
            Question::Select { default, .. } | Question::Input { default, .. } => {
                *default = Some(value.into());
            }
            Question::Confirm { .. } | Question::Editor { .. } => {}
        }
        self
    }

    /// Attaches a validator to an input or editor question
    pub fn with_validator<F>(mut self, check: F) -> Self
    where
        F: Fn(&str) -> Result<(), String> + Send + Sync + 'static,
    {
        match &mut self {
            Question::Input { validator, .. } | Question::Editor { validator, .. } => {
                *validator = Some(Arc::new(check));
            }
            Question::Select { .. } | Question::Confirm { .. } => {}
        }
        self
    }

    pub fn message(&self) -> &str {
        match self {
            Question::Select { message, .. }
            | Question::Input { message, .. }
            | Question::Confirm { message, .. }
            | Question::Editor { message, .. } => message,
        }
    }

    pub fn validator(&self) -> Option<&Validator> {
        match self {
            Question::Input { validator, .. } | Question::Editor { validator, .. } => {
                validator.as_ref()
            }
            Question::Select { .. } | Question::Confirm { .. } => None,
        }
    }
}

impl fmt::Debug for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Question::Select { message, options, .. } => f
                .debug_struct("Select")
                .field("message", message)
                .field("options", &options.len())
                .finish(),
            Question::Input { message, secret, .. } => f
                .debug_struct("Input")
                .field("message", message)
                .field("secret", secret)
                .finish(),
            Question::Confirm { message, default } => f
                .debug_struct("Confirm")
                .field("message", message)
                .field("default", default)
                .finish(),
            Question::Editor { message, .. } => {
                f.debug_struct("Editor").field("message", message).finish()
            }
        }
    }
}

/// Typed answer to a [`Question`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Answer {
    Choice(String),
    Text(String),
    Bool(bool),
}

#[derive(Error, Debug)]
pub enum PromptError {
    /// The user pressed an interrupt key
    #[error("Interrupted")]
    Interrupted,

    #[error("Terminal error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Editor error: {0}")]
    Editor(String),

    #[error("Unexpected prompt failure: {0}")]
    Unexpected(String),
}

/// Synchronous prompt capability
pub trait Prompter: Send + Sync {
    fn ask(&self, question: &Question) -> Result<Answer, PromptError>;
}
