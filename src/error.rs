//! Error taxonomy
//!
//! Validation and state errors are recoverable in place, transport errors are
//! shown verbatim, storage errors abort the triggering operation only. The
//! navigation layer is the single place that turns any of them into text.

use std::path::PathBuf;

use thiserror::Error;

use crate::prompt::PromptError;

/// Boxed source error carried by body stream failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Malformed input: JSON fragments, parameter types, missing fields
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Request name must not be empty")]
    EmptyName,

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("URL must not be empty")]
    EmptyUrl,

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Wrong value type for param {key} : {actual}. Type must be a string")]
    ParamType { key: String, actual: &'static str },

    #[error("Wrong input format for {field}: {reason}")]
    NotAnObject { field: &'static str, reason: String },

    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Invalid cURL command: {0}")]
    Curl(String),

    #[error("{method} requests do not carry {field}")]
    MisplacedField { field: &'static str, method: String },

    #[error("missing required parameter: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid auth: {0}")]
    Auth(String),
}

/// Network-level failures. No retry is ever attempted.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request timed out ({0}s)")]
    Timeout(u64, #[source] reqwest::Error),

    #[error("Connection failed: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Error reading body: {0}")]
    Body(#[source] BoxError),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl TransportError {
    /// Classifies a reqwest failure the way it is reported to the user
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(timeout_secs, err)
        } else if err.is_connect() {
            TransportError::Connect(err)
        } else {
            TransportError::Request(err)
        }
    }
}

/// Anything that can go wrong between a stored request and a response
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to encode payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Temporary file error: {0}")]
    TempFile(#[source] std::io::Error),
}

/// I/O and format failures on the JSON database file
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupted database file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode database: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Database lock poisoned")]
    Poisoned,
}

/// Operations that are invalid in the current state
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("Request {0:?} not found")]
    NotFound(String),

    #[error("No binary content to save")]
    NoBinaryContent,

    #[error("Failed to save file to {path}: {reason}")]
    SaveFailed { path: PathBuf, reason: String },
}

/// Umbrella error for workflows and tool calls
#[derive(Error, Debug)]
pub enum TankerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TankerError {
    /// True when the user interrupted a prompt rather than something failing
    pub fn is_interrupt(&self) -> bool {
        matches!(self, TankerError::Prompt(PromptError::Interrupted))
    }
}

pub type Result<T, E = TankerError> = std::result::Result<T, E>;
