//! # http-tanker
//!
//! A terminal workbench for saving, replaying and inspecting HTTP requests.
//!
//! ## Features
//! - HTTP methods: GET, POST, PUT, PATCH, DELETE
//! - JSON params, payload and headers, edited in `$EDITOR`
//! - Auth support (Bearer, Basic, API key)
//! - Binary responses streamed to disk and saved on demand
//! - cURL import/export
//! - JSON syntax highlighting
//! - The same requests exposed as agent tools over stdio
//!
//! ## Architecture
//! Signal-driven navigation:
//! - Navigator (one workflow task at a time, unbounded signal channel)
//! - Workflows (prompts on the blocking pool, rendering through a trait)
//! - Network layer (long-lived reqwest clients, content classifier)

pub mod app;
pub mod config;
pub mod constants;
pub mod curl;
pub mod error;
pub mod messages;
pub mod models;
pub mod network;
pub mod prompt;
pub mod storage;
pub mod tools;
pub mod ui;

// Re-export commonly used types
pub use curl::{parse_curl, to_curl};
pub use error::{Result, TankerError};
pub use messages::Signal;
pub use models::{AuthConfig, HttpMethod, Request, RequestDraft};
pub use network::{EngineConfig, HttpEngine, Response};
pub use storage::Storage;
pub use tools::ToolBox;
