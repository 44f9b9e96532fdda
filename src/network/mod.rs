//! Network layer - request execution and response classification
//!
//! The engine sends one request per call and hands the body to the
//! classifier, which decides between in-memory text and an on-disk file.

pub mod classifier;
pub mod client;
pub mod response;

pub use classifier::{classify, is_text_content};
pub use client::{EngineConfig, HttpEngine};
pub use response::{BinaryContent, Body, Response, ResponseHeaders};
