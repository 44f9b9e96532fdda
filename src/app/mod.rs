//! App layer - navigation state machine and its workflows
//!
//! The navigator reads signals from a queue and launches the matching
//! workflow as a task. Each workflow sends back exactly one signal.

pub mod actor;
pub mod commands;
pub mod spinner;
pub mod state;

pub use actor::Navigator;
pub use state::AppContext;
