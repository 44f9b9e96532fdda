//! Message types flowing between workflows and the navigator.

pub mod signal;

pub use signal::Signal;
