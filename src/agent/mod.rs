//! Agent module.
//!
//! Contains the [`Agent`] struct: a persona, a tool set and a completion
//! configuration bound together.

pub mod core;

pub use self::core::{Agent, AgentError, DEFAULT_MAX_ITER};
