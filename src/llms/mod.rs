//! Completion-service layer.
//!
//! - [`base_llm`] - The trait every completion backend implements, plus
//!   call configuration and errors
//! - [`providers`] - Concrete HTTP providers

pub mod base_llm;
pub mod providers;

pub use base_llm::{BaseLLM, LLMConfig, LLMError, LLMMessage, LLMOverrides};
pub use providers::openai::OpenAICompletion;
