//! Completion provider implementations.
//!
//! Each provider implements [`BaseLLM`](crate::llms::base_llm::BaseLLM).
//! Only the OpenAI-compatible wire format is needed; Groq and most hosted
//! inference services accept it.

pub mod openai;
