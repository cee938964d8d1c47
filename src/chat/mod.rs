//! Conversational path.
//!
//! ```text
//! User message
//!   → QueryRouter (one-word classification: content | chat)
//!   → content: the crew pipeline
//!   → chat:    Assistant (knowledge base context + off-topic reminder)
//! ```

pub mod assistant;
pub mod router;
pub mod session;

pub use assistant::{Assistant, AssistantReply, OFF_TOPIC_MARKER};
pub use router::{QueryRouter, Route};
pub use session::OffTopicTracker;
