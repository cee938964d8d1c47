//! Shared record types and API bodies.

pub mod api;
pub mod blog;

pub use api::{BlogRequest, BlogResponse, ChatResponse, ResponseStatus, Tone};
pub use blog::{BlogRecord, BLOG_RECORD_FIELDS};
