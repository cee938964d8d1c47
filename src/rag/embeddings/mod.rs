//! Embedding providers for the retrieval subsystem.

pub mod google;

pub use google::GoogleEmbedding;
