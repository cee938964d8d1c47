//! Request and response bodies of the HTTP API.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::blog::BlogRecord;

pub const DEFAULT_TOPIC: &str = "auto-generate-topic";
pub const DEFAULT_PLATFORM_GUIDELINES: &str = "Generate a blog post format for tech enthusiasts";
/// Longest accepted topic, in characters.
pub const MAX_TOPIC_CHARS: usize = 500;

/// Voice of the generated post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Informative,
    Engaging,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Informative => "informative",
            Tone::Engaging => "engaging",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content generation (and chat) request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogRequest {
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default = "default_platform_guidelines")]
    pub platform_guidelines: String,
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

fn default_platform_guidelines() -> String {
    DEFAULT_PLATFORM_GUIDELINES.to_string()
}

impl BlogRequest {
    pub fn new(topic: impl Into<String>, tone: Tone) -> Self {
        Self {
            topic: topic.into(),
            tone,
            platform_guidelines: default_platform_guidelines(),
        }
    }

    /// Check the topic is 1 to 500 characters after trimming.
    pub fn validate(&self) -> Result<(), String> {
        let chars = self.topic.trim().chars().count();
        if chars == 0 {
            return Err("topic must not be empty".to_string());
        }
        if chars > MAX_TOPIC_CHARS {
            return Err(format!("topic must be at most {MAX_TOPIC_CHARS} characters"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Result of a content generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogResponse {
    pub status: ResponseStatus,
    pub title: String,
    pub content: String,
    pub meta_description: String,
    pub blog_preview: String,
}

impl BlogResponse {
    pub fn success(record: BlogRecord) -> Self {
        Self {
            status: ResponseStatus::Success,
            title: record.title,
            content: record.blog_post,
            meta_description: record.meta_description,
            blog_preview: record.blog_preview,
        }
    }

    /// The generic failure response; never carries error details.
    pub fn failure() -> Self {
        Self {
            status: ResponseStatus::Error,
            title: "Generation Failed".to_string(),
            content: "Blog generation failed. Please try again later.".to_string(),
            meta_description: "Error in content pipeline.".to_string(),
            blog_preview: String::new(),
        }
    }
}

/// Result of an assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}
