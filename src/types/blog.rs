//! The structured blog post produced by the content pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field names every blog record must carry.
pub const BLOG_RECORD_FIELDS: [&str; 4] = ["title", "blog_post", "meta_description", "blog_preview"];

/// A finished blog post. All four fields are non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogRecord {
    /// Post title.
    pub title: String,
    /// Post body in markdown.
    pub blog_post: String,
    /// SEO description, at most 160 characters when synthesized.
    pub meta_description: String,
    /// Short teaser.
    pub blog_preview: String,
}

impl BlogRecord {
    /// Accept `value` only if it is an object whose four fields are all
    /// non-empty strings.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let field = |name: &str| -> Option<String> {
            match obj.get(name)? {
                Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
                _ => None,
            }
        };
        Some(Self {
            title: field("title")?,
            blog_post: field("blog_post")?,
            meta_description: field("meta_description")?,
            blog_preview: field("blog_preview")?,
        })
    }

    pub fn is_complete(&self) -> bool {
        [&self.title, &self.blog_post, &self.meta_description, &self.blog_preview]
            .iter()
            .all(|f| !f.trim().is_empty())
    }
}
