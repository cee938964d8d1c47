//! Search trends tool.
//!
//! Reports the top related queries and topics for a keyword over the past
//! three months in the US.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::base_tool::{BaseTool, ToolError, ToolInput};

pub const TRENDS_TOOL_NAME: &str = "google_trends_tool";

/// Number of related queries and topics reported.
pub const TOP_N: usize = 5;

const TRENDS_FAILURE: &str =
    "Failed to fetch Google Trends data. Please proceed with general knowledge.";

const TRENDS_BASE: &str = "https://trends.google.com";
const HOST_LANGUAGE: &str = "en-US";
const TIMEZONE_OFFSET: &str = "360";
const TIMEFRAME: &str = "today 3-m";
const GEO: &str = "US";

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RelatedQuery {
    pub query: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelatedTopic {
    pub title: String,
    pub topic_type: String,
    pub value: i64,
}

/// Top related queries and topics for one keyword.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendsReport {
    pub queries: Vec<RelatedQuery>,
    pub topics: Vec<RelatedTopic>,
}

impl TrendsReport {
    /// Render the report as the tool's text output.
    pub fn render(&self, keyword: &str) -> String {
        let mut out = format!("Google Trends Analysis for '{keyword}' (Past 3 months, US):\n\n");
        if self.queries.is_empty() {
            out.push_str("No related queries found.\n");
        } else {
            out.push_str("Top 5 Related Queries:\n");
            out.push_str(
                &self
                    .queries
                    .iter()
                    .map(|q| format!("- {} (Score: {})", q.query, q.value))
                    .collect::<Vec<_>>()
                    .join("\n"),
            );
        }
        if self.topics.is_empty() {
            out.push_str("No related topics found.\n");
        } else {
            out.push_str("\n\nTop 5 Related Topics:\n");
            out.push_str(
                &self
                    .topics
                    .iter()
                    .map(|t| format!("- {} (Type: {}, Score: {})", t.title, t.topic_type, t.value))
                    .collect::<Vec<_>>()
                    .join("\n"),
            );
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TrendsProvider: Send + Sync + std::fmt::Debug {
    async fn related(&self, keyword: &str) -> Result<TrendsReport, ToolError>;
}

/// Google Trends via its public web widgets API.
#[derive(Debug, Clone)]
pub struct GoogleTrendsClient {
    base_url: String,
    client: reqwest::Client,
}

impl Default for GoogleTrendsClient {
    fn default() -> Self {
        Self::new(TRENDS_BASE)
    }
}

impl GoogleTrendsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .cookie_store(true)
            .user_agent("Mozilla/5.0 (compatible; blogcrew/1.1)")
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ToolError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .query(query)
            .send()
            .await
            .map_err(|e| ToolError::Provider(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::Provider(e.to_string()))?;
        if !status.is_success() {
            return Err(ToolError::Provider(format!("trends returned {status}")));
        }
        parse_guarded_json(&body)
    }
}

/// Parse a trends response, skipping the anti-JSON-hijacking prefix
/// (`)]}'` or `)]}',`) in front of the payload.
pub fn parse_guarded_json(body: &str) -> Result<Value, ToolError> {
    let start = body
        .find('{')
        .ok_or_else(|| ToolError::Provider("trends response has no JSON payload".to_string()))?;
    serde_json::from_str(&body[start..]).map_err(|e| ToolError::Provider(e.to_string()))
}

/// The top ranked list of a `relatedsearches` response.
fn top_ranked(response: &Value) -> Vec<Value> {
    response
        .pointer("/default/rankedList/0/rankedKeyword")
        .and_then(|v| v.as_array())
        .map(|items| items.iter().take(TOP_N).cloned().collect())
        .unwrap_or_default()
}

pub fn parse_related_queries(response: &Value) -> Vec<RelatedQuery> {
    top_ranked(response)
        .iter()
        .filter_map(|item| {
            Some(RelatedQuery {
                query: item.get("query")?.as_str()?.to_string(),
                value: item.get("value").and_then(|v| v.as_i64()).unwrap_or(0),
            })
        })
        .collect()
}

pub fn parse_related_topics(response: &Value) -> Vec<RelatedTopic> {
    top_ranked(response)
        .iter()
        .filter_map(|item| {
            let topic = item.get("topic")?;
            Some(RelatedTopic {
                title: topic.get("title")?.as_str()?.to_string(),
                topic_type: topic
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("Topic")
                    .to_string(),
                value: item.get("value").and_then(|v| v.as_i64()).unwrap_or(0),
            })
        })
        .collect()
}

#[async_trait]
impl TrendsProvider for GoogleTrendsClient {
    async fn related(&self, keyword: &str) -> Result<TrendsReport, ToolError> {
        // Seeds the session cookie the widget endpoints require.
        if let Err(e) = self
            .client
            .get(format!("{}/?geo={GEO}", self.base_url))
            .send()
            .await
        {
            log::debug!("Google Trends cookie request failed: {e}; continuing without it");
        }

        let explore_req = serde_json::json!({
            "comparisonItem": [{ "keyword": keyword, "geo": GEO, "time": TIMEFRAME }],
            "category": 0,
            "property": "",
        });
        let explore = self
            .get_json(
                "/trends/api/explore",
                &[
                    ("hl", HOST_LANGUAGE.to_string()),
                    ("tz", TIMEZONE_OFFSET.to_string()),
                    ("req", explore_req.to_string()),
                ],
            )
            .await?;

        let widgets = explore
            .get("widgets")
            .and_then(|w| w.as_array())
            .ok_or_else(|| ToolError::Provider("explore response has no widgets".to_string()))?;

        let mut report = TrendsReport::default();
        for widget in widgets {
            let id = widget.get("id").and_then(|i| i.as_str()).unwrap_or_default();
            if id != "RELATED_QUERIES" && id != "RELATED_TOPICS" {
                continue;
            }
            let (Some(token), Some(request)) = (
                widget.get("token").and_then(|t| t.as_str()),
                widget.get("request"),
            ) else {
                continue;
            };
            let data = self
                .get_json(
                    "/trends/api/widgetdata/relatedsearches",
                    &[
                        ("hl", HOST_LANGUAGE.to_string()),
                        ("tz", TIMEZONE_OFFSET.to_string()),
                        ("req", request.to_string()),
                        ("token", token.to_string()),
                    ],
                )
                .await?;
            if id == "RELATED_QUERIES" {
                report.queries = parse_related_queries(&data);
            } else {
                report.topics = parse_related_topics(&data);
            }
        }
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// TrendsTool
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TrendsTool {
    provider: Arc<dyn TrendsProvider>,
}

impl TrendsTool {
    pub fn new(provider: Arc<dyn TrendsProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl BaseTool for TrendsTool {
    fn name(&self) -> &str {
        TRENDS_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Analyze search trends for a keyword and return the top related queries and topics over the past three months. Input: a keyword."
    }

    async fn execute(&self, input: &ToolInput) -> Result<String, ToolError> {
        if input.query.trim().is_empty() {
            return Err(ToolError::InvalidInput("empty keyword".to_string()));
        }
        let report = self.provider.related(&input.query).await?;
        log::info!("Trends tool: found related queries and topics for '{}'", input.query);
        Ok(report.render(&input.query))
    }

    fn failure_message(&self, _error: &ToolError) -> String {
        TRENDS_FAILURE.to_string()
    }
}
