//! Web search tool.
//!
//! Queries a search provider, fetches the top result pages and concatenates
//! their paragraph text into a report with one header per source.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::tools::base_tool::{BaseTool, ToolError, ToolInput};
use crate::utilities::string_utils::{decode_html_entities, html_paragraphs, strip_html};

pub const WEB_SEARCH_TOOL_NAME: &str = "web_search_tool";

/// Default number of search results fetched.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Timeout for each result page fetch.
pub const PAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(8);

const NO_RESULTS: &str = "No results found for your query";
const NO_READABLE_ARTICLES: &str = "No readable articles found from the search results.";

static RESULT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b([^>]*\bclass="[^"]*result__a[^"]*"[^>]*)>(.*?)</a>"#).unwrap()
});
static HREF_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\bhref="([^"]*)""#).unwrap());

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    /// Target URL; hits without one are skipped.
    pub href: Option<String>,
}

/// A web search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync + std::fmt::Debug {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError>;
}

/// Fetches a page body.
#[async_trait]
pub trait PageFetcher: Send + Sync + std::fmt::Debug {
    async fn fetch(&self, url: &str) -> Result<String, ToolError>;
}

/// DuckDuckGo's HTML endpoint.
#[derive(Debug, Clone)]
pub struct DuckDuckGoSearch {
    endpoint: String,
    client: reqwest::Client,
}

impl Default for DuckDuckGoSearch {
    fn default() -> Self {
        Self::new("https://html.duckduckgo.com/html/")
    }
}

impl DuckDuckGoSearch {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("Mozilla/5.0 (compatible; blogcrew/1.1)")
            .build()
            .unwrap_or_default();
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }

    /// Parse result links out of a results page.
    pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchHit> {
        RESULT_LINK
            .captures_iter(html)
            .filter_map(|cap| {
                let href = HREF_ATTR
                    .captures(&cap[1])
                    .map(|h| decode_html_entities(&h[1]))
                    .and_then(|h| resolve_redirect(&h));
                let title = strip_html(&cap[2]);
                // Sponsored results point at the ad click tracker.
                if href.as_deref().is_some_and(|h| h.contains("duckduckgo.com/y.js")) {
                    return None;
                }
                Some(SearchHit {
                    title: if title.is_empty() { "No title".to_string() } else { title },
                    href,
                })
            })
            .take(max_results)
            .collect()
    }
}

/// Unwrap DuckDuckGo's `/l/?uddg=` redirect links.
fn resolve_redirect(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{href}")
    } else {
        href.to_string()
    };
    let url = reqwest::Url::parse(&absolute).ok()?;
    if url.host_str().is_some_and(|h| h.ends_with("duckduckgo.com")) && url.path().starts_with("/l/") {
        return url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned());
    }
    Some(absolute)
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("q", query), ("kl", "us-en")])
            .send()
            .await
            .map_err(|e| ToolError::Provider(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Provider(format!("search returned {status}")));
        }
        let html = response
            .text()
            .await
            .map_err(|e| ToolError::Provider(e.to_string()))?;
        Ok(Self::parse_results(&html, max_results))
    }
}

/// Plain HTTP GET with the page fetch timeout.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl Default for HttpPageFetcher {
    fn default() -> Self {
        let client = reqwest::Client::builder()
            .timeout(PAGE_FETCH_TIMEOUT)
            .user_agent("Mozilla/5.0 (compatible; blogcrew/1.1)")
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ToolError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ToolError::Provider(e.to_string()))?;
        response
            .text()
            .await
            .map_err(|e| ToolError::Provider(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// WebSearchTool
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WebSearchTool {
    provider: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(provider: Arc<dyn SearchProvider>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            provider,
            fetcher,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// DuckDuckGo search with plain HTTP page fetches.
    pub fn duckduckgo() -> Self {
        Self::new(
            Arc::new(DuckDuckGoSearch::default()),
            Arc::new(HttpPageFetcher::default()),
        )
    }
}

/// Article body: paragraph texts minus the last one, which is usually a
/// site footer.
pub fn article_text(html: &str) -> String {
    let mut paragraphs = html_paragraphs(html);
    paragraphs.pop();
    paragraphs.join("\n")
}

#[async_trait]
impl BaseTool for WebSearchTool {
    fn name(&self) -> &str {
        WEB_SEARCH_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Search the web and return the text of the top articles. Input: a search query, optionally as JSON {\"query\": ..., \"max_results\": n}."
    }

    async fn execute(&self, input: &ToolInput) -> Result<String, ToolError> {
        if input.query.trim().is_empty() {
            return Err(ToolError::InvalidInput("empty search query".to_string()));
        }
        let max_results = input.usize_param("max_results").unwrap_or(self.max_results);
        log::info!("Web search tool: searching for: {}", input.query);

        let hits = self.provider.search(&input.query, max_results).await?;
        if hits.is_empty() {
            return Err(ToolError::Empty(NO_RESULTS.to_string()));
        }
        log::info!("Web search tool: retrieved {} search results", hits.len());

        let mut articles = Vec::new();
        for (i, hit) in hits.iter().enumerate() {
            let Some(link) = hit.href.as_deref() else {
                continue;
            };
            log::info!("Fetching article {}: {} ({link})", i + 1, hit.title);
            match self.fetcher.fetch(link).await {
                Ok(html) => {
                    let text = article_text(&html);
                    articles.push(format!("### {}\n🔗 {link}\n\n{text}\n", hit.title));
                }
                Err(e) => log::warn!("Skipping {link}: {e}"),
            }
        }

        if articles.is_empty() {
            return Err(ToolError::Empty(NO_READABLE_ARTICLES.to_string()));
        }
        Ok(articles.join("\n\n---\n\n"))
    }

    fn failure_message(&self, error: &ToolError) -> String {
        match error {
            ToolError::Empty(message) => message.clone(),
            other => format!("Error searching the web: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePages, FakeSearch};

    const DDG_PAGE: &str = r#"
        <div class="result results_links">
          <h2 class="result__title">
            <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fedge&amp;rut=abc">Edge <b>Computing</b> Guide</a>
          </h2>
          <a class="result__snippet" href="x">snippet</a>
        </div>
        <div class="result result--ad">
          <a rel="nofollow" class="result__a" href="https://duckduckgo.com/y.js?ad_provider=x">Ad</a>
        </div>
        <div class="result">
          <a rel="nofollow" class="result__a" href="https://blog.example.org/post">Second</a>
        </div>"#;

    #[test]
    fn test_parse_duckduckgo_results() {
        let hits = DuckDuckGoSearch::parse_results(DDG_PAGE, 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Edge Computing Guide");
        assert_eq!(hits[0].href.as_deref(), Some("https://example.com/edge"));
        assert_eq!(hits[1].href.as_deref(), Some("https://blog.example.org/post"));
        assert_eq!(DuckDuckGoSearch::parse_results(DDG_PAGE, 1).len(), 1);
    }

    #[test]
    fn test_article_text_drops_last_paragraph() {
        let html = "<p>One</p><p>Two</p><p>Footer</p>";
        assert_eq!(article_text(html), "One\nTwo");
    }

    #[tokio::test]
    async fn test_report_format_and_skips_failed_pages() {
        let search = FakeSearch::with_hits(vec![
            ("Good", Some("https://good.example")),
            ("No link", None),
            ("Broken", Some("https://broken.example")),
        ]);
        let pages = FakePages::new(&[("https://good.example", "<p>Body</p><p>Footer</p>")]);
        let tool = WebSearchTool::new(Arc::new(search), Arc::new(pages));
        let out = tool.run(&ToolInput::new("edge")).await;
        assert_eq!(out, "### Good\n🔗 https://good.example\n\nBody\n");
    }

    #[tokio::test]
    async fn test_multiple_articles_joined_with_rule() {
        let search = FakeSearch::with_hits(vec![("A", Some("https://a")), ("B", Some("https://b"))]);
        let pages = FakePages::new(&[("https://a", "<p>a</p><p>x</p>"), ("https://b", "<p>b</p><p>x</p>")]);
        let tool = WebSearchTool::new(Arc::new(search), Arc::new(pages));
        let out = tool.run(&ToolInput::new("q")).await;
        assert_eq!(out, "### A\n🔗 https://a\n\na\n\n\n---\n\n### B\n🔗 https://b\n\nb\n");
    }

    #[tokio::test]
    async fn test_no_results_message() {
        let tool = WebSearchTool::new(Arc::new(FakeSearch::with_hits(vec![])), Arc::new(FakePages::new(&[])));
        assert_eq!(tool.run(&ToolInput::new("q")).await, NO_RESULTS);
    }

    #[tokio::test]
    async fn test_no_readable_articles_message() {
        let search = FakeSearch::with_hits(vec![("A", Some("https://a"))]);
        let tool = WebSearchTool::new(Arc::new(search), Arc::new(FakePages::new(&[])));
        assert_eq!(tool.run(&ToolInput::new("q")).await, NO_READABLE_ARTICLES);
    }

    #[tokio::test]
    async fn test_provider_failure_message() {
        let tool = WebSearchTool::new(Arc::new(FakeSearch::failing()), Arc::new(FakePages::new(&[])));
        let out = tool.run(&ToolInput::new("q")).await;
        assert!(out.starts_with("Error searching the web: "));
    }
}
