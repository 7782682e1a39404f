//! Web tools backed by the Exa search API
//!
//! Three tools: `search` (query the web), `find_similar` (pages similar
//! to a URL), `get_contents` (page text by result id). Results are
//! flattened to a compact text block for the LLM.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::Error;
use crate::Result;

use super::Tool;

const EXA_API_URL: &str = "https://api.exa.ai";
const RESULT_COUNT: usize = 5;

/// Cap on the text returned to the LLM per call.
const MAX_OUTPUT_CHARS: usize = 10_000;

#[derive(Debug, Deserialize)]
struct ExaResults {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExaResult {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Shared HTTP client for the Exa API.
#[derive(Clone)]
pub struct ExaClient {
    api_key: String,
    http_client: Client,
}

impl ExaClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            http_client: Client::new(),
        }
    }

    async fn post(&self, path: &str, body: Value) -> Result<ExaResults> {
        let response = self
            .http_client
            .post(format!("{EXA_API_URL}{path}"))
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Tool(format!("Exa request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Tool(format!("Exa API error {status}: {text}")));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Tool(format!("Malformed Exa response: {e}")))
    }

    async fn search(&self, query: &str) -> Result<String> {
        let results = self
            .post(
                "/search",
                json!({
                    "query": query,
                    "numResults": RESULT_COUNT,
                    "useAutoprompt": true,
                }),
            )
            .await?;
        Ok(format_results(&results))
    }

    async fn find_similar(&self, url: &str) -> Result<String> {
        let results = self
            .post(
                "/findSimilar",
                json!({
                    "url": url,
                    "numResults": RESULT_COUNT,
                }),
            )
            .await?;
        Ok(format_results(&results))
    }

    async fn get_contents(&self, ids: &[String]) -> Result<String> {
        let results = self
            .post(
                "/contents",
                json!({
                    "ids": ids,
                    "text": true,
                }),
            )
            .await?;
        Ok(format_results(&results))
    }
}

/// Flatten API results into a text block, bounded in size.
fn format_results(results: &ExaResults) -> String {
    if results.results.is_empty() {
        return "No results.".to_string();
    }

    let mut out = String::new();
    for (i, r) in results.results.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} ({})\n   id: {}\n",
            i + 1,
            r.title.as_deref().unwrap_or("(untitled)"),
            r.url,
            r.id
        ));
        if let Some(date) = &r.published_date {
            out.push_str(&format!("   published: {date}\n"));
        }
        if let Some(text) = &r.text {
            out.push_str("   ");
            out.push_str(text.trim());
            out.push('\n');
        }
    }

    if out.len() > MAX_OUTPUT_CHARS {
        let mut cut = MAX_OUTPUT_CHARS;
        while !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
        out.push_str("...\n[Truncated]");
    }
    out
}

/// Search for a webpage based on a query.
pub struct SearchTool {
    client: ExaClient,
}

impl SearchTool {
    pub fn new(client: ExaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search for a webpage based on the query."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let query = params
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Tool("Missing 'query' parameter".to_string()))?;

        self.client.search(query).await
    }
}

/// Search for webpages similar to a given URL.
pub struct FindSimilarTool {
    client: ExaClient,
}

impl FindSimilarTool {
    pub fn new(client: ExaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for FindSimilarTool {
    fn name(&self) -> &str {
        "find_similar"
    }

    fn description(&self) -> &str {
        "Search for webpages similar to a given URL."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "URL to find similar pages for"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let url = params
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Tool("Missing 'url' parameter".to_string()))?;

        self.client.find_similar(url).await
    }
}

/// Get the contents of webpages by result id.
pub struct GetContentsTool {
    client: ExaClient,
}

impl GetContentsTool {
    pub fn new(client: ExaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetContentsTool {
    fn name(&self) -> &str {
        "get_contents"
    }

    fn description(&self) -> &str {
        "Get the contents of a webpage."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ids": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Result ids from a previous search"
                }
            },
            "required": ["ids"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let ids: Vec<String> = params
            .get("ids")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::Tool("Missing 'ids' parameter".to_string()))?
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect();

        if ids.is_empty() {
            return Err(Error::Tool("'ids' must contain at least one id".to_string()));
        }

        self.client.get_contents(&ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(json: &str) -> ExaResults {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_format_results() {
        let parsed = results(
            r#"{
                "results": [
                    {"id": "doc1", "title": "Rust Book", "url": "https://doc.rust-lang.org/book/", "publishedDate": "2024-01-01"},
                    {"id": "doc2", "url": "https://example.com"}
                ]
            }"#,
        );

        let text = format_results(&parsed);
        assert!(text.contains("1. Rust Book"));
        assert!(text.contains("id: doc1"));
        assert!(text.contains("published: 2024-01-01"));
        assert!(text.contains("2. (untitled)"));
    }

    #[test]
    fn test_format_empty_results() {
        assert_eq!(format_results(&results(r#"{"results": []}"#)), "No results.");
    }

    #[test]
    fn test_format_truncates_long_text() {
        let long = "x".repeat(MAX_OUTPUT_CHARS * 2);
        let parsed = ExaResults {
            results: vec![ExaResult {
                id: "doc1".to_string(),
                title: None,
                url: String::new(),
                published_date: None,
                text: Some(long),
            }],
        };

        let text = format_results(&parsed);
        assert!(text.len() <= MAX_OUTPUT_CHARS + 20);
        assert!(text.ends_with("[Truncated]"));
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let tool = SearchTool::new(ExaClient::new("key"));
        let err = tool.execute(json!({})).await.unwrap_err();
        assert!(err.to_string().contains("query"));
    }

    #[tokio::test]
    async fn test_find_similar_requires_url() {
        let tool = FindSimilarTool::new(ExaClient::new("key"));
        let err = tool.execute(json!({"urls": "typo"})).await.unwrap_err();
        assert!(err.to_string().contains("url"));
    }

    #[tokio::test]
    async fn test_get_contents_requires_ids() {
        let tool = GetContentsTool::new(ExaClient::new("key"));
        assert!(tool.execute(json!({})).await.is_err());
        assert!(tool.execute(json!({"ids": []})).await.is_err());
    }
}
