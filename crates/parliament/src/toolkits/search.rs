use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Toolkit;
use crate::errors::{ToolError, ToolResult};
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};

const MAX_RESULTS: usize = 5;

/// Credentials for the search backends. DuckDuckGo and Wikipedia need
/// none; Google Custom Search requires both fields.
#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    pub google_api_key: Option<String>,
    pub search_engine_id: Option<String>,
}

impl SearchConfig {
    pub fn from_env() -> Self {
        Self {
            google_api_key: std::env::var("GOOGLE_API_KEY").ok(),
            search_engine_id: std::env::var("SEARCH_ENGINE_ID").ok(),
        }
    }
}

/// Web search over DuckDuckGo, Google Custom Search and Wikipedia.
pub struct SearchToolkit {
    tools: Vec<Tool>,
    config: SearchConfig,
    client: reqwest::Client,
}

impl SearchToolkit {
    pub fn new(config: SearchConfig) -> anyhow::Result<Self> {
        let query_schema = |description: &str| {
            json!({
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": {
                        "type": "string",
                        "description": description
                    }
                }
            })
        };

        let tools = vec![
            Tool::new(
                "search_duckduckgo",
                "Search DuckDuckGo and return instant-answer results as JSON rows.",
                query_schema("The search query."),
            ),
            Tool::new(
                "search_google",
                "Search the web via the Google Custom Search API and return result rows.",
                query_schema("The search query."),
            ),
            Tool::new(
                "search_wiki",
                "Look up an entity on Wikipedia and return its summary.",
                json!({
                    "type": "object",
                    "required": ["entity"],
                    "properties": {
                        "entity": {
                            "type": "string",
                            "description": "The entity or article title to look up."
                        }
                    }
                }),
            ),
        ];

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            tools,
            config,
            client,
        })
    }

    fn query_param(params: &Value, key: &str) -> ToolResult<String> {
        params
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| ToolError::InvalidParameters(format!("'{}' must be provided", key)))
    }

    async fn get_json(&self, url: &str) -> ToolResult<Value> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, "parliament/0.1")
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ToolError::ExecutionError(format!("Search request failed: {}", e)))?;
        response
            .json()
            .await
            .map_err(|e| ToolError::ExecutionError(format!("Search response not JSON: {}", e)))
    }

    async fn search_duckduckgo(&self, params: Value) -> ToolResult<Vec<Content>> {
        let query = Self::query_param(&params, "query")?;
        let url = format!(
            "https://api.duckduckgo.com/?q={}&format=json&no_html=1",
            urlencoding::encode(&query)
        );
        let data = self.get_json(&url).await?;

        let mut rows = Vec::new();
        let abstract_text = data["AbstractText"].as_str().unwrap_or_default();
        if !abstract_text.is_empty() {
            rows.push(json!({
                "result_id": rows.len() + 1,
                "title": data["Heading"].as_str().unwrap_or(&query),
                "description": abstract_text,
                "url": data["AbstractURL"].as_str().unwrap_or_default(),
            }));
        }
        if let Some(topics) = data["RelatedTopics"].as_array() {
            for topic in topics {
                if rows.len() >= MAX_RESULTS {
                    break;
                }
                let text = topic["Text"].as_str().unwrap_or_default();
                if text.is_empty() {
                    continue;
                }
                rows.push(json!({
                    "result_id": rows.len() + 1,
                    "title": text.split(" - ").next().unwrap_or(text),
                    "description": text,
                    "url": topic["FirstURL"].as_str().unwrap_or_default(),
                }));
            }
        }

        tracing::debug!(query = %query, results = rows.len(), "duckduckgo search");
        Ok(vec![Content::text(render_rows(&query, &rows)?)])
    }

    async fn search_google(&self, params: Value) -> ToolResult<Vec<Content>> {
        let query = Self::query_param(&params, "query")?;
        let (api_key, engine_id) = match (
            self.config.google_api_key.as_deref(),
            self.config.search_engine_id.as_deref(),
        ) {
            (Some(key), Some(id)) => (key, id),
            _ => {
                return Err(ToolError::ExecutionError(
                    "Google search requires the GOOGLE_API_KEY and SEARCH_ENGINE_ID environment variables".into(),
                ))
            }
        };

        let url = format!(
            "https://www.googleapis.com/customsearch/v1?key={}&cx={}&q={}",
            urlencoding::encode(api_key),
            urlencoding::encode(engine_id),
            urlencoding::encode(&query)
        );
        let data = self.get_json(&url).await?;

        let mut rows = Vec::new();
        if let Some(items) = data["items"].as_array() {
            for item in items.iter().take(MAX_RESULTS) {
                rows.push(json!({
                    "result_id": rows.len() + 1,
                    "title": item["title"].as_str().unwrap_or_default(),
                    "description": item["snippet"].as_str().unwrap_or_default(),
                    "url": item["link"].as_str().unwrap_or_default(),
                }));
            }
        }

        tracing::debug!(query = %query, results = rows.len(), "google search");
        Ok(vec![Content::text(render_rows(&query, &rows)?)])
    }

    async fn search_wiki(&self, params: Value) -> ToolResult<Vec<Content>> {
        let entity = Self::query_param(&params, "entity")?;
        let url = format!(
            "https://en.wikipedia.org/api/rest_v1/page/summary/{}",
            urlencoding::encode(&entity.replace(' ', "_"))
        );
        let data = self.get_json(&url).await?;

        let extract = data["extract"].as_str().unwrap_or_default();
        if extract.is_empty() {
            return Err(ToolError::ExecutionError(format!(
                "No Wikipedia summary found for '{}'",
                entity
            )));
        }

        let summary = json!({
            "title": data["title"].as_str().unwrap_or(&entity),
            "summary": extract,
            "url": data["content_urls"]["desktop"]["page"].as_str().unwrap_or_default(),
        });

        tracing::debug!(entity = %entity, "wikipedia lookup");
        Ok(vec![Content::text(
            serde_json::to_string_pretty(&summary)
                .map_err(|e| ToolError::Internal(e.to_string()))?,
        )])
    }
}

fn render_rows(query: &str, rows: &[Value]) -> ToolResult<String> {
    if rows.is_empty() {
        return Ok(format!("No results found for '{}'.", query));
    }
    serde_json::to_string_pretty(rows).map_err(|e| ToolError::Internal(e.to_string()))
}

#[async_trait]
impl Toolkit for SearchToolkit {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search the web via DuckDuckGo, Google Custom Search and Wikipedia."
    }

    fn instructions(&self) -> &str {
        "Use search_wiki for well-known entities and the web searches for everything else."
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> ToolResult<Vec<Content>> {
        match tool_call.name.as_str() {
            "search_duckduckgo" => self.search_duckduckgo(tool_call.arguments).await,
            "search_google" => self.search_google(tool_call.arguments).await,
            "search_wiki" => self.search_wiki(tool_call.arguments).await,
            _ => Err(ToolError::NotFound(tool_call.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    #[test]
    fn test_exposes_three_tools() {
        let toolkit = SearchToolkit::new(SearchConfig::default()).unwrap();
        let names: Vec<&str> = toolkit.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["search_duckduckgo", "search_google", "search_wiki"]
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::set_var("GOOGLE_API_KEY", "key");
        std::env::set_var("SEARCH_ENGINE_ID", "engine");
        let config = SearchConfig::from_env();
        assert_eq!(config.google_api_key.as_deref(), Some("key"));
        assert_eq!(config.search_engine_id.as_deref(), Some("engine"));

        std::env::remove_var("GOOGLE_API_KEY");
        std::env::remove_var("SEARCH_ENGINE_ID");
        let config = SearchConfig::from_env();
        assert!(config.google_api_key.is_none());
        assert!(config.search_engine_id.is_none());
    }

    #[tokio::test]
    async fn test_google_without_credentials() {
        let toolkit = SearchToolkit::new(SearchConfig::default()).unwrap();
        let result = toolkit
            .call(ToolCall::new("search_google", json!({"query": "rust"})))
            .await;
        match result {
            Err(ToolError::ExecutionError(msg)) => {
                assert!(msg.contains("GOOGLE_API_KEY"));
            }
            other => panic!("Expected ExecutionError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let toolkit = SearchToolkit::new(SearchConfig::default()).unwrap();
        let result = toolkit
            .call(ToolCall::new("search_duckduckgo", json!({"query": "  "})))
            .await;
        assert!(matches!(result, Err(ToolError::InvalidParameters(_))));
    }

    #[test]
    fn test_render_rows_empty() {
        let rendered = render_rows("nothing", &[]).unwrap();
        assert!(rendered.contains("No results"));
    }
}
