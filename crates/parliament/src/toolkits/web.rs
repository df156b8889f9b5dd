use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};

use super::Toolkit;
use crate::errors::{ToolError, ToolResult};
use crate::models::content::Content;
use crate::models::message::Message;
use crate::models::tool::{Tool, ToolCall};
use crate::prompt_template::load_prompt_file;
use crate::providers::factory::ModelHandle;

// Pages are cut off here before they reach the model.
const MAX_PAGE_CHARS: usize = 12_000;

const PLAN_SYSTEM_PROMPT: &str = "You draft short extraction plans for a web agent.";
const EXTRACT_SYSTEM_PROMPT: &str =
    "You extract information from fetched web pages and answer strictly from their content.";

#[derive(Serialize)]
struct PlanContext {
    task: String,
    url: String,
}

#[derive(Serialize)]
struct ExtractContext {
    task: String,
    url: String,
    plan: String,
    page: String,
}

/// Fetches web pages over HTTP and extracts task-relevant information with
/// a pair of dedicated model handles: one plans the extraction, the other
/// reads the page.
pub struct WebToolkit {
    tools: Vec<Tool>,
    client: reqwest::Client,
    web_model: ModelHandle,
    planning_model: ModelHandle,
}

impl WebToolkit {
    pub fn new(web_model: ModelHandle, planning_model: ModelHandle) -> anyhow::Result<Self> {
        let browse_url_tool = Tool::new(
            "browse_url",
            "Fetch a web page and extract the information relevant to a task from its content.",
            json!({
                "type": "object",
                "required": ["task", "url"],
                "properties": {
                    "task": {
                        "type": "string",
                        "description": "What to find out from the page."
                    },
                    "url": {
                        "type": "string",
                        "description": "The http(s) URL to fetch."
                    }
                }
            }),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent("Mozilla/5.0 (compatible; parliament/0.1)")
            .build()?;

        Ok(Self {
            tools: vec![browse_url_tool],
            client,
            web_model,
            planning_model,
        })
    }

    async fn fetch_page(&self, url: &str) -> ToolResult<String> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ToolError::InvalidParameters(format!(
                "'{}' is not an http(s) URL",
                url
            )));
        }
        let body = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ToolError::ExecutionError(format!("Failed to fetch '{}': {}", url, e)))?
            .text()
            .await
            .map_err(|e| ToolError::ExecutionError(format!("Failed to read '{}': {}", url, e)))?;

        let mut text = html_to_text(&body);
        if text.len() > MAX_PAGE_CHARS {
            let mut cut = MAX_PAGE_CHARS;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
            text.push_str("\n[page truncated]");
        }
        Ok(text)
    }

    async fn browse_url(&self, params: Value) -> ToolResult<Vec<Content>> {
        let task = params
            .get("task")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("'task' must be provided".into()))?;
        let url = params
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("'url' must be provided".into()))?;

        let page = self.fetch_page(url).await?;
        tracing::debug!(url, chars = page.len(), "fetched page");

        let plan_prompt = load_prompt_file(
            "web_plan.md",
            &PlanContext {
                task: task.to_string(),
                url: url.to_string(),
            },
        )
        .map_err(|e| ToolError::Internal(e.to_string()))?;
        let (plan_message, _usage) = self
            .planning_model
            .complete(
                PLAN_SYSTEM_PROMPT,
                &[Message::user().with_text(plan_prompt)],
                &[],
            )
            .await
            .map_err(|e| ToolError::ExecutionError(format!("Planning model call failed: {}", e)))?;

        let extract_prompt = load_prompt_file(
            "web_extract.md",
            &ExtractContext {
                task: task.to_string(),
                url: url.to_string(),
                plan: plan_message.text(),
                page,
            },
        )
        .map_err(|e| ToolError::Internal(e.to_string()))?;
        let (answer, _usage) = self
            .web_model
            .complete(
                EXTRACT_SYSTEM_PROMPT,
                &[Message::user().with_text(extract_prompt)],
                &[],
            )
            .await
            .map_err(|e| ToolError::ExecutionError(format!("Web model call failed: {}", e)))?;

        Ok(vec![Content::text(answer.text())])
    }
}

/// Reduce an HTML document to readable text
fn html_to_text(html: &str) -> String {
    let scripts = Regex::new(r"(?is)<(script|style|noscript)\b.*?</(script|style|noscript)>")
        .expect("static regex");
    let breaks = Regex::new(r"(?i)</?(p|div|li|tr|br|h[1-6]|table|section|article)[^>]*>")
        .expect("static regex");
    let tags = Regex::new(r"(?s)<[^>]+>").expect("static regex");
    let blank_lines = Regex::new(r"\n\s*\n+").expect("static regex");
    let spaces = Regex::new(r"[ \t]+").expect("static regex");

    let text = scripts.replace_all(html, " ");
    let text = breaks.replace_all(&text, "\n");
    let text = tags.replace_all(&text, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    let text = spaces.replace_all(&text, " ");
    let text = blank_lines.replace_all(&text, "\n");
    text.trim().to_string()
}

#[async_trait]
impl Toolkit for WebToolkit {
    fn name(&self) -> &str {
        "web"
    }

    fn description(&self) -> &str {
        "Fetch web pages and extract task-relevant information from their content."
    }

    fn instructions(&self) -> &str {
        "State precisely what you want from the page; vague tasks produce vague extractions."
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> ToolResult<Vec<Content>> {
        match tool_call.name.as_str() {
            "browse_url" => self.browse_url(tool_call.arguments).await,
            _ => Err(ToolError::NotFound(tool_call.name)),
        }
    }
}
