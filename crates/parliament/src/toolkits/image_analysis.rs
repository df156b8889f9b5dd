use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use url::Url;

use super::Toolkit;
use crate::errors::{ToolError, ToolResult};
use crate::models::content::Content;
use crate::models::message::Message;
use crate::models::tool::{Tool, ToolCall};
use crate::providers::factory::ModelHandle;

const SYSTEM_PROMPT: &str =
    "You are an image analyst. Describe what the image shows and answer the question about it \
     factually. If the question cannot be answered from the image, say so.";

/// Answers questions about images by sending them to a dedicated vision
/// model handle.
pub struct ImageAnalysisToolkit {
    tools: Vec<Tool>,
    model: ModelHandle,
    client: reqwest::Client,
}

impl ImageAnalysisToolkit {
    pub fn new(model: ModelHandle) -> anyhow::Result<Self> {
        let analyze_image_tool = Tool::new(
            "analyze_image",
            "Analyze an image from a local path or an http(s) URL and answer a question about it.",
            json!({
                "type": "object",
                "required": ["image"],
                "properties": {
                    "image": {
                        "type": "string",
                        "description": "Path or http(s) URL of the image."
                    },
                    "question": {
                        "type": "string",
                        "default": null,
                        "description": "What to find out about the image. Defaults to a general description."
                    }
                }
            }),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            tools: vec![analyze_image_tool],
            model,
            client,
        })
    }

    async fn load_image(&self, image: &str) -> ToolResult<(String, String)> {
        if let Ok(url) = Url::parse(image) {
            if url.scheme() == "http" || url.scheme() == "https" {
                let response = self
                    .client
                    .get(url.clone())
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| {
                        ToolError::ExecutionError(format!("Failed to fetch '{}': {}", image, e))
                    })?;
                let mime_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .filter(|v| v.starts_with("image/"))
                    .map(str::to_string)
                    .unwrap_or_else(|| mime_for_path(url.path()));
                let bytes = response.bytes().await.map_err(|e| {
                    ToolError::ExecutionError(format!("Failed to read '{}': {}", image, e))
                })?;
                return Ok((BASE64.encode(bytes), mime_type));
            }
        }

        let bytes = std::fs::read(image).map_err(|e| {
            ToolError::ExecutionError(format!("Failed to read image '{}': {}", image, e))
        })?;
        Ok((BASE64.encode(bytes), mime_for_path(image)))
    }

    async fn analyze_image(&self, params: Value) -> ToolResult<Vec<Content>> {
        let image = params
            .get("image")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("'image' must be provided".into()))?;
        let question = params
            .get("question")
            .and_then(|v| v.as_str())
            .unwrap_or("Describe the image in detail.");

        let (data, mime_type) = self.load_image(image).await?;

        let message = Message::user()
            .with_text(question)
            .with_image(data, mime_type);

        let (response, _usage) = self
            .model
            .complete(SYSTEM_PROMPT, &[message], &[])
            .await
            .map_err(|e| ToolError::ExecutionError(format!("Image model call failed: {}", e)))?;

        Ok(vec![Content::text(response.text())])
    }
}

fn mime_for_path(path: &str) -> String {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/png",
    }
    .to_string()
}

#[async_trait]
impl Toolkit for ImageAnalysisToolkit {
    fn name(&self) -> &str {
        "image"
    }

    fn description(&self) -> &str {
        "Analyze images from disk or the web and answer questions about their content."
    }

    fn instructions(&self) -> &str {
        "Pass the image location plus a focused question for the best answers."
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> ToolResult<Vec<Content>> {
        match tool_call.name.as_str() {
            "analyze_image" => self.analyze_image(tool_call.arguments).await,
            _ => Err(ToolError::NotFound(tool_call.name)),
        }
    }
}
