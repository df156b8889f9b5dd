use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Toolkit;
use crate::errors::{ToolError, ToolResult};
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};

/// Writes text files under a configured output directory.
pub struct FileWriteToolkit {
    tools: Vec<Tool>,
    output_dir: PathBuf,
}

impl FileWriteToolkit {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let write_file_tool = Tool::new(
            "write_file",
            "Write text content to a file in the output directory, creating parent directories as needed.",
            json!({
                "type": "object",
                "required": ["filename", "content"],
                "properties": {
                    "filename": {
                        "type": "string",
                        "description": "Path of the file relative to the output directory."
                    },
                    "content": {
                        "type": "string",
                        "description": "The full text content to write."
                    }
                }
            }),
        );

        Self {
            tools: vec![write_file_tool],
            output_dir: output_dir.into(),
        }
    }

    // Relative paths only; the output directory is the boundary.
    fn resolve_path(&self, filename: &str) -> ToolResult<PathBuf> {
        let path = Path::new(filename);
        if path.is_absolute() {
            return Err(ToolError::InvalidParameters(format!(
                "'{}' is absolute, paths must be relative to the output directory",
                filename
            )));
        }
        if path
            .components()
            .any(|component| matches!(component, Component::ParentDir))
        {
            return Err(ToolError::InvalidParameters(format!(
                "'{}' escapes the output directory",
                filename
            )));
        }
        Ok(self.output_dir.join(path))
    }

    async fn write_file(&self, params: Value) -> ToolResult<Vec<Content>> {
        let filename = params
            .get("filename")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("'filename' must be provided".into()))?;
        let content = params
            .get("content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("'content' must be provided".into()))?;

        let path = self.resolve_path(filename)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ToolError::ExecutionError(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        std::fs::write(&path, content).map_err(|e| {
            ToolError::ExecutionError(format!("Failed to write '{}': {}", path.display(), e))
        })?;

        tracing::debug!(path = %path.display(), bytes = content.len(), "wrote file");

        Ok(vec![Content::text(format!(
            "Wrote {} bytes to {}",
            content.len(),
            path.display()
        ))])
    }
}

#[async_trait]
impl Toolkit for FileWriteToolkit {
    fn name(&self) -> &str {
        "file"
    }

    fn description(&self) -> &str {
        "Write text files, such as reports or notes, into the working output directory."
    }

    fn instructions(&self) -> &str {
        "Use relative file names; files land in the configured output directory."
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> ToolResult<Vec<Content>> {
        match tool_call.name.as_str() {
            "write_file" => self.write_file(tool_call.arguments).await,
            _ => Err(ToolError::NotFound(tool_call.name)),
        }
    }
}
