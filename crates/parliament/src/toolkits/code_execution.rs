use async_trait::async_trait;
use serde_json::{json, Value};
use std::process::Command;

use super::Toolkit;
use crate::errors::{ToolError, ToolResult};
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};

/// Runs short Python or shell snippets in a subprocess and captures their
/// output.
pub struct CodeExecutionToolkit {
    tools: Vec<Tool>,
    verbose: bool,
}

impl CodeExecutionToolkit {
    pub fn new(verbose: bool) -> Self {
        let execute_code_tool = Tool::new(
            "execute_code",
            "Execute a code snippet in a subprocess and return its output. \
            Use this for calculations, data munging, or quick scripting.",
            json!({
                "type": "object",
                "required": ["code"],
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "The code snippet to execute."
                    },
                    "language": {
                        "enum": ["python", "bash"],
                        "default": "python",
                        "description": "The language of the snippet. Defaults to python."
                    }
                }
            }),
        );

        Self {
            tools: vec![execute_code_tool],
            verbose,
        }
    }

    async fn execute_code(&self, params: Value) -> ToolResult<Vec<Content>> {
        let code = params
            .get("code")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("'code' must be provided".into()))?;
        let language = params
            .get("language")
            .and_then(|v| v.as_str())
            .unwrap_or("python");

        let interpreter = match language {
            "python" => "python3",
            "bash" | "sh" => "bash",
            other => {
                return Err(ToolError::InvalidParameters(format!(
                    "Unsupported language '{}'",
                    other
                )))
            }
        };

        if self.verbose {
            tracing::debug!(language, code, "executing snippet");
        }

        let output = Command::new(interpreter)
            .arg("-c")
            .arg(code)
            .output()
            .map_err(|e| {
                ToolError::ExecutionError(format!("Failed to spawn {}: {}", interpreter, e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(ToolError::ExecutionError(format!(
                "{} exited with {}:\n{}",
                interpreter, output.status, stderr
            )));
        }

        if self.verbose {
            tracing::debug!(stdout = %stdout, stderr = %stderr, "snippet finished");
        }

        let mut rendered = if stdout.is_empty() {
            "(no output)".to_string()
        } else {
            stdout.to_string()
        };
        if !stderr.is_empty() {
            rendered.push_str(&format!("\nstderr:\n{}", stderr));
        }

        Ok(vec![Content::text(rendered)])
    }
}

#[async_trait]
impl Toolkit for CodeExecutionToolkit {
    fn name(&self) -> &str {
        "code"
    }

    fn description(&self) -> &str {
        "Execute Python or shell snippets in a subprocess and read their output."
    }

    fn instructions(&self) -> &str {
        "Snippets run once per call with no shared state; print anything you need back."
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> ToolResult<Vec<Content>> {
        match tool_call.name.as_str() {
            "execute_code" => self.execute_code(tool_call.arguments).await,
            _ => Err(ToolError::NotFound(tool_call.name)),
        }
    }
}
