use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Toolkit;
use crate::errors::{ToolError, ToolResult};
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};

/// Reads and writes CSV spreadsheets. Reads may come from anywhere on
/// disk; writes stay under the configured output directory.
pub struct SpreadsheetToolkit {
    tools: Vec<Tool>,
    output_dir: PathBuf,
}

impl SpreadsheetToolkit {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let read_tool = Tool::new(
            "read_spreadsheet",
            "Read a CSV spreadsheet and return its content as a markdown table.",
            json!({
                "type": "object",
                "required": ["path"],
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path of the CSV file to read."
                    }
                }
            }),
        );

        let write_tool = Tool::new(
            "write_spreadsheet",
            "Write rows of cells to a CSV spreadsheet in the output directory.",
            json!({
                "type": "object",
                "required": ["path", "rows"],
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path of the CSV file relative to the output directory."
                    },
                    "rows": {
                        "type": "array",
                        "items": {
                            "type": "array",
                            "items": {"type": "string"}
                        },
                        "description": "The rows to write, the first row being the header."
                    }
                }
            }),
        );

        Self {
            tools: vec![read_tool, write_tool],
            output_dir: output_dir.into(),
        }
    }

    fn resolve_write_path(&self, path_str: &str) -> ToolResult<PathBuf> {
        let path = Path::new(path_str);
        if path.is_absolute()
            || path
                .components()
                .any(|component| matches!(component, Component::ParentDir))
        {
            return Err(ToolError::InvalidParameters(format!(
                "'{}' must stay inside the output directory",
                path_str
            )));
        }
        Ok(self.output_dir.join(path))
    }

    fn resolve_read_path(&self, path_str: &str) -> PathBuf {
        let path = Path::new(path_str);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.output_dir.join(path)
        }
    }

    async fn read_spreadsheet(&self, params: Value) -> ToolResult<Vec<Content>> {
        let path_str = params
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("'path' must be provided".into()))?;
        let path = self.resolve_read_path(path_str);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .map_err(|e| {
                ToolError::ExecutionError(format!("Failed to open '{}': {}", path.display(), e))
            })?;

        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| {
                ToolError::ExecutionError(format!("Failed to parse '{}': {}", path.display(), e))
            })?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(vec![Content::text(rows_to_markdown(&rows))])
    }

    async fn write_spreadsheet(&self, params: Value) -> ToolResult<Vec<Content>> {
        let path_str = params
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("'path' must be provided".into()))?;
        let rows = params
            .get("rows")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ToolError::InvalidParameters("'rows' must be an array".into()))?;

        let path = self.resolve_write_path(path_str)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ToolError::ExecutionError(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut writer = csv::Writer::from_path(&path).map_err(|e| {
            ToolError::ExecutionError(format!("Failed to create '{}': {}", path.display(), e))
        })?;

        let mut written = 0usize;
        for row in rows {
            let cells = row.as_array().ok_or_else(|| {
                ToolError::InvalidParameters("each row must be an array of strings".into())
            })?;
            let record: Vec<String> = cells
                .iter()
                .map(|cell| match cell {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            writer.write_record(&record).map_err(|e| {
                ToolError::ExecutionError(format!("Failed to write '{}': {}", path.display(), e))
            })?;
            written += 1;
        }
        writer.flush().map_err(|e| {
            ToolError::ExecutionError(format!("Failed to flush '{}': {}", path.display(), e))
        })?;

        tracing::debug!(path = %path.display(), rows = written, "wrote spreadsheet");

        Ok(vec![Content::text(format!(
            "Wrote {} rows to {}",
            written,
            path.display()
        ))])
    }
}

fn rows_to_markdown(rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return "(empty spreadsheet)".to_string();
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let render_row = |row: &[String]| {
        let mut cells: Vec<String> = row.iter().map(|cell| cell.replace('|', "\\|")).collect();
        cells.resize(width, String::new());
        format!("| {} |", cells.join(" | "))
    };

    let mut lines = vec![render_row(&rows[0])];
    lines.push(format!("|{}|", vec![" --- "; width].join("|")));
    for row in &rows[1..] {
        lines.push(render_row(row));
    }
    lines.join("\n")
}

#[async_trait]
impl Toolkit for SpreadsheetToolkit {
    fn name(&self) -> &str {
        "sheet"
    }

    fn description(&self) -> &str {
        "Read CSV spreadsheets as markdown tables and write rows back out as CSV."
    }

    fn instructions(&self) -> &str {
        "Treat the first row as the header when reading and writing."
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> ToolResult<Vec<Content>> {
        match tool_call.name.as_str() {
            "read_spreadsheet" => self.read_spreadsheet(tool_call.arguments).await,
            "write_spreadsheet" => self.write_spreadsheet(tool_call.arguments).await,
            _ => Err(ToolError::NotFound(tool_call.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let toolkit = SpreadsheetToolkit::new(temp_dir.path());

        toolkit
            .call(ToolCall::new(
                "write_spreadsheet",
                json!({
                    "path": "laptops.csv",
                    "rows": [
                        ["model", "price"],
                        ["Laptop X", "499"],
                        ["Laptop Y", "799"]
                    ]
                }),
            ))
            .await
            .unwrap();

        let result = toolkit
            .call(ToolCall::new(
                "read_spreadsheet",
                json!({"path": "laptops.csv"}),
            ))
            .await
            .unwrap();

        let table = result[0].as_text().unwrap();
        assert!(table.starts_with("| model | price |"));
        assert!(table.contains("| Laptop X | 499 |"));
        assert!(table.contains("| Laptop Y | 799 |"));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let toolkit = SpreadsheetToolkit::new(temp_dir.path());

        let result = toolkit
            .call(ToolCall::new(
                "read_spreadsheet",
                json!({"path": "missing.csv"}),
            ))
            .await;

        assert!(matches!(result, Err(ToolError::ExecutionError(_))));
    }

    #[tokio::test]
    async fn test_write_rejects_traversal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let toolkit = SpreadsheetToolkit::new(temp_dir.path());

        let result = toolkit
            .call(ToolCall::new(
                "write_spreadsheet",
                json!({"path": "../escape.csv", "rows": []}),
            ))
            .await;

        assert!(matches!(result, Err(ToolError::InvalidParameters(_))));
    }

    #[test]
    fn test_rows_to_markdown_pads_ragged_rows() {
        let rows = vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["1".to_string()],
        ];
        let table = rows_to_markdown(&rows);
        assert!(table.contains("| a | b |"));
        assert!(table.contains("| 1 |  |"));
    }

    #[test]
    fn test_rows_to_markdown_empty() {
        assert_eq!(rows_to_markdown(&[]), "(empty spreadsheet)");
    }
}
