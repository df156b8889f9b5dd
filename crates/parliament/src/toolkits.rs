use async_trait::async_trait;

use crate::errors::ToolResult;
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};

pub mod code_execution;
pub mod file_write;
pub mod image_analysis;
pub mod search;
pub mod spreadsheet;
pub mod web;

pub use code_execution::CodeExecutionToolkit;
pub use file_write::FileWriteToolkit;
pub use image_analysis::ImageAnalysisToolkit;
pub use search::{SearchConfig, SearchToolkit};
pub use spreadsheet::SpreadsheetToolkit;
pub use web::WebToolkit;

/// Core trait for a group of related tools an agent can operate.
///
/// Tool names are namespaced as `<toolkit>__<tool>` when flattened for the
/// model; dispatch splits on that prefix to find the owning toolkit.
#[async_trait]
pub trait Toolkit: Send + Sync {
    /// Get the name of the toolkit
    fn name(&self) -> &str;

    /// Get the toolkit description
    fn description(&self) -> &str;

    /// Get toolkit instructions for the agent's system prompt
    fn instructions(&self) -> &str;

    /// Get available tools
    fn tools(&self) -> &[Tool];

    /// Call a tool with the given parameters
    async fn call(&self, tool_call: ToolCall) -> ToolResult<Vec<Content>>;
}
