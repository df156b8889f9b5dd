use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ToolError, ToolResult};
use crate::models::content::Content;
use crate::models::message::{Message, ToolRequest};
use crate::models::tool::{Tool, ToolCall};
use crate::providers::base::Usage;
use crate::providers::factory::ModelHandle;
use crate::toolkits::Toolkit;

/// Record of one executed tool call, kept for the transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub arguments: Value,
    pub result: String,
}

/// Outcome of one agent turn: the final message after any tool rounds,
/// the tools it ran on the way, and the usage spent.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub message: Message,
    pub tool_records: Vec<ToolCallRecord>,
    pub usage: Usage,
}

/// A single conversational agent: a system prompt, a model handle, the
/// toolkits it may operate and its growing message memory.
pub struct ChatAgent {
    system_prompt: String,
    model: ModelHandle,
    toolkits: Vec<Arc<dyn Toolkit>>,
    messages: Vec<Message>,
}

impl ChatAgent {
    pub fn new(system_prompt: impl Into<String>, model: ModelHandle) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            model,
            toolkits: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn with_toolkits(mut self, toolkits: Vec<Arc<dyn Toolkit>>) -> Self {
        self.toolkits = toolkits;
        self
    }

    /// Add a toolkit to the agent
    pub fn add_toolkit(&mut self, toolkit: Arc<dyn Toolkit>) {
        self.toolkits.push(toolkit);
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn toolkits(&self) -> &[Arc<dyn Toolkit>] {
        &self.toolkits
    }

    pub fn message_history(&self) -> &[Message] {
        &self.messages
    }

    /// Get all tools from all toolkits with proper namespacing
    pub fn available_tools(&self) -> Vec<Tool> {
        let mut tools = Vec::new();
        for toolkit in &self.toolkits {
            for tool in toolkit.tools() {
                tools.push(Tool::new(
                    format!("{}__{}", toolkit.name(), tool.name),
                    &tool.description,
                    tool.input_schema.clone(),
                ));
            }
        }
        tools
    }

    /// Find the appropriate toolkit for a tool call based on the namespaced name
    fn toolkit_for_tool(&self, prefixed_name: &str) -> Option<&dyn Toolkit> {
        let parts: Vec<&str> = prefixed_name.split("__").collect();
        if parts.len() != 2 {
            return None;
        }
        let toolkit_name = parts[0];
        self.toolkits
            .iter()
            .find(|toolkit| toolkit.name() == toolkit_name)
            .map(|v| &**v)
    }

    /// Dispatch a single tool call to the appropriate toolkit
    async fn dispatch_tool_call(
        &self,
        tool_call: ToolResult<ToolCall>,
    ) -> ToolResult<Vec<Content>> {
        let call = tool_call?;
        let toolkit = self
            .toolkit_for_tool(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;

        let tool_name = call
            .name
            .split("__")
            .nth(1)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        let toolkit_tool_call = ToolCall::new(tool_name, call.arguments);

        tracing::debug!(tool = %call.name, "dispatching tool call");
        toolkit.call(toolkit_tool_call).await
    }

    /// Run one turn: feed the input to the model, execute any requested
    /// tools (each round dispatched concurrently), and repeat until the
    /// model answers with plain text.
    pub async fn step(&mut self, input: Message) -> Result<AgentResponse> {
        let tools = self.available_tools();
        let mut tool_records = Vec::new();
        let mut usage_total = Usage::default();

        self.messages.push(input);

        loop {
            let (response, usage) = self
                .model
                .complete(&self.system_prompt, &self.messages, &tools)
                .await?;
            usage_total.add(&usage);
            self.messages.push(response.clone());

            // First collect any tool requests
            let tool_requests: Vec<&ToolRequest> = response
                .content
                .iter()
                .filter_map(|content| content.as_tool_request())
                .collect();

            if tool_requests.is_empty() {
                // No more tool calls, the turn is complete
                return Ok(AgentResponse {
                    message: response,
                    tool_records,
                    usage: usage_total,
                });
            }

            // Then dispatch each in parallel
            let futures: Vec<_> = tool_requests
                .iter()
                .map(|request| self.dispatch_tool_call(request.tool_call.clone()))
                .collect();

            // Process all the futures in parallel but wait until all are finished
            let outputs = futures::future::join_all(futures).await;

            // Combine the responses into one tool-response message using the original IDs
            let mut message_tool_response = Message::user();
            for (request, output) in tool_requests.iter().zip(outputs.into_iter()) {
                tool_records.push(record_for(request, &output));
                message_tool_response =
                    message_tool_response.with_tool_response(request.id.clone(), output);
            }

            self.messages.push(message_tool_response);
        }
    }
}

fn record_for(request: &ToolRequest, output: &ToolResult<Vec<Content>>) -> ToolCallRecord {
    let (tool, arguments) = match &request.tool_call {
        Ok(call) => (call.name.clone(), call.arguments.clone()),
        Err(e) => (format!("(invalid: {})", e), Value::Null),
    };
    let result = match output {
        Ok(contents) => contents
            .iter()
            .filter_map(|content| content.as_text())
            .collect::<Vec<_>>()
            .join("\n"),
        Err(e) => format!("Error: {}", e),
    };
    ToolCallRecord {
        tool,
        arguments,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::MessageContent;
    use async_trait::async_trait;
    use serde_json::json;

    // Mock toolkit for testing
    struct MockToolkit {
        name: String,
        tools: Vec<Tool>,
    }

    impl MockToolkit {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                tools: vec![Tool::new(
                    "echo",
                    "Echoes back the input",
                    json!({"type": "object", "properties": {"message": {"type": "string"}}, "required": ["message"]}),
                )],
            }
        }
    }

    #[async_trait]
    impl Toolkit for MockToolkit {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            "A mock toolkit for testing"
        }

        fn instructions(&self) -> &str {
            "Mock toolkit instructions"
        }

        fn tools(&self) -> &[Tool] {
            &self.tools
        }

        async fn call(&self, tool_call: ToolCall) -> ToolResult<Vec<Content>> {
            match tool_call.name.as_str() {
                "echo" => Ok(vec![Content::text(
                    tool_call.arguments["message"].as_str().unwrap_or(""),
                )]),
                _ => Err(ToolError::NotFound(tool_call.name)),
            }
        }
    }

    fn agent_with_script(responses: Vec<Message>) -> ChatAgent {
        ChatAgent::new("You are a test agent.", ModelHandle::scripted(responses))
    }

    #[tokio::test]
    async fn test_simple_response() -> Result<()> {
        let response = Message::assistant().with_text("Hello!");
        let mut agent = agent_with_script(vec![response.clone()]);

        let reply = agent.step(Message::user().with_text("Hi")).await?;

        assert_eq!(reply.message, response);
        assert!(reply.tool_records.is_empty());
        assert_eq!(agent.message_history().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_call() -> Result<()> {
        let mut agent = agent_with_script(vec![
            Message::assistant().with_tool_request(
                "1",
                Ok(ToolCall::new("test__echo", json!({"message": "test"}))),
            ),
            Message::assistant().with_text("Done!"),
        ]);
        agent.add_toolkit(Arc::new(MockToolkit::new("test")));

        let reply = agent.step(Message::user().with_text("Echo test")).await?;

        assert_eq!(reply.message.content[0], MessageContent::text("Done!"));
        assert_eq!(reply.tool_records.len(), 1);
        assert_eq!(reply.tool_records[0].tool, "test__echo");
        assert_eq!(reply.tool_records[0].result, "test");
        // input, tool request, tool response, final text
        assert_eq!(agent.message_history().len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_tool() -> Result<()> {
        let mut agent = agent_with_script(vec![
            Message::assistant()
                .with_tool_request("1", Ok(ToolCall::new("invalid_tool", json!({})))),
            Message::assistant().with_text("Error occurred"),
        ]);
        agent.add_toolkit(Arc::new(MockToolkit::new("test")));

        let reply = agent.step(Message::user().with_text("Invalid tool")).await?;

        assert_eq!(
            reply.message.content[0],
            MessageContent::text("Error occurred")
        );
        assert_eq!(reply.tool_records.len(), 1);
        assert!(reply.tool_records[0].result.starts_with("Error:"));
        Ok(())
    }

    #[tokio::test]
    async fn test_multiple_tool_calls() -> Result<()> {
        let mut agent = agent_with_script(vec![
            Message::assistant()
                .with_tool_request(
                    "1",
                    Ok(ToolCall::new("test__echo", json!({"message": "first"}))),
                )
                .with_tool_request(
                    "2",
                    Ok(ToolCall::new("test__echo", json!({"message": "second"}))),
                ),
            Message::assistant().with_text("All done!"),
        ]);
        agent.add_toolkit(Arc::new(MockToolkit::new("test")));

        let reply = agent
            .step(Message::user().with_text("Multiple calls"))
            .await?;

        assert_eq!(reply.message.content[0], MessageContent::text("All done!"));
        assert_eq!(reply.tool_records.len(), 2);
        assert_eq!(reply.tool_records[0].result, "first");
        assert_eq!(reply.tool_records[1].result, "second");
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_accumulates_across_steps() -> Result<()> {
        let mut agent = agent_with_script(vec![
            Message::assistant().with_text("First reply"),
            Message::assistant().with_text("Second reply"),
        ]);

        agent.step(Message::user().with_text("one")).await?;
        agent.step(Message::user().with_text("two")).await?;

        assert_eq!(agent.message_history().len(), 4);
        assert_eq!(agent.message_history()[3].text(), "Second reply");
        Ok(())
    }

    #[test]
    fn test_available_tools_are_namespaced() {
        let mut agent = agent_with_script(vec![]);
        agent.add_toolkit(Arc::new(MockToolkit::new("alpha")));
        agent.add_toolkit(Arc::new(MockToolkit::new("beta")));

        let tools = agent.available_tools();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["alpha__echo", "beta__echo"]);
    }
}
