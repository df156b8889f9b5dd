use std::sync::Arc;

use anyhow::Result;
use indoc::indoc;
use serde::Serialize;

use crate::agent::{AgentResponse, ChatAgent, ToolCallRecord};
use crate::models::message::Message;
use crate::prompt_template::load_prompt_file;
use crate::providers::base::Usage;
use crate::providers::factory::ModelHandle;
use crate::toolkits::Toolkit;

/// Marker the user side emits once it judges the task solved
pub const TASK_DONE_MARKER: &str = "TASK_DONE";

/// Rounds a run may take before it is cut off
pub const DEFAULT_ROUND_LIMIT: usize = 15;

const SPECIFY_WORD_LIMIT: usize = 50;
const SPECIFY_SYSTEM_PROMPT: &str =
    "You make tasks more specific for a pair of collaborating agents.";

/// The task the society is convened for
#[derive(Debug, Clone)]
pub struct TaskConfig {
    pub task_prompt: String,
    /// Rewrite the task with a specifier completion before the session starts
    pub with_task_specify: bool,
}

/// One side of the society: its role name, model handle and toolkits
pub struct AgentConfig {
    pub role_name: String,
    pub model: ModelHandle,
    pub toolkits: Vec<Arc<dyn Toolkit>>,
}

impl AgentConfig {
    pub fn new(role_name: impl Into<String>, model: ModelHandle) -> Self {
        Self {
            role_name: role_name.into(),
            model,
            toolkits: Vec::new(),
        }
    }

    pub fn with_toolkits(mut self, toolkits: Vec<Arc<dyn Toolkit>>) -> Self {
        self.toolkits = toolkits;
        self
    }
}

#[derive(Serialize)]
struct ToolkitInfo {
    name: String,
    description: String,
    instructions: String,
}

#[derive(Serialize)]
struct PromptContext {
    assistant_role: String,
    user_role: String,
    task: String,
    toolkits: Vec<ToolkitInfo>,
}

#[derive(Serialize)]
struct SpecifyContext {
    assistant_role: String,
    user_role: String,
    task: String,
    word_limit: usize,
}

/// Outcome of one round: what each side said and whether the user side
/// declared the task done
pub struct RoundOutcome {
    pub user: AgentResponse,
    pub assistant: AgentResponse,
    pub task_done: bool,
}

/// One transcript row
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub user: String,
    pub assistant: String,
    pub tool_calls: Vec<ToolCallRecord>,
}

/// What a finished run hands back to the caller
#[derive(Debug)]
pub struct SocietyResult {
    pub answer: String,
    pub chat_history: Vec<ChatTurn>,
    pub usage: Usage,
}

/// A two-agent session: a user-proxy agent instructing an assistant agent
/// until the task is judged complete.
pub struct RolePlaying {
    task_prompt: String,
    user_agent: ChatAgent,
    assistant_agent: ChatAgent,
}

impl RolePlaying {
    pub async fn new(task: TaskConfig, user: AgentConfig, assistant: AgentConfig) -> Result<Self> {
        let task_prompt = if task.with_task_specify {
            specify_task(&task.task_prompt, &user, &assistant).await?
        } else {
            task.task_prompt
        };

        let toolkits: Vec<ToolkitInfo> = assistant
            .toolkits
            .iter()
            .map(|toolkit| ToolkitInfo {
                name: toolkit.name().to_string(),
                description: toolkit.description().to_string(),
                instructions: toolkit.instructions().to_string(),
            })
            .collect();

        let context = PromptContext {
            assistant_role: assistant.role_name.clone(),
            user_role: user.role_name.clone(),
            task: task_prompt.clone(),
            toolkits,
        };
        let assistant_prompt = load_prompt_file("assistant.md", &context)
            .map_err(|e| anyhow::anyhow!("Failed to render assistant prompt: {}", e))?;
        let user_prompt = load_prompt_file("user.md", &context)
            .map_err(|e| anyhow::anyhow!("Failed to render user prompt: {}", e))?;

        let user_agent = ChatAgent::new(user_prompt, user.model).with_toolkits(user.toolkits);
        let assistant_agent =
            ChatAgent::new(assistant_prompt, assistant.model).with_toolkits(assistant.toolkits);

        Ok(Self {
            task_prompt,
            user_agent,
            assistant_agent,
        })
    }

    pub fn task_prompt(&self) -> &str {
        &self.task_prompt
    }

    pub fn user_agent(&self) -> &ChatAgent {
        &self.user_agent
    }

    pub fn assistant_agent(&self) -> &ChatAgent {
        &self.assistant_agent
    }

    /// The kickoff instruction that opens the exchange
    pub fn init_chat(&self) -> String {
        indoc! {"
            Now please give me instructions to solve the overall task step by step.
            If the task requires some specific knowledge, please instruct me to use
            tools to solve the task.
        "}
        .trim()
        .to_string()
    }

    /// Run one round: the user side turns the assistant's last message into
    /// the next instruction; the assistant side executes it with its tools.
    pub async fn step(&mut self, assistant_msg: &str) -> Result<RoundOutcome> {
        let user = self
            .user_agent
            .step(Message::user().with_text(assistant_msg))
            .await?;

        let instruction = user.message.text();
        let task_done = instruction.contains(TASK_DONE_MARKER);
        let instruction = if task_done {
            // Ask for a consolidated final answer instead of forwarding the
            // bare completion marker
            format!(
                "{}\n\n{}",
                instruction,
                indoc! {"
                    Now please make a final answer of the overall task: summarize
                    everything that was done and give the detailed final result.
                "}
                .trim()
            )
        } else {
            instruction
        };

        let assistant = self
            .assistant_agent
            .step(Message::user().with_text(instruction))
            .await?;

        Ok(RoundOutcome {
            user,
            assistant,
            task_done,
        })
    }
}

async fn specify_task(task: &str, user: &AgentConfig, assistant: &AgentConfig) -> Result<String> {
    let context = SpecifyContext {
        assistant_role: assistant.role_name.clone(),
        user_role: user.role_name.clone(),
        task: task.to_string(),
        word_limit: SPECIFY_WORD_LIMIT,
    };
    let prompt = load_prompt_file("task_specify.md", &context)
        .map_err(|e| anyhow::anyhow!("Failed to render task specify prompt: {}", e))?;
    let (response, _usage) = user
        .model
        .complete(
            SPECIFY_SYSTEM_PROMPT,
            &[Message::user().with_text(prompt)],
            &[],
        )
        .await?;

    let specified = response.text().trim().to_string();
    if specified.is_empty() {
        anyhow::bail!("Task specifier returned an empty task");
    }
    tracing::debug!(original = task, specified = %specified, "task specified");
    Ok(specified)
}

/// Drive the society until the user side declares the task done or the
/// round limit runs out. Returns the final answer, the transcript and the
/// summed token usage.
pub async fn run_society(
    society: &mut RolePlaying,
    round_limit: usize,
) -> Result<SocietyResult> {
    let mut chat_history = Vec::new();
    let mut usage = Usage::default();
    let mut input = society.init_chat();

    for round in 0..round_limit {
        let outcome = society.step(&input).await?;
        usage.add(&outcome.user.usage);
        usage.add(&outcome.assistant.usage);

        let assistant_text = outcome.assistant.message.text();
        tracing::info!(
            round,
            task_done = outcome.task_done,
            tool_calls = outcome.assistant.tool_records.len(),
            "society round complete"
        );
        chat_history.push(ChatTurn {
            user: outcome.user.message.text(),
            assistant: assistant_text.clone(),
            tool_calls: outcome.assistant.tool_records,
        });

        if outcome.task_done {
            break;
        }
        input = assistant_text;
    }

    let answer = chat_history
        .last()
        .map(|turn| turn.assistant.clone())
        .unwrap_or_default();

    Ok(SocietyResult {
        answer,
        chat_history,
        usage,
    })
}
