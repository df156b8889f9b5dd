use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use parliament::providers::configs::{OpenAiCompatibleConfig, ProviderConfig};
use parliament::providers::factory::ModelHandle;
use parliament::society::{AgentConfig, RolePlaying, TaskConfig};
use parliament::toolkits::{
    CodeExecutionToolkit, FileWriteToolkit, ImageAnalysisToolkit, SearchConfig, SearchToolkit,
    SpreadsheetToolkit, Toolkit, WebToolkit,
};

/// Settings for one society run
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: i32,
    pub round_limit: usize,
    pub output_dir: PathBuf,
    pub verbose_code: bool,
}

/// The five named model handles a society is wired with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum ModelRole {
    User,
    Assistant,
    Web,
    Planning,
    Image,
}

/// The shared configuration every model handle is created from
pub fn base_model_config(settings: &Settings) -> ProviderConfig {
    ProviderConfig::OpenAiCompatible(OpenAiCompatibleConfig {
        host: settings.host.clone(),
        api_key: settings.api_key.clone(),
        model: settings.model.clone(),
        temperature: Some(settings.temperature),
        max_tokens: Some(settings.max_tokens),
    })
}

/// Create one model handle per role, all pointing at the same endpoint
/// with the same generation parameters
pub fn create_models(settings: &Settings) -> Result<HashMap<ModelRole, ModelHandle>> {
    let base = base_model_config(settings);
    ModelRole::iter()
        .map(|role| Ok((role, ModelHandle::create(base.clone())?)))
        .collect()
}

/// Instantiate the assistant's tool belt
pub fn build_toolkits(
    models: &HashMap<ModelRole, ModelHandle>,
    settings: &Settings,
) -> Result<Vec<Arc<dyn Toolkit>>> {
    let web_model = models
        .get(&ModelRole::Web)
        .context("web model missing")?
        .clone();
    let planning_model = models
        .get(&ModelRole::Planning)
        .context("planning model missing")?
        .clone();
    let image_model = models
        .get(&ModelRole::Image)
        .context("image model missing")?
        .clone();

    Ok(vec![
        Arc::new(WebToolkit::new(web_model, planning_model)?),
        Arc::new(CodeExecutionToolkit::new(settings.verbose_code)),
        Arc::new(ImageAnalysisToolkit::new(image_model)?),
        Arc::new(SearchToolkit::new(SearchConfig::from_env())?),
        Arc::new(SpreadsheetToolkit::new(&settings.output_dir)),
        Arc::new(FileWriteToolkit::new(&settings.output_dir)),
    ])
}

/// Construct a society of agents to address the given question
pub async fn construct_society(question: &str, settings: &Settings) -> Result<RolePlaying> {
    let models = create_models(settings)?;
    let toolkits = build_toolkits(&models, settings)?;

    let user_model = models
        .get(&ModelRole::User)
        .context("user model missing")?
        .clone();
    let assistant_model = models
        .get(&ModelRole::Assistant)
        .context("assistant model missing")?
        .clone();

    let society = RolePlaying::new(
        TaskConfig {
            task_prompt: question.to_string(),
            with_task_specify: false,
        },
        AgentConfig::new("user", user_model),
        AgentConfig::new("assistant", assistant_model).with_toolkits(toolkits),
    )
    .await?;

    Ok(society)
}
