use std::sync::Arc;

use anyhow::Result;
use strum_macros::EnumIter;

use super::base::{Provider, Usage};
use super::configs::ProviderConfig;
use super::mock::MockProvider;
use super::openai::OpenAiCompatibleProvider;
use crate::models::message::Message;
use crate::models::tool::Tool;

#[derive(EnumIter, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenAiCompatible,
    Mock,
}

pub fn get_provider(config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    match config {
        ProviderConfig::OpenAiCompatible(openai_config) => Ok(Arc::new(
            OpenAiCompatibleProvider::new(openai_config.clone())?,
        )),
        ProviderConfig::Mock(responses) => Ok(Arc::new(MockProvider::new(responses.clone()))),
    }
}

/// A named model backend: the configuration it was created from plus the
/// provider doing the work. The society creates several of these (user,
/// assistant, web, planning, image) and hands them to agents and toolkits.
#[derive(Clone)]
pub struct ModelHandle {
    config: ProviderConfig,
    provider: Arc<dyn Provider>,
}

impl ModelHandle {
    pub fn create(config: ProviderConfig) -> Result<Self> {
        let provider = get_provider(&config)?;
        Ok(Self { config, provider })
    }

    /// Handle over a scripted provider serving the given responses in order
    pub fn scripted(responses: Vec<Message>) -> Self {
        Self {
            config: ProviderConfig::Mock(responses.clone()),
            provider: Arc::new(MockProvider::new(responses)),
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn provider_type(&self) -> ProviderType {
        match self.config {
            ProviderConfig::OpenAiCompatible(_) => ProviderType::OpenAiCompatible,
            ProviderConfig::Mock(_) => ProviderType::Mock,
        }
    }

    pub async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage)> {
        self.provider.complete(system, messages, tools).await
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("config", &self.config)
            .finish()
    }
}
