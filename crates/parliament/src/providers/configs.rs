use crate::models::message::Message;

/// Configuration of an OpenAI-compatible chat-completion endpoint.
///
/// `host` is the base URL of the service, without the
/// `/v1/chat/completions` suffix (e.g. `https://api.groq.com/openai`).
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiCompatibleConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

/// Unified enum to wrap the supported provider configurations
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderConfig {
    OpenAiCompatible(OpenAiCompatibleConfig),
    /// Scripted responses, served in order. For tests and dry runs.
    Mock(Vec<Message>),
}

impl ProviderConfig {
    /// The model identifier, where the platform has one
    pub fn model(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAiCompatible(config) => Some(&config.model),
            ProviderConfig::Mock(_) => None,
        }
    }
}
