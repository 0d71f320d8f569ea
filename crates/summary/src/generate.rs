//! Summary generation through a [`Provider`].

use crate::compose::ComposedInstruction;
use edsum_config::AppConfig;
use edsum_core::error::ProviderError;
use edsum_core::message::{Message, estimated_tokens};
use edsum_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sends an instruction and a transcript to the configured model.
pub struct Summarizer {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.3,
            max_tokens: None,
        }
    }

    /// Model, temperature and token limit taken from configuration.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        config: &AppConfig,
    ) -> Self {
        Self::new(provider, model)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate a summary. The instruction is the system message and the
    /// transcript the single user message.
    pub async fn generate(
        &self,
        instruction: &ComposedInstruction,
        transcript: &str,
    ) -> Result<String, ProviderError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![
                Message::system(instruction.as_str()),
                Message::user(transcript),
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        debug!(
            provider = self.provider.name(),
            model = %self.model,
            instruction_chars = instruction.len(),
            transcript_chars = transcript.len(),
            estimated_tokens = estimated_tokens(&request.messages),
            "Requesting summary"
        );

        let response = self.provider.complete(request).await.inspect_err(|e| {
            warn!(provider = self.provider.name(), error = %e, "Summary generation failed");
        })?;

        let text = response.message.content.trim().to_string();
        if text.is_empty() {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: "provider returned an empty completion".into(),
            });
        }
        if let Some(usage) = &response.usage {
            info!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Summary generated"
            );
        }
        Ok(text)
    }
}
