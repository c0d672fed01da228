//! services/api/src/adapters/completion_llm.rs
//!
//! This module contains the adapter for the onboarding chat-completion LLM.
//! It implements the `CompletionService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use onboarding_core::{
    ai::{parse_json_content, Completion},
    ports::{CompletionService, PortError, PortResult},
};
use std::time::Instant;
use tracing::{error, info};

const SYSTEM_INSTRUCTIONS: &str = "You are a helpful onboarding assistant for a research and advisory company for the food and beverage industry. Always respond with valid JSON in the format specified.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CompletionService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiCompletionAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCompletionAdapter {
    /// Creates a new `OpenAiCompletionAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `CompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CompletionService for OpenAiCompletionAdapter {
    /// Sends the prompt with the JSON-only system instructions and parses the reply content.
    async fn complete(&self, prompt: &str, temperature: f32) -> PortResult<Completion> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(temperature)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let started = Instant::now();
        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| {
                error!("Chat completion request failed: {}", e);
                PortError::Unavailable(e.to_string())
            })?;
        info!("Chat completion received in {:?}", started.elapsed());

        let usage = response
            .usage
            .and_then(|usage| serde_json::to_value(usage).ok());

        // Extract the text content from the first choice in the response.
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PortError::Unexpected("No result from AI.".to_string()))?;

        Ok(Completion {
            content: parse_json_content(&content)?,
            usage,
        })
    }
}
