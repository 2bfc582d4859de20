//! Chat-completion client over an OpenAI-compatible endpoint.
//!
//! Groq exposes the OpenAI chat API, so `async-openai` with a custom
//! `api_base` covers both the diagnostic analyzer and the agent team.

use std::time::Instant;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, ResponseFormat,
    },
    Client,
};
use onco_core::CoreError;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Decoding parameters for a single completion call.
#[derive(Debug, Clone, Copy)]
pub struct ChatOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self { max_tokens: 1024, temperature: 0.7 }
    }
}

fn llm_err(e: impl ToString) -> CoreError {
    CoreError::Llm(e.to_string())
}

fn first_choice(response: CreateChatCompletionResponse, elapsed_ms: u64) -> Result<String, CoreError> {
    let (input_tokens, output_tokens) = response
        .usage
        .as_ref()
        .map(|u| (u.prompt_tokens, u.completion_tokens))
        .unwrap_or((0, 0));

    info!(
        "LLM: {}ms, tokens: {}/{} (in/out)",
        elapsed_ms, input_tokens, output_tokens
    );

    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| CoreError::Llm("No response content".into()))
}

/// Thin wrapper owning the model name alongside the API client.
pub struct ChatClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl ChatClient {
    pub fn new(api_key: &str, api_base: &str, model: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);
        Self {
            client: Client::with_config(config),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One system + one user message, returning the first choice verbatim.
    pub async fn chat(
        &self,
        system_prompt: &str,
        user_input: &str,
        options: ChatOptions,
    ) -> Result<String, CoreError> {
        let start = Instant::now();

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_tokens(options.max_tokens)
            .temperature(options.temperature)
            .messages(vec![
                ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(system_prompt)
                        .build()
                        .map_err(llm_err)?,
                ),
                ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(user_input)
                        .build()
                        .map_err(llm_err)?,
                ),
            ])
            .build()
            .map_err(llm_err)?;

        let response = self.client.chat().create(request).await.map_err(llm_err)?;
        first_choice(response, start.elapsed().as_millis() as u64)
    }

    /// JSON-mode completion parsed into `T`. Used for the team coordinator's
    /// routing decision.
    pub async fn structured<T: DeserializeOwned>(
        &self,
        system_prompt: &str,
        user_input: &str,
    ) -> Result<T, CoreError> {
        let start = Instant::now();

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .response_format(ResponseFormat::JsonObject)
            .messages(vec![
                ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(system_prompt)
                        .build()
                        .map_err(llm_err)?,
                ),
                ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(user_input)
                        .build()
                        .map_err(llm_err)?,
                ),
            ])
            .build()
            .map_err(llm_err)?;

        let response = self.client.chat().create(request).await.map_err(llm_err)?;
        let content = first_choice(response, start.elapsed().as_millis() as u64)?;

        debug!("Structured response: {}", content);

        serde_json::from_str(&content).map_err(|e| {
            CoreError::Parse(format!("Failed to parse: {} - content: {}", e, content))
        })
    }
}
