//! Generative chat-model client.
//!
//! One non-streaming completion per conversational turn: the persona's
//! system instruction is re-sent on every call so the model cannot drift
//! out of character over a session.

use crate::types::{ChatMessage, Sender};
use anyhow::{Result, anyhow};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use tracing::debug;

/// Sampling bounds for one turn: a little creativity, chat-length replies.
const TEMPERATURE: f32 = 0.7;
const MAX_COMPLETION_TOKENS: u32 = 150;

/// A conversational model that produces one reply per call.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Replies to `last_message`, given the persona instruction and the
    /// prior turns of the conversation.
    async fn complete(
        &self,
        system_instruction: &str,
        history: &[ChatMessage],
        last_message: &str,
    ) -> Result<String>;
}

/// A `ChatModel` backed by any OpenAI-compatible chat-completion endpoint.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleClient {
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }

    /// Convenience constructor for endpoints addressed by key and base URL.
    pub fn with_endpoint(api_key: &str, api_base: &str, model: String) -> Self {
        Self::new(
            OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(api_base),
            model,
        )
    }
}

/// Maps the transcript into chat-completion messages. System-sender entries
/// (such as disconnect notices) are not part of the persona's conversation
/// and are skipped.
fn build_messages(
    system_instruction: &str,
    history: &[ChatMessage],
    last_message: &str,
) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system_instruction)
            .build()?
            .into(),
    ];
    for msg in history {
        match msg.sender {
            Sender::User => messages.push(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.text.clone())
                    .build()?
                    .into(),
            ),
            Sender::Agent => messages.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(msg.text.clone())
                    .build()?
                    .into(),
            ),
            Sender::System => continue,
        }
    }
    messages.push(
        ChatCompletionRequestUserMessageArgs::default()
            .content(last_message)
            .build()?
            .into(),
    );
    Ok(messages)
}

#[async_trait]
impl ChatModel for OpenAICompatibleClient {
    async fn complete(
        &self,
        system_instruction: &str,
        history: &[ChatMessage],
        last_message: &str,
    ) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(build_messages(system_instruction, history, last_message)?)
            .temperature(TEMPERATURE)
            .max_completion_tokens(MAX_COMPLETION_TOKENS)
            .build()?;

        debug!(model = %self.model, turns = history.len(), "requesting chat completion");
        let response = self.client.chat().create(request).await?;
        let choice = response
            .choices
            .first()
            .ok_or_else(|| anyhow!("completion returned no choices"))?;
        let text = choice.message.content.clone().unwrap_or_default();
        if text.trim().is_empty() {
            // The provider answered with nothing; hand back a shrug rather
            // than an empty bubble.
            Ok("...".to_string())
        } else {
            Ok(text)
        }
    }
}
