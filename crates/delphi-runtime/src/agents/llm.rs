//! LLM-backed expert and facilitator.

use async_trait::async_trait;
use delphi_core::ExpertRating;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::traits::{
    AgentError, ClarifyingExpert, ExpertAgent, Facilitator, FacilitatorRequest, RatingRequest,
};
use crate::prompts;
use crate::providers::{ChatMessage, CompletionConfig, LlmProvider};

lazy_static! {
    /// Fenced code block, optionally tagged `json`.
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").unwrap();
}

/// Locate the JSON object in a model reply.
///
/// Prefers a fenced code block; otherwise takes the span from the first `{`
/// to the last `}`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    if let Some(inner) = FENCED_BLOCK.captures(text).and_then(|c| c.get(1)) {
        return Some(inner.as_str());
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

#[derive(Debug, Deserialize)]
struct QuestionPayload {
    question: String,
}

/// Expert seat backed by an [`LlmProvider`].
///
/// Each call sends the seat's seed so a seeded backend reproduces the same
/// participant across rounds.
pub struct LlmExpert {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
}

impl LlmExpert {
    pub fn new(provider: Arc<dyn LlmProvider>, config: CompletionConfig) -> Self {
        Self { provider, config }
    }

    async fn complete_json<T>(&self, user_prompt: String, seed: i64) -> Result<T, AgentError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let config = self.config.with_seed(seed).json();
        let messages = vec![
            ChatMessage::system(prompts::EXPERT_SYSTEM_PROMPT),
            ChatMessage::user(user_prompt),
        ];

        let call = self.provider.complete(messages, &config);
        let response = match tokio::time::timeout(config.timeout, call).await {
            Ok(result) => result?,
            Err(_) => return Err(AgentError::Timeout(config.timeout)),
        };
        debug!(
            model = %response.model,
            stop_reason = ?response.stop_reason,
            tokens = response.usage.total(),
            "Expert completion"
        );

        let json = extract_json_object(&response.content).ok_or_else(|| {
            AgentError::InvalidPayload(format!("no JSON object in reply: {}", response.content))
        })?;
        serde_json::from_str(json).map_err(|e| AgentError::InvalidPayload(e.to_string()))
    }
}

#[async_trait]
impl ExpertAgent for LlmExpert {
    async fn rate(&self, request: &RatingRequest) -> Result<ExpertRating, AgentError> {
        self.complete_json(prompts::rating_prompt(request), request.seed)
            .await
    }
}

#[async_trait]
impl ClarifyingExpert for LlmExpert {
    async fn ask_clarification(&self, request: &RatingRequest) -> Result<String, AgentError> {
        let payload: QuestionPayload = self
            .complete_json(prompts::clarification_prompt(request), request.seed)
            .await?;
        let question = payload.question.trim();
        if question.is_empty() {
            return Err(AgentError::InvalidPayload(
                "clarification question is empty".to_string(),
            ));
        }
        Ok(question.to_string())
    }

    async fn rate_with_clarification(
        &self,
        request: &RatingRequest,
        clarification_question: &str,
        facilitator_answer: &str,
    ) -> Result<ExpertRating, AgentError> {
        let prompt =
            prompts::clarified_rating_prompt(request, clarification_question, facilitator_answer);
        self.complete_json(prompt, request.seed).await
    }
}

/// Facilitator backed by an [`LlmProvider`].
///
/// A blank reply is replaced by [`prompts::OUT_OF_SCOPE_REFUSAL`].
pub struct LlmFacilitator {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
}

impl LlmFacilitator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: CompletionConfig) -> Self {
        Self { provider, config }
    }
}

#[async_trait]
impl Facilitator for LlmFacilitator {
    async fn answer(&self, request: &FacilitatorRequest) -> Result<String, AgentError> {
        let messages = vec![
            ChatMessage::system(prompts::facilitator_system_prompt()),
            ChatMessage::user(prompts::facilitator_prompt(request)),
        ];

        let response = match tokio::time::timeout(
            self.config.timeout,
            self.provider.complete(messages, &self.config),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(AgentError::Timeout(self.config.timeout)),
        };
        debug!(
            model = %response.model,
            stop_reason = ?response.stop_reason,
            tokens = response.usage.total(),
            "Facilitator completion"
        );

        let answer = response.content.trim();
        if answer.is_empty() {
            return Ok(prompts::OUT_OF_SCOPE_REFUSAL.to_string());
        }
        Ok(answer.to_string())
    }
}
