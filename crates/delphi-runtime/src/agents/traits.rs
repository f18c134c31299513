//! Expert and facilitator capability traits.

use async_trait::async_trait;
use delphi_core::ExpertRating;
use std::time::Duration;
use thiserror::Error;

use crate::providers::ProviderError;

/// Errors from expert and facilitator agents.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM call failed: {0}")]
    LlmError(String),

    #[error("Malformed agent output: {0}")]
    InvalidPayload(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Everything an expert is told about one turn.
///
/// The same `seed` is sent for a given expert in every round of an item so a
/// deterministic backend can reproduce that participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingRequest {
    pub item_id: String,
    pub item_text: String,
    pub round: u32,
    pub expert_id: String,
    pub seed: i64,
}

/// A clarification question routed to the facilitator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilitatorRequest {
    pub item_id: String,
    pub item_text: String,
    pub round: u32,
    pub expert_id: String,
    pub clarification_question: String,
}

/// Expert capability for the standard protocol.
///
/// # Isolation Contract
/// - Each call receives an independent, fully specified request
/// - MUST NOT share mutable state with other experts of the same round
/// - Failures are returned, never retried here
#[async_trait]
pub trait ExpertAgent: Send + Sync {
    /// Rate one item for one round.
    async fn rate(&self, request: &RatingRequest) -> Result<ExpertRating, AgentError>;
}

/// Expert capability for the recursive protocol.
#[async_trait]
pub trait ClarifyingExpert: Send + Sync {
    /// Ask one clarification question, given only the item and round context.
    async fn ask_clarification(&self, request: &RatingRequest) -> Result<String, AgentError>;

    /// Rate the item after seeing the question and the facilitator's answer.
    async fn rate_with_clarification(
        &self,
        request: &RatingRequest,
        clarification_question: &str,
        facilitator_answer: &str,
    ) -> Result<ExpertRating, AgentError>;
}

/// Facilitator capability for the recursive protocol.
///
/// Implementations answer strictly within the scope of the item. When a
/// question goes beyond it they return a fixed refusal text instead of a
/// rating or a decision recommendation.
#[async_trait]
pub trait Facilitator: Send + Sync {
    async fn answer(&self, request: &FacilitatorRequest) -> Result<String, AgentError>;
}
