//! Round orchestration for the Delphi panel.
//!
//! The orchestrator drives each item through rounds until the stop evaluator
//! says to stop. It implements:
//! - Parallel fan-out of one task per panel seat via a per-round `JoinSet`
//! - Fail-fast fan-in: the first failed seat aborts the rest of the round
//! - Deterministic close-out through `delphi_core` (stop evaluator, metrics,
//!   aggregator)
//!
//! Items run strictly in input order and rounds never overlap.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;

use delphi_core::{
    finalize_category, stopping, AggregationError, Clarification, DelphiEvent, DelphiRun,
    ExpertResponse, Item, ItemResult, ResponseError, RoundMetrics, RoundSummary, StopReason,
};

use crate::agents::{
    AgentError, ClarifyingExpert, ExpertAgent, Facilitator, FacilitatorRequest, RatingRequest,
};
use crate::config::{Panel, PanelConfig};

/// Errors from an engine invocation.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Expert '{expert_id}' failed on item '{item_id}' round {round}: {source}")]
    ExpertFailed {
        item_id: String,
        round: u32,
        expert_id: String,
        source: AgentError,
    },

    #[error(
        "Facilitator failed for expert '{expert_id}' on item '{item_id}' round {round}: {source}"
    )]
    FacilitatorFailed {
        item_id: String,
        round: u32,
        expert_id: String,
        source: AgentError,
    },

    #[error(
        "Invalid response from expert '{expert_id}' on item '{item_id}' round {round}: {source}"
    )]
    InvalidResponse {
        item_id: String,
        round: u32,
        expert_id: String,
        source: ResponseError,
    },

    #[error("Aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    fn expert_failed(request: &RatingRequest, source: AgentError) -> Self {
        EngineError::ExpertFailed {
            item_id: request.item_id.clone(),
            round: request.round,
            expert_id: request.expert_id.clone(),
            source,
        }
    }

    fn facilitator_failed(request: &RatingRequest, source: AgentError) -> Self {
        EngineError::FacilitatorFailed {
            item_id: request.item_id.clone(),
            round: request.round,
            expert_id: request.expert_id.clone(),
            source,
        }
    }

    fn invalid_response(request: &RatingRequest, source: ResponseError) -> Self {
        EngineError::InvalidResponse {
            item_id: request.item_id.clone(),
            round: request.round,
            expert_id: request.expert_id.clone(),
            source,
        }
    }
}

/// One seat's unit of work for one round.
///
/// Implementations must be self-contained: the orchestrator runs all seats
/// of a round concurrently and shares nothing mutable between them.
#[async_trait]
pub trait RoundProtocol: Send + Sync {
    async fn elicit(&self, request: RatingRequest) -> Result<ExpertResponse, EngineError>;
}

/// The expert rates directly.
pub struct StandardProtocol {
    expert: Arc<dyn ExpertAgent>,
}

impl StandardProtocol {
    pub fn new(expert: Arc<dyn ExpertAgent>) -> Self {
        Self { expert }
    }
}

#[async_trait]
impl RoundProtocol for StandardProtocol {
    async fn elicit(&self, request: RatingRequest) -> Result<ExpertResponse, EngineError> {
        let rating = self
            .expert
            .rate(&request)
            .await
            .map_err(|e| EngineError::expert_failed(&request, e))?;

        ExpertResponse::new(&request.item_id, request.round, &request.expert_id, rating, None)
            .map_err(|e| EngineError::invalid_response(&request, e))
    }
}

/// Question, facilitator answer, then rating; sequential within one seat.
pub struct RecursiveProtocol {
    expert: Arc<dyn ClarifyingExpert>,
    facilitator: Arc<dyn Facilitator>,
}

impl RecursiveProtocol {
    pub fn new(expert: Arc<dyn ClarifyingExpert>, facilitator: Arc<dyn Facilitator>) -> Self {
        Self {
            expert,
            facilitator,
        }
    }
}

#[async_trait]
impl RoundProtocol for RecursiveProtocol {
    async fn elicit(&self, request: RatingRequest) -> Result<ExpertResponse, EngineError> {
        let question = self
            .expert
            .ask_clarification(&request)
            .await
            .map_err(|e| EngineError::expert_failed(&request, e))?;

        let answer = self
            .facilitator
            .answer(&FacilitatorRequest {
                item_id: request.item_id.clone(),
                item_text: request.item_text.clone(),
                round: request.round,
                expert_id: request.expert_id.clone(),
                clarification_question: question.clone(),
            })
            .await
            .map_err(|e| EngineError::facilitator_failed(&request, e))?;

        let rating = self
            .expert
            .rate_with_clarification(&request, &question, &answer)
            .await
            .map_err(|e| EngineError::expert_failed(&request, e))?;

        ExpertResponse::new(
            &request.item_id,
            request.round,
            &request.expert_id,
            rating,
            Some(Clarification { question, answer }),
        )
        .map_err(|e| EngineError::invalid_response(&request, e))
    }
}

/// Outcome of one item: its verdict and its block of the event log.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRun {
    pub result: ItemResult,
    pub events: Vec<DelphiEvent>,
}

/// Drives items through rounds with a given per-seat protocol.
///
/// # Architecture
/// - Parallel fan-out: every seat of a round is a task in one `JoinSet`
/// - Fail fast: the first seat error returns at once; dropping the set
///   aborts the seats still in flight
/// - Deterministic fan-in: responses are re-keyed by seat, then handed to
///   the stop evaluator and, at the round cap, the aggregator
pub struct DelphiOrchestrator {
    protocol: Arc<dyn RoundProtocol>,
}

impl DelphiOrchestrator {
    pub fn new(protocol: Arc<dyn RoundProtocol>) -> Self {
        Self { protocol }
    }

    /// Orchestrator for the standard protocol.
    pub fn standard(expert: Arc<dyn ExpertAgent>) -> Self {
        Self::new(Arc::new(StandardProtocol::new(expert)))
    }

    /// Orchestrator for the recursive (clarification) protocol.
    pub fn recursive(
        expert: Arc<dyn ClarifyingExpert>,
        facilitator: Arc<dyn Facilitator>,
    ) -> Self {
        Self::new(Arc::new(RecursiveProtocol::new(expert, facilitator)))
    }

    /// Run every item in order.
    ///
    /// Input is checked before the first round; any failure aborts the
    /// whole invocation and nothing partial is returned.
    pub async fn run(
        &self,
        items: &[Item],
        panel: &PanelConfig,
    ) -> Result<DelphiRun, EngineError> {
        if items.is_empty() {
            return Err(EngineError::InvalidInput(
                "items must not be empty".to_string(),
            ));
        }
        let panel = panel.panel()?;

        tracing::info!(
            items = items.len(),
            experts = panel.len(),
            n_max = panel.n_max(),
            "Starting Delphi run"
        );

        let mut run = DelphiRun::default();
        for item in items {
            let ItemRun { result, events } = self.run_item(item, &panel).await?;
            run.event_log.extend(events);
            run.item_results.push(result);
        }
        Ok(run)
    }

    /// Run one item to its stopping round.
    pub async fn run_item(&self, item: &Item, panel: &Panel) -> Result<ItemRun, EngineError> {
        tracing::info!(item_id = %item.item_id, "Starting item");
        let mut events = Vec::new();

        for round in 1..=panel.n_max() {
            let responses = self.run_round(item, round, panel).await?;

            let categories: Vec<String> =
                responses.iter().map(|r| r.category().to_string()).collect();
            let decision = stopping::evaluate(&categories, round, panel.n_max());
            let metrics = RoundMetrics::from_responses(&responses);

            tracing::info!(
                item_id = %item.item_id,
                round,
                reason = %decision.reason,
                "Round closed"
            );

            events.extend(responses.iter().cloned().map(DelphiEvent::ExpertResponse));
            events.push(DelphiEvent::RoundSummary(RoundSummary::new(
                &item.item_id,
                round,
                categories.clone(),
                decision,
                metrics,
            )));

            if !decision.stop {
                continue;
            }

            let final_category = match decision.reason {
                StopReason::Converged => categories.into_iter().next().ok_or_else(|| {
                    EngineError::Internal("converged round has no categories".to_string())
                })?,
                StopReason::MaxRoundsReached => finalize_category(&responses)?,
                StopReason::Continue => {
                    return Err(EngineError::Internal(
                        "stop decision carried reason 'continue'".to_string(),
                    ))
                }
            };
            let metrics = metrics.ok_or_else(|| {
                EngineError::Internal("stopping round has no ratings".to_string())
            })?;

            tracing::info!(
                item_id = %item.item_id,
                final_category = %final_category,
                rounds_run = round,
                "Item finished"
            );

            return Ok(ItemRun {
                result: ItemResult {
                    item_id: item.item_id.clone(),
                    item_text: item.item_text.clone(),
                    final_category,
                    stop_reason: decision.reason,
                    rounds_run: round,
                    final_median: metrics.median,
                    final_agreement_inclusion: metrics.agreement_inclusion,
                    final_agreement_exclusion: metrics.agreement_exclusion,
                },
                events,
            });
        }

        Err(EngineError::Internal(format!(
            "item '{}' ran {} rounds without a final category",
            item.item_id,
            panel.n_max()
        )))
    }

    /// One round: every seat concurrently, responses returned in seat order.
    async fn run_round(
        &self,
        item: &Item,
        round: u32,
        panel: &Panel,
    ) -> Result<Vec<ExpertResponse>, EngineError> {
        let mut tasks = JoinSet::new();
        for (seat_index, seat) in panel.seats().iter().enumerate() {
            let protocol = Arc::clone(&self.protocol);
            let request = RatingRequest {
                item_id: item.item_id.clone(),
                item_text: item.item_text.clone(),
                round,
                expert_id: seat.expert_id.clone(),
                seed: seat.seed,
            };
            tasks.spawn(async move { (seat_index, protocol.elicit(request).await) });
        }

        let mut slots: Vec<Option<ExpertResponse>> = vec![None; panel.len()];
        while let Some(joined) = tasks.join_next().await {
            let (seat_index, outcome) = joined
                .map_err(|e| EngineError::Internal(format!("expert task did not complete: {e}")))?;

            let response = match outcome {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(
                        item_id = %item.item_id,
                        round,
                        error = %e,
                        "Expert call failed, aborting item"
                    );
                    return Err(e);
                }
            };

            tracing::debug!(
                item_id = %item.item_id,
                round,
                expert_id = %response.expert_id(),
                rating = response.rating(),
                category = %response.category(),
                "Expert responded"
            );

            match slots.get_mut(seat_index) {
                Some(slot) => *slot = Some(response),
                None => {
                    return Err(EngineError::Internal(format!(
                        "seat index {seat_index} out of range"
                    )))
                }
            }
        }

        slots.into_iter().collect::<Option<Vec<_>>>().ok_or_else(|| {
            EngineError::Internal(format!(
                "round {round} of item '{}' is missing a response",
                item.item_id
            ))
        })
    }
}

/// Run the standard protocol over `items`.
pub async fn run_standard_delphi(
    items: &[Item],
    panel: &PanelConfig,
    expert: Arc<dyn ExpertAgent>,
) -> Result<DelphiRun, EngineError> {
    DelphiOrchestrator::standard(expert).run(items, panel).await
}

/// Run the recursive (clarification) protocol over `items`.
pub async fn run_recursive_delphi(
    items: &[Item],
    panel: &PanelConfig,
    expert: Arc<dyn ClarifyingExpert>,
    facilitator: Arc<dyn Facilitator>,
) -> Result<DelphiRun, EngineError> {
    DelphiOrchestrator::recursive(expert, facilitator)
        .run(items, panel)
        .await
}
