//! Panel agents.
//!
//! Experts rate items; in the recursive protocol they may first ask a
//! facilitator a clarification question. The engine only sees the traits,
//! so any backend (LLM, scripted stub, human relay) can sit behind them.

mod llm;
mod traits;

pub use llm::{extract_json_object, LlmExpert, LlmFacilitator};
pub use traits::{
    AgentError, ClarifyingExpert, ExpertAgent, Facilitator, FacilitatorRequest, RatingRequest,
};
