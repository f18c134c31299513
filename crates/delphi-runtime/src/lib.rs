//! # delphi-runtime
//!
//! Async round orchestration for a simulated Delphi panel.
//!
//! `delphi-core` decides; this crate asks. Each round fans out one request
//! per panel seat, waits for every seat (or the first failure), then hands
//! the round to the deterministic stop evaluator and aggregator.
//!
//! Two per-seat protocols are provided:
//! - **Standard**: the expert rates the item directly
//! - **Recursive**: the expert asks a clarification question, a facilitator
//!   answers within the item's scope, and the expert then rates
//!
//! Experts and facilitators are traits. [`LlmExpert`] and [`LlmFacilitator`]
//! back them with any [`LlmProvider`]; tests and other callers can plug in
//! deterministic stubs.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use delphi_core::Item;
//! use delphi_runtime::{
//!     run_standard_delphi, BackendConfig, LlmExpert, OllamaProvider, PanelConfig,
//! };
//!
//! let backend = BackendConfig::new("qwen3:4b");
//! let provider = Arc::new(OllamaProvider::new(&backend.host)?);
//! let expert = Arc::new(LlmExpert::new(provider, backend.completion_config()));
//!
//! let items = vec![Item::new("Q1", "Record baseline vitals")];
//! let panel = PanelConfig::new(3, vec![11, 22, 33]);
//! let run = run_standard_delphi(&items, &panel, expert).await?;
//! println!("{}", run.item_results[0].final_category);
//! ```

pub mod agents;
pub mod config;
pub mod orchestrator;
pub mod prompts;
pub mod providers;

pub use agents::{
    AgentError, ClarifyingExpert, ExpertAgent, Facilitator, FacilitatorRequest, LlmExpert,
    LlmFacilitator, RatingRequest,
};
pub use config::{BackendConfig, Panel, PanelConfig, PanelSeat, ProtocolMode};
pub use orchestrator::{
    run_recursive_delphi, run_standard_delphi, DelphiOrchestrator, EngineError, ItemRun,
    RecursiveProtocol, RoundProtocol, StandardProtocol,
};
pub use providers::{
    CompletionConfig, LlmProvider, OllamaProvider, OllamaProviderFactory, ProviderError,
    ProviderRegistry,
};
