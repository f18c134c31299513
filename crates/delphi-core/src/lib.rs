//! # delphi-core
//!
//! Deterministic building blocks of a simulated Delphi panel.
//!
//! This crate answers, for a single round of expert judgments:
//! - Is every judgment valid? ([`ExpertResponse`])
//! - Has the panel converged, or must it continue? ([`stopping::evaluate`])
//! - If it never converged, which category wins? ([`aggregation::finalize_category`])
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: same responses always produce the same verdict
//! 2. **No I/O**: nothing here awaits, logs to disk, or calls a model
//! 3. **Validated at the edge**: out-of-range ratings are rejected, never clamped
//!
//! The async round orchestration lives in `delphi-runtime`.
//!
//! ## Example
//!
//! ```rust
//! use delphi_core::{finalize_category, stopping, ExpertRating, ExpertResponse, StopReason};
//!
//! let votes = [("e1", "include", 8), ("e2", "exclude", 2), ("e3", "include", 7)];
//! let responses: Vec<ExpertResponse> = votes
//!     .into_iter()
//!     .map(|(id, cat, rating)| {
//!         let rating = ExpertRating::new(rating, cat, "", 0.8);
//!         ExpertResponse::new("item-1", 1, id, rating, None).unwrap()
//!     })
//!     .collect();
//!
//! let categories: Vec<&str> = responses.iter().map(|r| r.category()).collect();
//! let decision = stopping::evaluate(&categories, 1, 1);
//! assert_eq!(decision.reason, StopReason::MaxRoundsReached);
//! assert_eq!(finalize_category(&responses).unwrap(), "include");
//! ```

pub mod aggregation;
pub mod metrics;
pub mod response;
pub mod stopping;
pub mod types;

// Re-export main types at crate root
pub use aggregation::{
    category_priority, finalize, finalize_category, AggregationError, Finalization,
};
pub use metrics::{median, RoundMetrics};
pub use response::{Clarification, ExpertRating, ExpertResponse, ResponseError};
pub use stopping::{StopDecision, StopReason};
pub use types::{DelphiEvent, DelphiRun, Item, ItemResult, RoundSummary};
