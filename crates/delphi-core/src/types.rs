//! Items, per-item results and the event trail.

use serde::{Deserialize, Serialize};

use crate::metrics::RoundMetrics;
use crate::response::ExpertResponse;
use crate::stopping::{StopDecision, StopReason};

/// A classification item put to the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: String,
    pub item_text: String,
}

impl Item {
    pub fn new(item_id: impl Into<String>, item_text: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            item_text: item_text.into(),
        }
    }
}

/// Final verdict for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    pub item_id: String,
    pub item_text: String,
    pub final_category: String,
    pub stop_reason: StopReason,
    pub rounds_run: u32,
    pub final_median: f64,
    pub final_agreement_inclusion: f64,
    pub final_agreement_exclusion: f64,
}

/// Closing record of a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub item_id: String,
    pub round: u32,
    /// Categories in panel seat order
    pub categories: Vec<String>,
    pub stop: bool,
    pub reason: StopReason,
    /// Present only on the round that stopped the item
    #[serde(flatten)]
    pub metrics: Option<RoundMetrics>,
}

impl RoundSummary {
    pub fn new(
        item_id: impl Into<String>,
        round: u32,
        categories: Vec<String>,
        decision: StopDecision,
        metrics: Option<RoundMetrics>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            round,
            categories,
            stop: decision.stop,
            reason: decision.reason,
            metrics: if decision.stop { metrics } else { None },
        }
    }
}

/// One entry of the append-only event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DelphiEvent {
    ExpertResponse(ExpertResponse),
    RoundSummary(RoundSummary),
}

impl DelphiEvent {
    pub fn item_id(&self) -> &str {
        match self {
            DelphiEvent::ExpertResponse(r) => r.item_id(),
            DelphiEvent::RoundSummary(s) => &s.item_id,
        }
    }

    pub fn round(&self) -> u32 {
        match self {
            DelphiEvent::ExpertResponse(r) => r.round(),
            DelphiEvent::RoundSummary(s) => s.round,
        }
    }

    pub fn is_round_summary(&self) -> bool {
        matches!(self, DelphiEvent::RoundSummary(_))
    }
}

/// Everything an engine invocation produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelphiRun {
    pub item_results: Vec<ItemResult>,
    pub event_log: Vec<DelphiEvent>,
}

impl DelphiRun {
    /// Expert response events, in log order.
    pub fn expert_responses(&self) -> impl Iterator<Item = &ExpertResponse> {
        self.event_log.iter().filter_map(|event| match event {
            DelphiEvent::ExpertResponse(r) => Some(r),
            DelphiEvent::RoundSummary(_) => None,
        })
    }

    /// Round summary events, in log order.
    pub fn round_summaries(&self) -> impl Iterator<Item = &RoundSummary> {
        self.event_log.iter().filter_map(|event| match event {
            DelphiEvent::RoundSummary(s) => Some(s),
            DelphiEvent::ExpertResponse(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ExpertRating;

    #[test]
    fn test_expert_response_event_is_tagged() {
        let response = ExpertResponse::new(
            "i1",
            1,
            "expert_1",
            ExpertRating::new(8, "include", "ok", 0.8),
            None,
        )
        .unwrap();
        let value = serde_json::to_value(DelphiEvent::ExpertResponse(response)).unwrap();
        assert_eq!(value["type"], "expert_response");
        assert_eq!(value["expert_id"], "expert_1");
        assert!(value["clarification_question"].is_null());
    }

    #[test]
    fn test_continuing_summary_omits_metrics() {
        let metrics = RoundMetrics::from_ratings(&[8, 2]);
        let summary = RoundSummary::new(
            "i1",
            1,
            vec!["include".into(), "exclude".into()],
            StopDecision::proceed(),
            metrics,
        );
        assert!(summary.metrics.is_none());

        let value = serde_json::to_value(DelphiEvent::RoundSummary(summary)).unwrap();
        assert_eq!(value["type"], "round_summary");
        assert_eq!(value["reason"], "continue");
        assert!(value.get("median").is_none());
    }

    #[test]
    fn test_stopping_summary_flattens_metrics() {
        let summary = RoundSummary::new(
            "i1",
            2,
            vec!["include".into(), "include".into()],
            StopDecision::converged(),
            RoundMetrics::from_ratings(&[8, 9]),
        );
        let value = serde_json::to_value(DelphiEvent::RoundSummary(summary.clone())).unwrap();
        assert_eq!(value["stop"], true);
        assert_eq!(value["reason"], "converged");
        assert_eq!(value["median"], 8.5);
        assert_eq!(value["agreement_inclusion"], 1.0);

        let back: DelphiEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, DelphiEvent::RoundSummary(summary));
    }
}
