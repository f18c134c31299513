//! Stop evaluator: decides after each round whether the panel is done.
//!
//! The rules are evaluated in order:
//! 1. All categories identical (and at least one) → stop, `Converged`
//! 2. Round cap reached → stop, `MaxRoundsReached`
//! 3. Otherwise → `Continue` with the next round

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Why a round did or did not end the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Converged,
    MaxRoundsReached,
    Continue,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Converged => "converged",
            StopReason::MaxRoundsReached => "max_rounds_reached",
            StopReason::Continue => "continue",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopDecision {
    pub stop: bool,
    pub reason: StopReason,
}

impl StopDecision {
    pub fn converged() -> Self {
        Self {
            stop: true,
            reason: StopReason::Converged,
        }
    }

    pub fn max_rounds_reached() -> Self {
        Self {
            stop: true,
            reason: StopReason::MaxRoundsReached,
        }
    }

    pub fn proceed() -> Self {
        Self {
            stop: false,
            reason: StopReason::Continue,
        }
    }
}

/// True when every category is the same string. Empty input never converges.
pub fn has_full_convergence<S: AsRef<str>>(categories: &[S]) -> bool {
    let distinct: BTreeSet<&str> = categories.iter().map(AsRef::as_ref).collect();
    distinct.len() == 1
}

/// Decide whether the panel stops after `current_round`.
pub fn evaluate<S: AsRef<str>>(categories: &[S], current_round: u32, n_max: u32) -> StopDecision {
    if has_full_convergence(categories) {
        return StopDecision::converged();
    }
    if current_round >= n_max {
        return StopDecision::max_rounds_reached();
    }
    StopDecision::proceed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unanimous_round_converges() {
        let decision = evaluate(&["include", "include", "include"], 1, 10);
        assert_eq!(decision, StopDecision::converged());
    }

    #[test]
    fn test_mixed_round_continues_below_cap() {
        let decision = evaluate(&["include", "exclude"], 2, 3);
        assert!(!decision.stop);
        assert_eq!(decision.reason, StopReason::Continue);
    }

    #[test]
    fn test_mixed_round_stops_at_cap() {
        let decision = evaluate(&["include", "exclude"], 3, 3);
        assert_eq!(decision, StopDecision::max_rounds_reached());
    }

    #[test]
    fn test_empty_round_is_not_convergent() {
        let empty: [&str; 0] = [];
        assert!(!has_full_convergence(&empty));
        assert_eq!(evaluate(&empty, 1, 2).reason, StopReason::Continue);
        assert_eq!(evaluate(&empty, 2, 2).reason, StopReason::MaxRoundsReached);
    }

    #[test]
    fn test_categories_compare_exactly() {
        // No case folding: labels are opaque.
        assert!(!has_full_convergence(&["Include", "include"]));
    }

    #[test]
    fn test_stop_reason_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&StopReason::MaxRoundsReached).unwrap(),
            "\"max_rounds_reached\""
        );
        assert_eq!(StopReason::Continue.to_string(), "continue");
    }

    proptest! {
        #[test]
        fn prop_unanimous_always_converges(
            label in "[a-z]{1,8}",
            count in 1usize..12,
            current_round in 1u32..50,
            n_max in 1u32..50,
        ) {
            let categories = vec![label; count];
            let decision = evaluate(&categories, current_round, n_max);
            prop_assert_eq!(decision, StopDecision::converged());
        }

        #[test]
        fn prop_mixed_continues_until_cap(
            labels in proptest::collection::vec("[a-c]", 2..10),
            n_max in 1u32..20,
            current_round in 1u32..20,
        ) {
            prop_assume!(!has_full_convergence(&labels));
            let decision = evaluate(&labels, current_round, n_max);
            if current_round < n_max {
                prop_assert_eq!(decision, StopDecision::proceed());
            } else {
                prop_assert_eq!(decision, StopDecision::max_rounds_reached());
            }
        }
    }
}
