//! Aggregator: picks one category from a round that never converged.
//!
//! The tie-break policy is strict and applied in order, each step only
//! when the previous one leaves a tie:
//! 1. Majority vote on category counts
//! 2. Highest per-category median rating
//! 3. Fixed priority (`include` > `maybe` > `exclude` > anything else),
//!    then the lexicographically smallest label
//!
//! Step 3 is a total order, so a non-empty round always yields one winner.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::metrics::median;
use crate::response::ExpertResponse;

/// Errors from aggregation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("responses must not be empty")]
    EmptyResponses,
}

/// Priority weight used by the final fallback. Unknown labels weigh 0.
pub fn category_priority(category: &str) -> u8 {
    match category {
        "include" => 3,
        "maybe" => 2,
        "exclude" => 1,
        _ => 0,
    }
}

/// Vote tally and tie-break trail for one finalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Finalization {
    pub winning_category: String,
    pub votes: BTreeMap<String, usize>,
    /// Per-category medians, only populated when the vote tied.
    pub tied_medians: BTreeMap<String, f64>,
}

/// Deterministically choose the final category for a round.
pub fn finalize_category(responses: &[ExpertResponse]) -> Result<String, AggregationError> {
    finalize(responses).map(|f| f.winning_category)
}

/// Same as [`finalize_category`], keeping the intermediate tallies.
pub fn finalize(responses: &[ExpertResponse]) -> Result<Finalization, AggregationError> {
    if responses.is_empty() {
        return Err(AggregationError::EmptyResponses);
    }

    let mut votes: BTreeMap<String, usize> = BTreeMap::new();
    for response in responses {
        *votes.entry(response.category().to_string()).or_default() += 1;
    }

    let top_count = votes.values().copied().max().unwrap_or(0);
    let top_categories: Vec<&str> = votes
        .iter()
        .filter(|(_, &count)| count == top_count)
        .map(|(category, _)| category.as_str())
        .collect();

    if let [winner] = top_categories.as_slice() {
        return Ok(Finalization {
            winning_category: winner.to_string(),
            votes: votes.clone(),
            tied_medians: BTreeMap::new(),
        });
    }

    // Median tie-break
    let mut tied_medians = BTreeMap::new();
    for category in &top_categories {
        let ratings: Vec<u8> = responses
            .iter()
            .filter(|r| r.category() == *category)
            .map(|r| r.rating())
            .collect();
        if let Some(value) = median(&ratings) {
            tied_medians.insert(category.to_string(), value);
        }
    }

    let best_median = tied_medians
        .values()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let median_tied: Vec<&str> = tied_medians
        .iter()
        .filter(|(_, &value)| value == best_median)
        .map(|(category, _)| category.as_str())
        .collect();

    // Priority fallback. `min_by` keeps the first of equal elements and the
    // candidates come out of a BTreeMap already sorted by label.
    let winner = median_tied
        .iter()
        .copied()
        .min_by(|a, b| {
            category_priority(b)
                .cmp(&category_priority(a))
                .then_with(|| a.cmp(b))
        })
        .ok_or(AggregationError::EmptyResponses)?
        .to_string();

    tracing::debug!(
        winner = %winner,
        tied = ?top_categories,
        "category vote tied, resolved by tie-break"
    );

    Ok(Finalization {
        winning_category: winner,
        votes,
        tied_medians,
    })
}
