//! Round metrics computed over a round's rating values.

use serde::{Deserialize, Serialize};

use crate::response::ExpertResponse;

/// Ratings at or above this value count toward inclusion agreement.
pub const INCLUSION_THRESHOLD: u8 = 7;

/// Ratings at or below this value count toward exclusion agreement.
pub const EXCLUSION_THRESHOLD: u8 = 3;

/// Summary statistics for one round of ratings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundMetrics {
    /// Median rating
    pub median: f64,

    /// Fraction of ratings >= 7
    pub agreement_inclusion: f64,

    /// Fraction of ratings <= 3
    pub agreement_exclusion: f64,
}

impl RoundMetrics {
    /// Compute metrics from a round's responses.
    ///
    /// Returns `None` for an empty round.
    pub fn from_responses(responses: &[ExpertResponse]) -> Option<Self> {
        let ratings: Vec<u8> = responses.iter().map(|r| r.rating()).collect();
        Self::from_ratings(&ratings)
    }

    /// Compute metrics from raw rating values.
    pub fn from_ratings(ratings: &[u8]) -> Option<Self> {
        let median = median(ratings)?;
        let total = ratings.len() as f64;
        let inclusion = ratings.iter().filter(|&&r| r >= INCLUSION_THRESHOLD).count();
        let exclusion = ratings.iter().filter(|&&r| r <= EXCLUSION_THRESHOLD).count();

        Some(Self {
            median,
            agreement_inclusion: inclusion as f64 / total,
            agreement_exclusion: exclusion as f64 / total,
        })
    }
}

/// Median of a set of ratings; the mean of the two middle values for an
/// even count. `None` when empty.
pub fn median(ratings: &[u8]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }

    let mut sorted = ratings.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    let value = if sorted.len() % 2 == 0 {
        (f64::from(sorted[mid - 1]) + f64::from(sorted[mid])) / 2.0
    } else {
        f64::from(sorted[mid])
    };

    Some(value)
}
