//! Expert responses.
//!
//! An [`ExpertResponse`] is the only place where malformed upstream data is
//! caught: out-of-range ratings or confidences are rejected at construction,
//! never clamped. Once built, a response is immutable.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Lowest rating on the Delphi scale.
pub const MIN_RATING: i64 = 1;

/// Highest rating on the Delphi scale.
pub const MAX_RATING: i64 = 9;

/// Confidence assumed when a backend omits it.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Errors raised while constructing an [`ExpertResponse`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResponseError {
    #[error("round must be >= 1, got {0}")]
    RoundOutOfRange(u32),

    #[error("rating must be within [1, 9], got {0}")]
    RatingOutOfRange(i64),

    #[error("confidence must be within [0.0, 1.0], got {0}")]
    ConfidenceOutOfRange(f64),
}

/// Raw judgment returned by an expert capability, before validation.
///
/// This mirrors the JSON object an LLM backend is asked to produce.
/// `rationale` and `confidence` are optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpertRating {
    #[serde(deserialize_with = "deserialize_rating")]
    pub rating: i64,

    #[serde(deserialize_with = "deserialize_text")]
    pub category: String,

    #[serde(default, deserialize_with = "deserialize_text")]
    pub rationale: String,

    #[serde(default = "default_confidence", deserialize_with = "deserialize_confidence")]
    pub confidence: f64,
}

impl ExpertRating {
    pub fn new(
        rating: i64,
        category: impl Into<String>,
        rationale: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            rating,
            category: category.into(),
            rationale: rationale.into(),
            confidence,
        }
    }
}

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

/// Accepts `8`, `8.0` and `"8"`. Non-integral values are rejected here;
/// range checks happen when the response is built.
fn deserialize_rating<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match Wire::deserialize(deserializer)? {
        Wire::Int(value) => Ok(value),
        Wire::Float(value) if value.fract() == 0.0 && value.is_finite() => Ok(value as i64),
        Wire::Float(value) => Err(D::Error::custom(format!(
            "rating must be an integer, got {value}"
        ))),
        Wire::Text(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| D::Error::custom(format!("rating must be an integer, got '{text}'"))),
    }
}

/// Accepts any JSON scalar and keeps its text, so `"category": 3` reads as `"3"`.
fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Text(String),
        Int(i64),
        Float(f64),
        Flag(bool),
    }

    match Wire::deserialize(deserializer) {
        Ok(Wire::Text(text)) => Ok(text),
        Ok(Wire::Int(value)) => Ok(value.to_string()),
        Ok(Wire::Float(value)) => Ok(value.to_string()),
        Ok(Wire::Flag(value)) => Ok(value.to_string()),
        Err(_) => Err(D::Error::custom("expected a string, number or boolean")),
    }
}

/// Accepts `0.8` and `"0.8"`. Range checks happen when the response is built.
fn deserialize_confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Number(f64),
        Text(String),
    }

    match Wire::deserialize(deserializer)? {
        Wire::Number(value) => Ok(value),
        Wire::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("confidence must be a number, got '{text}'"))),
    }
}

/// Clarification exchange attached to a response in the recursive protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clarification {
    pub question: String,
    pub answer: String,
}

/// One expert's validated judgment for one round of one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawExpertResponse")]
pub struct ExpertResponse {
    item_id: String,
    round: u32,
    expert_id: String,
    clarification_question: Option<String>,
    facilitator_answer: Option<String>,
    rating: u8,
    category: String,
    rationale: String,
    confidence: f64,
}

impl ExpertResponse {
    /// Validate a raw rating and bind it to its identity.
    pub fn new(
        item_id: impl Into<String>,
        round: u32,
        expert_id: impl Into<String>,
        rating: ExpertRating,
        clarification: Option<Clarification>,
    ) -> Result<Self, ResponseError> {
        if round < 1 {
            return Err(ResponseError::RoundOutOfRange(round));
        }
        if !(MIN_RATING..=MAX_RATING).contains(&rating.rating) {
            return Err(ResponseError::RatingOutOfRange(rating.rating));
        }
        // NaN fails the range check as well.
        if !(0.0..=1.0).contains(&rating.confidence) {
            return Err(ResponseError::ConfidenceOutOfRange(rating.confidence));
        }

        let (clarification_question, facilitator_answer) = match clarification {
            Some(c) => (Some(c.question), Some(c.answer)),
            None => (None, None),
        };

        Ok(Self {
            item_id: item_id.into(),
            round,
            expert_id: expert_id.into(),
            clarification_question,
            facilitator_answer,
            rating: rating.rating as u8,
            category: rating.category,
            rationale: rating.rationale,
            confidence: rating.confidence,
        })
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn expert_id(&self) -> &str {
        &self.expert_id
    }

    pub fn clarification_question(&self) -> Option<&str> {
        self.clarification_question.as_deref()
    }

    pub fn facilitator_answer(&self) -> Option<&str> {
        self.facilitator_answer.as_deref()
    }

    /// Rating on the 1..=9 scale.
    pub fn rating(&self) -> u8 {
        self.rating
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// Wire shape used to route deserialization through [`ExpertResponse::new`].
#[derive(Deserialize)]
struct RawExpertResponse {
    item_id: String,
    round: u32,
    expert_id: String,
    #[serde(default)]
    clarification_question: Option<String>,
    #[serde(default)]
    facilitator_answer: Option<String>,
    rating: i64,
    category: String,
    #[serde(default)]
    rationale: String,
    confidence: f64,
}

impl TryFrom<RawExpertResponse> for ExpertResponse {
    type Error = ResponseError;

    fn try_from(raw: RawExpertResponse) -> Result<Self, Self::Error> {
        let mut response = ExpertResponse::new(
            raw.item_id,
            raw.round,
            raw.expert_id,
            ExpertRating {
                rating: raw.rating,
                category: raw.category,
                rationale: raw.rationale,
                confidence: raw.confidence,
            },
            None,
        )?;
        response.clarification_question = raw.clarification_question;
        response.facilitator_answer = raw.facilitator_answer;
        Ok(response)
    }
}
