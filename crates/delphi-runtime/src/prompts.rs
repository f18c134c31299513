//! Prompts for LLM-backed panel agents.
//!
//! The system prompts are fixed; per-turn content (item, round, expert,
//! clarification exchange) goes into the user message so that every expert
//! sees an identically framed task.

use crate::agents::{FacilitatorRequest, RatingRequest};

/// Fixed text a facilitator returns when a question asks for a rating, a
/// recommendation, or anything outside the item itself.
pub const OUT_OF_SCOPE_REFUSAL: &str = "I can only clarify the wording and scope of this item; \
     I cannot recommend a rating or a decision.";

/// System prompt shared by every expert seat.
pub const EXPERT_SYSTEM_PROMPT: &str = r#"
You are an independent expert on a Delphi consensus panel.

You rate one candidate item at a time. You do not see the other experts,
their ratings, or their reasoning. Judge the item on its own merits.

## Rating Scale
- 1-3: the item should be excluded
- 4-6: the item is uncertain and may be kept
- 7-9: the item should be included

## Categories
Use exactly one of: "include", "maybe", "exclude".

## Output Format (JSON only, no prose)
{
  "rating": 1-9 integer,
  "category": "include" | "maybe" | "exclude",
  "rationale": "one or two short sentences",
  "confidence": 0.0-1.0
}
"#;

/// System prompt for the facilitator in the recursive protocol.
pub const FACILITATOR_SYSTEM_PROMPT: &str = r#"
You are the neutral facilitator of a Delphi consensus panel.

An expert has asked one question about the wording or scope of an item.
Answer it briefly and factually, using only the item text.

## Constraints
1. Never suggest a rating, a category, or whether the item should be kept
2. Never mention other experts or earlier rounds
3. If the question asks for a recommendation or goes beyond the item, reply
   with exactly the refusal sentence below and nothing else

## Refusal
"#;

/// Full facilitator system prompt including the refusal sentence.
pub fn facilitator_system_prompt() -> String {
    format!("{FACILITATOR_SYSTEM_PROMPT}{OUT_OF_SCOPE_REFUSAL}\n")
}

fn item_context(request: &RatingRequest) -> String {
    format!(
        "Round: {}\nExpert: {}\nItem ID: {}\nItem: {}",
        request.round, request.expert_id, request.item_id, request.item_text
    )
}

/// User message for a direct rating (standard protocol).
pub fn rating_prompt(request: &RatingRequest) -> String {
    format!(
        "{}\n\nRate this item. Return only the JSON object.",
        item_context(request)
    )
}

/// User message asking an expert for one clarification question.
pub fn clarification_prompt(request: &RatingRequest) -> String {
    format!(
        "{}\n\nBefore rating, ask the facilitator exactly one short question about the \
         wording or scope of this item. Return only JSON: {{\"question\": \"...\"}}",
        item_context(request)
    )
}

/// User message for a rating that follows a clarification exchange.
pub fn clarified_rating_prompt(request: &RatingRequest, question: &str, answer: &str) -> String {
    format!(
        "{}\n\nYour question: {}\nFacilitator answer: {}\n\nNow rate this item. \
         Return only the JSON object.",
        item_context(request),
        question,
        answer
    )
}

/// User message carrying an expert's question to the facilitator.
pub fn facilitator_prompt(request: &FacilitatorRequest) -> String {
    format!(
        "Item ID: {}\nItem: {}\n\nExpert question: {}",
        request.item_id, request.item_text, request.clarification_question
    )
}
