//! Per-turn decision ladder.
//!
//! Pure functions from the current message, the memory state and the
//! collaborator results to a reply and an optional memory mutation. The
//! orchestrator performs the I/O; everything that decides lives here.

use chrono::{DateTime, Utc};

use solace_core::types::{EmotionSignal, Turn};

use crate::error::ChatError;
use crate::memory::TurnMemory;

/// Reply when the user repeats the previous message.
pub const REPEAT_REPLY: &str = "It seems like this is important to you. Let's explore it further.";

/// Reply when a turn fails unexpectedly. Never recorded.
pub const FALLBACK_REPLY: &str = "I'm sorry, I encountered an issue. Can you try again?";

/// Reply to an empty or whitespace-only message.
pub const EMPTY_MESSAGE_REPLY: &str =
    "I'm here to listen. Could you tell me more about how you're feeling?";

/// How a turn will be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Same message as the previous turn; short-circuit.
    Repeat,
    /// Message is a question; answer from web search.
    Search,
    /// Answer from the canned table for the detected emotion.
    Canned,
}

/// Outcome of a completed turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnDecision {
    pub response: String,
    /// Turn to record in memory and the journal, if any.
    pub record: Option<Turn>,
}

impl TurnDecision {
    /// The repetition short-circuit: fixed reply, nothing recorded.
    pub fn repeat() -> Self {
        Self {
            response: REPEAT_REPLY.to_string(),
            record: None,
        }
    }

    /// The generic fallback: fixed reply, nothing recorded.
    pub fn fallback() -> Self {
        Self {
            response: FALLBACK_REPLY.to_string(),
            record: None,
        }
    }
}

/// Whether `message` asks a question: ends with `?` once trimmed.
pub fn is_question(message: &str) -> bool {
    message.trim().ends_with('?')
}

/// Choose the route for `message`.
///
/// Repetition takes priority over everything else. Question detection
/// looks at the raw message, not the normalized one.
pub fn plan(message: &str, memory: &TurnMemory) -> Plan {
    if memory.is_repeat(message) {
        Plan::Repeat
    } else if is_question(message) {
        Plan::Search
    } else {
        Plan::Canned
    }
}

/// Text to classify and search with: the normalized form, or the original
/// when normalization failed.
pub fn corrected_or_original(message: &str, normalized: Result<String, ChatError>) -> String {
    normalized.unwrap_or_else(|_| message.to_string())
}

/// Emotion for the turn; classifier failure yields `("neutral", 0.0)`.
pub fn emotion_or_neutral(result: Result<EmotionSignal, ChatError>) -> EmotionSignal {
    result.unwrap_or_else(|_| EmotionSignal::neutral())
}

/// Build the decision for a turn that produced `response`.
pub fn settle(
    message: &str,
    emotion: EmotionSignal,
    response: String,
    now: DateTime<Utc>,
) -> TurnDecision {
    let turn = Turn::new(message, emotion, response.clone(), now);
    TurnDecision {
        response,
        record: Some(turn),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn after(message: &str) -> TurnMemory {
        let mut memory = TurnMemory::default();
        memory.record(Turn::new(message, EmotionSignal::neutral(), "ok", Utc::now()));
        memory
    }

    #[test]
    fn test_question_detection() {
        assert!(is_question("What is the capital of France?"));
        assert!(is_question("really?   \n"));
        assert!(!is_question("I feel sad today"));
        assert!(!is_question("? not at the end"));
        assert!(!is_question(""));
    }

    #[test]
    fn test_repeat_is_case_insensitive() {
        let memory = after("I feel sad");
        assert_eq!(plan("I FEEL SAD", &memory), Plan::Repeat);
        assert_eq!(plan("i feel sad", &memory), Plan::Repeat);
        assert_eq!(plan("I feel sad today", &memory), Plan::Canned);
        assert_eq!(plan("I feel sad", &TurnMemory::default()), Plan::Canned);
    }

    #[test]
    fn test_repeat_beats_question() {
        let memory = after("Are you there?");
        assert_eq!(plan("are you there?", &memory), Plan::Repeat);
        assert_eq!(plan("Are you there?", &TurnMemory::default()), Plan::Search);
    }

    #[test]
    fn test_repeat_ignores_older_turns() {
        let mut memory = after("I feel sad");
        memory.record(Turn::new("hello", EmotionSignal::neutral(), "hi", Utc::now()));
        assert_eq!(plan("I feel sad", &memory), Plan::Canned);
    }

    #[test]
    fn test_corrected_falls_back_to_original() {
        assert_eq!(
            corrected_or_original("I fel sad", Ok("I feel sad".to_string())),
            "I feel sad"
        );
        assert_eq!(
            corrected_or_original("I fel sad", Err(ChatError::Normalizer("down".to_string()))),
            "I fel sad"
        );
    }

    #[test]
    fn test_emotion_failure_is_neutral() {
        let signal = emotion_or_neutral(Err(ChatError::Classifier("model missing".to_string())));
        assert_eq!(signal.label, "neutral");
        assert_eq!(signal.confidence, 0.0);

        let signal = emotion_or_neutral(Ok(EmotionSignal::new("sadness", 0.82)));
        assert_eq!(signal.label, "sadness");
    }

    #[test]
    fn test_settle_records_turn() {
        let now = Utc::now();
        let decision = settle(
            "I feel sad today",
            EmotionSignal::new("sadness", 0.82),
            "I'm here for you.".to_string(),
            now,
        );
        assert_eq!(decision.response, "I'm here for you.");
        let turn = decision.record.unwrap();
        assert_eq!(turn.user_message, "I feel sad today");
        assert_eq!(turn.emotion_label(), "sadness");
        assert_eq!(turn.response, "I'm here for you.");
        assert_eq!(turn.timestamp, now);
    }

    #[test]
    fn test_fixed_decisions_record_nothing() {
        assert_eq!(TurnDecision::repeat().response, REPEAT_REPLY);
        assert!(TurnDecision::repeat().record.is_none());
        assert_eq!(TurnDecision::fallback().response, FALLBACK_REPLY);
        assert!(TurnDecision::fallback().record.is_none());
    }

    proptest! {
        #[test]
        fn test_trailing_question_mark_routes_to_search(body in "[a-zA-Z ,']{0,40}", pad in "[ \t]{0,3}") {
            let message = format!("{}?{}", body, pad);
            prop_assert_eq!(plan(&message, &TurnMemory::default()), Plan::Search);
        }

        #[test]
        fn test_no_question_mark_routes_to_canned(message in "[a-zA-Z ,.!']{0,40}") {
            prop_assert_eq!(plan(&message, &TurnMemory::default()), Plan::Canned);
        }
    }
}
