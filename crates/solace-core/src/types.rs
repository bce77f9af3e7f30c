use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label used whenever emotion detection is unavailable or inconclusive.
pub const NEUTRAL_EMOTION: &str = "neutral";

// =============================================================================
// EmotionSignal
// =============================================================================

/// A single (label, confidence) pair produced by an emotion classifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionSignal {
    /// Lowercased emotion label, e.g. "sadness".
    pub label: String,
    /// Classifier confidence in the range `0.0..=1.0`.
    pub confidence: f32,
}

impl EmotionSignal {
    /// Build a signal, lowercasing the label and clamping confidence to `[0, 1]`.
    pub fn new(label: impl AsRef<str>, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            label: label.as_ref().trim().to_lowercase(),
            confidence,
        }
    }

    /// The `("neutral", 0.0)` signal.
    pub fn neutral() -> Self {
        Self {
            label: NEUTRAL_EMOTION.to_string(),
            confidence: 0.0,
        }
    }
}

// =============================================================================
// Turn
// =============================================================================

/// One recorded exchange: the user's message, the emotion read from it,
/// the reply, and when it happened. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    /// The message as the user typed it (not the typo-corrected form).
    pub user_message: String,
    pub emotion: EmotionSignal,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(
        user_message: impl Into<String>,
        emotion: EmotionSignal,
        response: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_message: user_message.into(),
            emotion,
            response: response.into(),
            timestamp,
        }
    }

    /// Shorthand for `self.emotion.label`.
    pub fn emotion_label(&self) -> &str {
        &self.emotion.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_lowercases_label() {
        let signal = EmotionSignal::new("  Sadness ", 0.82);
        assert_eq!(signal.label, "sadness");
        assert!((signal.confidence - 0.82).abs() < f32::EPSILON);
    }

    #[test]
    fn test_signal_clamps_confidence() {
        assert_eq!(EmotionSignal::new("joy", 1.7).confidence, 1.0);
        assert_eq!(EmotionSignal::new("joy", -0.2).confidence, 0.0);
        assert_eq!(EmotionSignal::new("joy", f32::NAN).confidence, 0.0);
    }

    #[test]
    fn test_neutral_signal() {
        let signal = EmotionSignal::neutral();
        assert_eq!(signal.label, NEUTRAL_EMOTION);
        assert_eq!(signal.confidence, 0.0);
    }

    #[test]
    fn test_turn_new_assigns_unique_ids() {
        let now = Utc::now();
        let a = Turn::new("hi", EmotionSignal::neutral(), "hello", now);
        let b = Turn::new("hi", EmotionSignal::neutral(), "hello", now);
        assert_ne!(a.id, b.id);
        assert_eq!(a.emotion_label(), "neutral");
    }

    #[test]
    fn test_turn_serialization_roundtrip() {
        let turn = Turn::new(
            "I feel sad today",
            EmotionSignal::new("sadness", 0.82),
            "I'm sorry you're going through this.",
            Utc::now(),
        );
        let json = serde_json::to_string(&turn).unwrap();
        let back: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, turn);
    }
}
