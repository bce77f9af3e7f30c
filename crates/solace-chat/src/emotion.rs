//! Emotion classification.
//!
//! The classifier is a black box mapping text to ranked
//! (label, confidence) pairs. Two backends ship with the crate:
//!
//! 1. **Lexicon**: offline keyword scan over six base emotions.
//! 2. **Remote**: an HTTP text-classification inference endpoint.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;

use solace_core::config::ClassifierConfig;
use solace_core::types::{EmotionSignal, NEUTRAL_EMOTION};

use crate::error::ChatError;

/// Message for batch input that is empty or contains blank strings.
pub const BATCH_VALIDATION_MESSAGE: &str = "Input must be a list of non-empty strings.";

// =============================================================================
// Trait
// =============================================================================

/// Maps an utterance to emotion signals.
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    /// All (label, confidence) pairs for `text`, most confident first.
    async fn rank(&self, text: &str) -> Result<Vec<EmotionSignal>, ChatError>;

    /// The single most confident signal, `("neutral", 0.0)` if none.
    async fn analyze(&self, text: &str) -> Result<EmotionSignal, ChatError> {
        let ranked = self.rank(text).await?;
        Ok(top_signal(ranked))
    }

    /// Top label for each text.
    ///
    /// Rejects blank entries. Individual classification failures degrade
    /// to `"neutral"` instead of failing the batch.
    async fn analyze_batch(&self, texts: &[String]) -> Result<Vec<String>, ChatError> {
        validate_batch(texts)?;
        let mut labels = Vec::with_capacity(texts.len());
        for text in texts {
            let label = match self.analyze(text).await {
                Ok(signal) => signal.label,
                Err(e) => {
                    tracing::error!(stage = "classify", error = %e, "Error during batch emotion analysis");
                    NEUTRAL_EMOTION.to_string()
                }
            };
            labels.push(label);
        }
        Ok(labels)
    }
}

/// Reject batches containing empty or whitespace-only strings.
pub fn validate_batch(texts: &[String]) -> Result<(), ChatError> {
    if texts.iter().any(|t| t.trim().is_empty()) {
        return Err(ChatError::Validation(BATCH_VALIDATION_MESSAGE.to_string()));
    }
    Ok(())
}

/// The highest-confidence signal; the earliest wins ties.
pub fn top_signal(signals: Vec<EmotionSignal>) -> EmotionSignal {
    signals
        .into_iter()
        .fold(None::<EmotionSignal>, |best, signal| match best {
            Some(b) if b.confidence >= signal.confidence => Some(b),
            _ => Some(signal),
        })
        .unwrap_or_else(EmotionSignal::neutral)
}

fn sort_descending(signals: &mut [EmotionSignal]) {
    signals.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
}

// =============================================================================
// LexiconClassifier
// =============================================================================

/// (label, cue words)
const EMOTION_LEXICON: &[(&str, &[&str])] = &[
    (
        "sadness",
        &[
            "sad", "unhappy", "depressed", "down", "lonely", "alone", "cry", "crying", "tears",
            "miserable", "hopeless", "grief", "grieving", "heartbroken", "lost", "empty", "hurt",
            "miss", "gloomy", "upset",
        ],
    ),
    (
        "joy",
        &[
            "happy", "glad", "great", "good", "excited", "wonderful", "amazing", "awesome",
            "cheerful", "delighted", "fantastic", "joy", "proud", "relieved", "thrilled", "fun",
        ],
    ),
    (
        "love",
        &[
            "love", "loved", "loving", "adore", "caring", "affection", "grateful", "thankful",
            "cherish", "sweetheart", "romantic",
        ],
    ),
    (
        "anger",
        &[
            "angry", "mad", "furious", "annoyed", "irritated", "hate", "rage", "frustrated",
            "frustrating", "resent", "outraged", "pissed",
        ],
    ),
    (
        "fear",
        &[
            "afraid", "scared", "anxious", "anxiety", "nervous", "worried", "worry", "panic",
            "terrified", "fear", "frightened", "stressed", "overwhelmed",
        ],
    ),
    (
        "surprise",
        &[
            "surprised", "shocked", "unexpected", "amazed", "astonished", "wow", "suddenly",
            "unbelievable",
        ],
    ),
];

/// Words that cancel the cue immediately following them.
const NEGATORS: &[&str] = &["not", "never", "no", "don't", "didn't", "isn't", "wasn't", "can't"];

/// Confidence reported for text with no emotional cue words.
const NEUTRAL_CONFIDENCE: f32 = 0.5;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z]+(?:'[a-z]+)?").expect("Invalid word regex"));

/// Offline keyword classifier.
pub struct LexiconClassifier {
    lexicon: Vec<(&'static str, HashSet<&'static str>)>,
}

impl LexiconClassifier {
    pub fn new() -> Self {
        let lexicon = EMOTION_LEXICON
            .iter()
            .map(|(label, words)| (*label, words.iter().copied().collect()))
            .collect();
        Self { lexicon }
    }

    /// Count cue hits per label, skipping negated cues.
    fn score(&self, text: &str) -> Vec<(&'static str, usize)> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = WORD_RE.find_iter(&lower).map(|m| m.as_str()).collect();
        let mut hits = vec![0usize; self.lexicon.len()];

        for (i, word) in words.iter().enumerate() {
            let negated = i > 0 && NEGATORS.iter().any(|n| *n == words[i - 1]);
            if negated {
                continue;
            }
            for (slot, (_, cues)) in self.lexicon.iter().enumerate() {
                if cues.contains(*word) {
                    hits[slot] += 1;
                }
            }
        }

        self.lexicon
            .iter()
            .zip(hits)
            .filter(|(_, count)| *count > 0)
            .map(|((label, _), count)| (*label, count))
            .collect()
    }
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmotionClassifier for LexiconClassifier {
    async fn rank(&self, text: &str) -> Result<Vec<EmotionSignal>, ChatError> {
        let scores = self.score(text);
        let total: usize = scores.iter().map(|(_, c)| c).sum();
        if total == 0 {
            return Ok(vec![EmotionSignal::new(NEUTRAL_EMOTION, NEUTRAL_CONFIDENCE)]);
        }

        let mut signals: Vec<EmotionSignal> = scores
            .into_iter()
            .map(|(label, count)| EmotionSignal::new(label, count as f32 / total as f32))
            .collect();
        sort_descending(&mut signals);
        Ok(signals)
    }
}

// =============================================================================
// RemoteClassifier
// =============================================================================

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f32,
}

/// Inference APIs return either one list per input or a flat list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl InferenceResponse {
    fn into_signals(self) -> Vec<EmotionSignal> {
        let scores = match self {
            InferenceResponse::Nested(mut outer) => {
                if outer.is_empty() {
                    Vec::new()
                } else {
                    outer.swap_remove(0)
                }
            }
            InferenceResponse::Flat(scores) => scores,
        };
        let mut signals: Vec<EmotionSignal> = scores
            .into_iter()
            .map(|s| EmotionSignal::new(s.label, s.score))
            .collect();
        sort_descending(&mut signals);
        signals
    }
}

/// Client for a hosted text-classification model.
pub struct RemoteClassifier {
    client: Client,
    endpoint: String,
    api_token: String,
}

impl RemoteClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| ChatError::Classifier(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
        })
    }
}

#[async_trait]
impl EmotionClassifier for RemoteClassifier {
    async fn rank(&self, text: &str) -> Result<Vec<EmotionSignal>, ChatError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "inputs": text }));
        if !self.api_token.trim().is_empty() {
            request = request.bearer_auth(&self.api_token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChatError::Classifier(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Classifier(format!(
                "inference endpoint returned HTTP {}",
                status
            )));
        }

        let parsed: InferenceResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Classifier(format!("invalid inference response: {}", e)))?;
        Ok(parsed.into_signals())
    }
}

// =============================================================================
// Tests
// =============================================================================
