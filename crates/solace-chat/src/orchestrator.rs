//! Dialogue orchestrator: runs one conversation turn end to end.
//!
//! Sequences the repetition check, normalization, emotion detection,
//! question routing, and memory update for a single session. Every
//! collaborator is fail-soft, and everything after the repetition check,
//! journaling and memory update included, is contained so that a panic
//! produces the fallback reply.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info_span, warn, Instrument, Span};

use solace_core::types::Turn;

use crate::emotion::EmotionClassifier;
use crate::ladder::{self, Plan, TurnDecision};
use crate::memory::TurnMemory;
use crate::normalizer::TextNormalizer;
use crate::responses::ResponseSource;
use crate::sink::TurnSink;

/// Services shared by every session.
#[derive(Clone)]
pub struct Collaborators {
    pub normalizer: Arc<dyn TextNormalizer>,
    pub classifier: Arc<dyn EmotionClassifier>,
    pub responses: Arc<ResponseSource>,
}

/// Read-only view of a session's memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySnapshot {
    pub turns: Vec<Turn>,
    /// The last response, if still fresh.
    pub last_response: Option<String>,
}

/// Per-session turn pipeline.
pub struct DialogueOrchestrator {
    session: String,
    collaborators: Collaborators,
    /// Held for the whole turn so turns of one session never interleave.
    memory: Mutex<TurnMemory>,
    sink: Arc<dyn TurnSink>,
    span: Span,
}

impl DialogueOrchestrator {
    /// Create the orchestrator for `session`, with a `dialogue` span.
    ///
    /// Initializes the sink; failure is logged and the session stays usable.
    pub fn start(
        session: impl Into<String>,
        collaborators: Collaborators,
        memory: TurnMemory,
        sink: Arc<dyn TurnSink>,
    ) -> Self {
        let session = session.into();
        let span = info_span!("dialogue", session = %session);
        Self::with_span(session, collaborators, memory, sink, span)
    }

    /// Like [`start`](Self::start) but instrumented by the given span.
    pub fn with_span(
        session: impl Into<String>,
        collaborators: Collaborators,
        memory: TurnMemory,
        sink: Arc<dyn TurnSink>,
        span: Span,
    ) -> Self {
        let orchestrator = Self {
            session: session.into(),
            collaborators,
            memory: Mutex::new(memory),
            sink,
            span,
        };
        orchestrator.span.in_scope(|| {
            if let Err(e) = orchestrator.sink.initialize() {
                error!(stage = "journal", error = %e, "Failed to initialize turn journal");
            }
        });
        orchestrator
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    /// Produce the reply to `message`. Never fails.
    pub async fn generate_response(&self, message: &str) -> String {
        self.run_turn(message).instrument(self.span.clone()).await
    }

    /// Current memory contents and freshness.
    pub async fn snapshot(&self) -> MemorySnapshot {
        let memory = self.memory.lock().await;
        MemorySnapshot {
            turns: memory.turns().cloned().collect(),
            last_response: memory.fresh_last().map(String::from),
        }
    }

    async fn run_turn(&self, message: &str) -> String {
        let mut memory = self.memory.lock().await;

        let plan = ladder::plan(message, &memory);
        if plan == Plan::Repeat {
            debug!("Repeated message, short-circuiting");
            return TurnDecision::repeat().response;
        }

        let memory = &mut *memory;
        let turn = async move {
            let TurnDecision { response, record } = self.respond(message, plan).await;
            if let Some(turn) = record {
                if let Err(e) = self.sink.append(&turn) {
                    warn!(stage = "journal", error = %e, "Failed to append turn to journal");
                }
                memory.record(turn);
            }
            response
        };

        match AssertUnwindSafe(turn).catch_unwind().await {
            Ok(response) => response,
            Err(panic) => {
                error!(
                    stage = "orchestrate",
                    error = %panic_detail(panic.as_ref()),
                    "Turn failed unexpectedly"
                );
                TurnDecision::fallback().response
            }
        }
    }

    /// Steps after the repetition check: normalize, classify, route.
    async fn respond(&self, message: &str, plan: Plan) -> TurnDecision {
        let normalized = self.collaborators.normalizer.correct(message);
        if let Err(e) = &normalized {
            warn!(stage = "normalize", error = %e, "Normalization failed, using original text");
        }
        let corrected = ladder::corrected_or_original(message, normalized);

        let analyzed = self.collaborators.classifier.analyze(&corrected).await;
        if let Err(e) = &analyzed {
            error!(stage = "classify", error = %e, "Emotion detection failed, using neutral");
        }
        let emotion = ladder::emotion_or_neutral(analyzed);
        debug!(emotion = %emotion.label, confidence = emotion.confidence, "Emotion detected");

        let response = match plan {
            Plan::Search => self.collaborators.responses.searched(&corrected).await,
            _ => self.collaborators.responses.canned(&emotion.label),
        };

        ladder::settle(message, emotion, response, Utc::now())
    }
}

fn panic_detail(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
