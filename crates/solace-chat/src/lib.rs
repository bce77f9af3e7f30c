//! Dialogue engine for Solace.
//!
//! Turns one user message into one reply: typo correction, emotion
//! detection, question routing to web search or canned responses, and a
//! short rolling memory per session.

pub mod emotion;
pub mod error;
pub mod ladder;
pub mod memory;
pub mod normalizer;
pub mod orchestrator;
pub mod responses;
pub mod search;
pub mod session;
pub mod sink;

pub use emotion::{EmotionClassifier, LexiconClassifier, RemoteClassifier};
pub use error::ChatError;
pub use ladder::{Plan, TurnDecision, EMPTY_MESSAGE_REPLY, FALLBACK_REPLY, REPEAT_REPLY};
pub use memory::TurnMemory;
pub use normalizer::{LexiconNormalizer, PassthroughNormalizer, TextNormalizer};
pub use orchestrator::{Collaborators, DialogueOrchestrator, MemorySnapshot};
pub use responses::{ResponseSource, ResponseTable};
pub use search::{SearchPayload, SearchProvider, SerpApiProvider};
pub use session::{validate_session_id, SessionRegistry};
pub use sink::{
    CsvSinkFactory, CsvTurnSink, InMemorySinkFactory, InMemoryTurnSink, SinkFactory, TurnSink,
};
