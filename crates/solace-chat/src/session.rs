//! Session registry: one orchestrator, memory, and journal per session id.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use solace_core::config::MemoryConfig;

use crate::error::ChatError;
use crate::memory::TurnMemory;
use crate::orchestrator::{Collaborators, DialogueOrchestrator};
use crate::sink::SinkFactory;

/// Maximum length of a session id.
pub const MAX_SESSION_ID_LEN: usize = 64;

/// Check that `id` is 1-64 characters of `[A-Za-z0-9_-]`.
pub fn validate_session_id(id: &str) -> Result<(), ChatError> {
    if id.is_empty() || id.len() > MAX_SESSION_ID_LEN {
        return Err(ChatError::Validation(format!(
            "session id must be 1 to {} characters",
            MAX_SESSION_ID_LEN
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ChatError::Validation(
            "session id may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

/// Lazily created per-session orchestrators.
pub struct SessionRegistry {
    collaborators: Collaborators,
    memory: MemoryConfig,
    sinks: Arc<dyn SinkFactory>,
    sessions: RwLock<HashMap<String, Arc<DialogueOrchestrator>>>,
}

impl SessionRegistry {
    pub fn new(
        collaborators: Collaborators,
        memory: MemoryConfig,
        sinks: Arc<dyn SinkFactory>,
    ) -> Self {
        Self {
            collaborators,
            memory,
            sinks,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// The orchestrator for `id`, starting a new session if needed.
    pub async fn get_or_create(&self, id: &str) -> Result<Arc<DialogueOrchestrator>, ChatError> {
        validate_session_id(id)?;

        if let Some(existing) = self.sessions.read().await.get(id) {
            return Ok(existing.clone());
        }

        let mut sessions = self.sessions.write().await;
        // Another request may have created it between the two locks.
        if let Some(existing) = sessions.get(id) {
            return Ok(existing.clone());
        }

        let orchestrator = Arc::new(DialogueOrchestrator::start(
            id,
            self.collaborators.clone(),
            TurnMemory::from_config(&self.memory),
            self.sinks.create(id),
        ));
        sessions.insert(id.to_string(), orchestrator.clone());
        info!(session = %id, "Started new dialogue session");
        Ok(orchestrator)
    }

    /// The orchestrator for `id` if the session exists.
    pub async fn get(&self, id: &str) -> Option<Arc<DialogueOrchestrator>> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// The shared collaborators, e.g. for batch classification.
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::LexiconClassifier;
    use crate::normalizer::PassthroughNormalizer;
    use crate::responses::{ResponseSource, ResponseTable};
    use crate::search::{SearchPayload, SearchProvider};
    use crate::sink::InMemorySinkFactory;
    use async_trait::async_trait;
    use std::time::Duration;

    struct NoSearch;

    #[async_trait]
    impl SearchProvider for NoSearch {
        async fn search(&self, _query: &str) -> Result<SearchPayload, ChatError> {
            Ok(SearchPayload::default())
        }
    }

    fn registry() -> (SessionRegistry, InMemorySinkFactory) {
        let factory = InMemorySinkFactory::new();
        let collaborators = Collaborators {
            normalizer: Arc::new(PassthroughNormalizer),
            classifier: Arc::new(LexiconClassifier::new()),
            responses: Arc::new(ResponseSource::with_seed(
                ResponseTable::empty(),
                Arc::new(NoSearch),
                Duration::from_secs(1),
                1,
            )),
        };
        let registry = SessionRegistry::new(
            collaborators,
            MemoryConfig::default(),
            Arc::new(factory.clone()),
        );
        (registry, factory)
    }

    #[test]
    fn test_validate_session_id() {
        assert!(validate_session_id("default_user").is_ok());
        assert!(validate_session_id("Guest-42").is_ok());
        assert!(validate_session_id(&"a".repeat(64)).is_ok());
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id(&"a".repeat(65)).is_err());
        assert!(validate_session_id("../etc/passwd").is_err());
        assert!(validate_session_id("two words").is_err());
        assert!(validate_session_id("émile").is_err());
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_session() {
        let (registry, factory) = registry();
        let first = registry.get_or_create("alice").await.unwrap();
        let second = registry.get_or_create("alice").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len().await, 1);
        assert_eq!(factory.sink("alice").unwrap().initializations(), 1);
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_memory() {
        let (registry, _factory) = registry();
        let alice = registry.get_or_create("alice").await.unwrap();
        let bob = registry.get_or_create("bob").await.unwrap();

        alice.generate_response("I feel sad").await;
        assert_eq!(alice.snapshot().await.turns.len(), 1);
        assert!(bob.snapshot().await.turns.is_empty());

        // Not a repeat for bob: his memory is empty.
        let reply = bob.generate_response("I feel sad").await;
        assert_ne!(reply, crate::ladder::REPEAT_REPLY);
    }

    #[tokio::test]
    async fn test_invalid_id_rejected() {
        let (registry, _factory) = registry();
        assert!(matches!(
            registry.get_or_create("bad id").await,
            Err(ChatError::Validation(_))
        ));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_unknown_session() {
        let (registry, _factory) = registry();
        assert!(registry.get("nobody").await.is_none());
        registry.get_or_create("somebody").await.unwrap();
        assert!(registry.get("somebody").await.is_some());
    }
}
