//! Error types for the dialogue engine.

use solace_core::error::SolaceError;

/// Errors from the dialogue engine and its collaborators.
///
/// Collaborator variants never reach the user: the orchestrator converts
/// them to a neutral value or a fixed reply at the call site.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("emotion classifier error: {0}")]
    Classifier(String),
    #[error("normalizer error: {0}")]
    Normalizer(String),
    #[error("search error: {0}")]
    Search(String),
    #[error("search timed out after {0} seconds")]
    SearchTimeout(u64),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("journal error: {0}")]
    Journal(String),
    #[error("response table error: {0}")]
    ResponseTable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SolaceError> for ChatError {
    fn from(err: SolaceError) -> Self {
        ChatError::Internal(err.to_string())
    }
}

impl From<csv::Error> for ChatError {
    fn from(err: csv::Error) -> Self {
        ChatError::Journal(err.to_string())
    }
}

impl From<ChatError> for SolaceError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Journal(msg) => SolaceError::Storage(msg),
            ChatError::ResponseTable(msg) => SolaceError::Storage(msg),
            other => SolaceError::Api(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        let err = ChatError::Classifier("model not loaded".to_string());
        assert_eq!(err.to_string(), "emotion classifier error: model not loaded");

        let err = ChatError::Normalizer("bad token".to_string());
        assert_eq!(err.to_string(), "normalizer error: bad token");

        let err = ChatError::Search("503".to_string());
        assert_eq!(err.to_string(), "search error: 503");

        let err = ChatError::SearchTimeout(10);
        assert_eq!(err.to_string(), "search timed out after 10 seconds");

        let err = ChatError::Validation("empty text".to_string());
        assert_eq!(err.to_string(), "invalid input: empty text");

        let err = ChatError::Journal("disk full".to_string());
        assert_eq!(err.to_string(), "journal error: disk full");

        let err = ChatError::ResponseTable("missing column".to_string());
        assert_eq!(err.to_string(), "response table error: missing column");

        let err = ChatError::Internal("lock".to_string());
        assert_eq!(err.to_string(), "internal error: lock");
    }

    #[test]
    fn test_from_solace_error() {
        let err: ChatError = SolaceError::Config("bad".to_string()).into();
        assert!(matches!(err, ChatError::Internal(_)));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_into_solace_error() {
        let err: SolaceError = ChatError::Journal("denied".to_string()).into();
        assert!(matches!(err, SolaceError::Storage(_)));

        let err: SolaceError = ChatError::Search("down".to_string()).into();
        assert!(matches!(err, SolaceError::Api(_)));
    }
}
