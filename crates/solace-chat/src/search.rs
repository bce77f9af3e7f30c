//! Web search provider abstraction and the SerpApi-compatible HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use solace_core::config::SearchConfig;

use crate::error::ChatError;

// =============================================================================
// Payload
// =============================================================================

/// The subset of a provider response the reply policy looks at.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchPayload {
    #[serde(default)]
    pub answer_box: Option<AnswerBox>,
    #[serde(default)]
    pub organic_results: Vec<OrganicResult>,
}

/// Direct answer block returned for factual queries.
///
/// The answer may be any JSON value; numbers and objects are common.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnswerBox {
    #[serde(default)]
    pub answer: Option<Value>,
}

/// One ranked web result.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub snippet: Option<Value>,
}

impl OrganicResult {
    /// The snippet as reply text, if present.
    pub fn snippet_text(&self) -> Option<String> {
        self.snippet.as_ref().and_then(render)
    }
}

/// Strings verbatim, `null` as absent, anything else as compact JSON.
fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl SearchPayload {
    /// Payload carrying only a direct answer.
    pub fn with_answer(answer: impl Into<String>) -> Self {
        Self {
            answer_box: Some(AnswerBox {
                answer: Some(Value::String(answer.into())),
            }),
            organic_results: Vec::new(),
        }
    }

    /// Payload carrying only organic results with the given snippets.
    pub fn with_snippets<I>(snippets: I) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        Self {
            answer_box: None,
            organic_results: snippets
                .into_iter()
                .map(|snippet| OrganicResult {
                    snippet: snippet.map(Value::String),
                })
                .collect(),
        }
    }

    /// The direct answer, if the answer box carries one.
    pub fn direct_answer(&self) -> Option<String> {
        self.answer_box
            .as_ref()
            .and_then(|b| b.answer.as_ref())
            .and_then(render)
    }
}

// =============================================================================
// Trait
// =============================================================================

/// A web search backend queried for question-type messages.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run `query` and return the parsed response.
    async fn search(&self, query: &str) -> Result<SearchPayload, ChatError>;
}

// =============================================================================
// SerpApiProvider
// =============================================================================

/// HTTP client for a SerpApi-style `GET ?q=&hl=&gl=&api_key=` endpoint.
pub struct SerpApiProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    hl: String,
    gl: String,
}

impl SerpApiProvider {
    /// Build a provider from the `[search]` config section.
    pub fn new(config: &SearchConfig) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| ChatError::Search(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            hl: config.hl.clone(),
            gl: config.gl.clone(),
        })
    }

    /// Whether an API key is configured.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[async_trait]
impl SearchProvider for SerpApiProvider {
    async fn search(&self, query: &str) -> Result<SearchPayload, ChatError> {
        if !self.has_api_key() {
            return Err(ChatError::Search("no search API key configured".to_string()));
        }

        let params = [
            ("q", query),
            ("hl", self.hl.as_str()),
            ("gl", self.gl.as_str()),
            ("api_key", self.api_key.as_str()),
        ];

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatError::Search(format!("request timed out: {}", e))
                } else if e.is_connect() {
                    ChatError::Search(format!("connection failed: {}", e))
                } else {
                    ChatError::Search(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Search(format!("provider returned HTTP {}", status)));
        }

        response
            .json::<SearchPayload>()
            .await
            .map_err(|e| ChatError::Search(format!("invalid provider response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_parses_answer_box() {
        let json = r#"{"answer_box": {"answer": "Paris", "type": "organic_result"}, "search_metadata": {}}"#;
        let payload: SearchPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.direct_answer().as_deref(), Some("Paris"));
        assert!(payload.organic_results.is_empty());
    }

    #[test]
    fn test_payload_parses_organic_results() {
        let json = r#"{"organic_results": [{"title": "x", "snippet": "first"}, {"title": "y"}]}"#;
        let payload: SearchPayload = serde_json::from_str(json).unwrap();
        assert!(payload.direct_answer().is_none());
        assert_eq!(payload.organic_results.len(), 2);
        assert_eq!(payload.organic_results[0].snippet_text().as_deref(), Some("first"));
        assert!(payload.organic_results[1].snippet_text().is_none());
    }

    #[test]
    fn test_answer_box_without_answer_field() {
        let json = r#"{"answer_box": {"title": "Weather"}}"#;
        let payload: SearchPayload = serde_json::from_str(json).unwrap();
        assert!(payload.answer_box.is_some());
        assert!(payload.direct_answer().is_none());
    }

    #[test]
    fn test_payload_numeric_answer() {
        let json = r#"{"answer_box": {"answer": 42}}"#;
        let payload: SearchPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.direct_answer().as_deref(), Some("42"));
    }

    #[test]
    fn test_payload_structured_answer_and_snippet() {
        let json = r#"{"answer_box": {"answer": {"value": 3.5, "unit": "km"}}, "organic_results": [{"snippet": ["a", "b"]}]}"#;
        let payload: SearchPayload = serde_json::from_str(json).unwrap();
        assert_eq!(
            payload.direct_answer().as_deref(),
            Some(r#"{"unit":"km","value":3.5}"#)
        );
        assert_eq!(
            payload.organic_results[0].snippet_text().as_deref(),
            Some(r#"["a","b"]"#)
        );
    }

    #[test]
    fn test_null_answer_is_absent() {
        let json = r#"{"answer_box": {"answer": null}, "organic_results": [{"snippet": null}]}"#;
        let payload: SearchPayload = serde_json::from_str(json).unwrap();
        assert!(payload.direct_answer().is_none());
        assert!(payload.organic_results[0].snippet_text().is_none());
    }

    #[test]
    fn test_empty_object_parses() {
        let payload: SearchPayload = serde_json::from_str("{}").unwrap();
        assert_eq!(payload, SearchPayload::default());
    }

    #[test]
    fn test_helpers() {
        assert_eq!(SearchPayload::with_answer("42").direct_answer().as_deref(), Some("42"));
        let payload = SearchPayload::with_snippets(vec![None, Some("s".to_string())]);
        assert_eq!(payload.organic_results.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_network() {
        let provider = SerpApiProvider::new(&SearchConfig::default()).unwrap();
        assert!(!provider.has_api_key());
        let result = provider.search("capital of France").await;
        assert!(matches!(result, Err(ChatError::Search(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_search_error() {
        let config = SearchConfig {
            endpoint: "http://127.0.0.1:9/search".to_string(),
            api_key: "key".to_string(),
            timeout_secs: 2,
            ..SearchConfig::default()
        };
        let provider = SerpApiProvider::new(&config).unwrap();
        let result = provider.search("anything").await;
        assert!(matches!(result, Err(ChatError::Search(_))));
    }
}
