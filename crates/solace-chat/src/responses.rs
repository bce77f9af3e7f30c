//! Reply sources: the canned emotion→responses table and web search.
//!
//! Both paths are fail-soft. A label missing from the table falls back to
//! the default list, and every search failure becomes a fixed apology.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use serde::Deserialize;

use crate::error::ChatError;
use crate::search::{SearchPayload, SearchProvider};

/// Candidates used for any label absent from the table.
pub const DEFAULT_RESPONSES: &[&str] = &["I'm here to listen."];
/// Organic result present but without a snippet.
pub const NO_SNIPPET_REPLY: &str = "No relevant snippet found.";
/// Provider answered with neither an answer box nor organic results.
pub const NO_RESULTS_REPLY: &str = "I couldn't find any relevant information online.";
/// Transport, parse, or timeout failure from the provider.
pub const SEARCH_ERROR_REPLY: &str =
    "I'm sorry, I encountered an error while searching. Please try again later.";

// =============================================================================
// ResponseTable
// =============================================================================

#[derive(Debug, Deserialize)]
struct ResponseRow {
    emotion: String,
    response: String,
}

/// Immutable mapping from lowercased emotion label to candidate replies.
#[derive(Debug, Clone, Default)]
pub struct ResponseTable {
    entries: HashMap<String, Vec<String>>,
}

impl ResponseTable {
    /// An empty table; every lookup yields the default list.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from `(emotion, response)` pairs, keeping file order.
    pub fn from_pairs<I, E, R>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (E, R)>,
        E: AsRef<str>,
        R: AsRef<str>,
    {
        let mut entries: HashMap<String, Vec<String>> = HashMap::new();
        for (emotion, response) in pairs {
            let emotion = emotion.as_ref().trim().to_lowercase();
            let response = response.as_ref().trim();
            if emotion.is_empty() || response.is_empty() {
                continue;
            }
            entries.entry(emotion).or_default().push(response.to_string());
        }
        Self { entries }
    }

    /// Parse CSV with an `emotion,response` header from any reader.
    ///
    /// A single malformed row rejects the whole table.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, ChatError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut rows = Vec::new();
        for record in csv_reader.deserialize::<ResponseRow>() {
            let row = record.map_err(|e| ChatError::ResponseTable(e.to_string()))?;
            rows.push((row.emotion, row.response));
        }
        Ok(Self::from_pairs(rows))
    }

    /// Load the table from a CSV file.
    pub fn load(path: &Path) -> Result<Self, ChatError> {
        let file = std::fs::File::open(path).map_err(|e| {
            ChatError::ResponseTable(format!("cannot open {}: {}", path.display(), e))
        })?;
        Self::from_reader(file)
    }

    /// Load the table, yielding an empty table when the file is missing or malformed.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(table) => {
                if table.is_empty() {
                    tracing::warn!(path = %path.display(), "No responses loaded. Please check the CSV file.");
                } else {
                    tracing::info!(
                        path = %path.display(),
                        labels = table.len(),
                        "Response table loaded"
                    );
                }
                table
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Error loading response table");
                Self::empty()
            }
        }
    }

    /// Candidates for `label` (case-insensitive), if the table has any.
    pub fn get(&self, label: &str) -> Option<&[String]> {
        self.entries
            .get(&label.trim().to_lowercase())
            .map(Vec::as_slice)
    }

    /// Number of distinct labels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Search reply policy
// =============================================================================

/// Turn a provider outcome into the user-facing reply.
///
/// Priority: direct answer, then the first organic snippet, then the
/// no-results literal. Any error yields the search-error literal.
pub fn reply_from_search(outcome: Result<SearchPayload, ChatError>) -> String {
    match outcome {
        Ok(payload) => {
            if let Some(answer) = payload.direct_answer() {
                answer
            } else if let Some(first) = payload.organic_results.first() {
                first
                    .snippet_text()
                    .unwrap_or_else(|| NO_SNIPPET_REPLY.to_string())
            } else {
                NO_RESULTS_REPLY.to_string()
            }
        }
        Err(e) => {
            tracing::error!(stage = "search", error = %e, "Error during online search");
            SEARCH_ERROR_REPLY.to_string()
        }
    }
}

// =============================================================================
// ResponseSource
// =============================================================================

/// Produces replies from the canned table or from web search.
pub struct ResponseSource {
    table: ResponseTable,
    rng: Mutex<StdRng>,
    search: Arc<dyn SearchProvider>,
    search_timeout: Duration,
}

impl ResponseSource {
    /// Create a source with an OS-seeded random generator.
    pub fn new(
        table: ResponseTable,
        search: Arc<dyn SearchProvider>,
        search_timeout: Duration,
    ) -> Self {
        Self::with_rng(table, search, search_timeout, StdRng::from_os_rng())
    }

    /// Create a source whose canned selection is reproducible for `seed`.
    pub fn with_seed(
        table: ResponseTable,
        search: Arc<dyn SearchProvider>,
        search_timeout: Duration,
        seed: u64,
    ) -> Self {
        Self::with_rng(table, search, search_timeout, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        table: ResponseTable,
        search: Arc<dyn SearchProvider>,
        search_timeout: Duration,
        rng: StdRng,
    ) -> Self {
        Self {
            table,
            rng: Mutex::new(rng),
            search,
            search_timeout,
        }
    }

    pub fn table(&self) -> &ResponseTable {
        &self.table
    }

    /// Pick one reply for `emotion`, uniformly at random. Never fails.
    pub fn canned(&self, emotion: &str) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let picked = match self.table.get(emotion) {
            Some(candidates) => candidates.choose(&mut *rng).cloned(),
            None => DEFAULT_RESPONSES.choose(&mut *rng).map(|s| s.to_string()),
        };
        picked.unwrap_or_else(|| DEFAULT_RESPONSES[0].to_string())
    }

    /// Answer `query` from web search. Never fails; errors become a fixed reply.
    pub async fn searched(&self, query: &str) -> String {
        let outcome = match tokio::time::timeout(self.search_timeout, self.search.search(query)).await
        {
            Ok(result) => result,
            Err(_) => Err(ChatError::SearchTimeout(self.search_timeout.as_secs())),
        };
        reply_from_search(outcome)
    }
}

// =============================================================================
// Tests
// =============================================================================
