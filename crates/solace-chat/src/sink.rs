//! Durable turn log ("journal").
//!
//! Turn memory is independent of where turns are persisted; a `TurnSink`
//! receives every completed turn. Sinks are created per session by a
//! `SinkFactory`.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use solace_core::types::Turn;

use crate::error::ChatError;

/// Header row written when a CSV journal is initialized.
pub const JOURNAL_HEADER: [&str; 4] = ["timestamp", "user_message", "emotion", "chatbot_response"];

/// Append-only destination for completed turns.
pub trait TurnSink: Send + Sync {
    /// Prepare the sink for a new session, discarding prior content.
    fn initialize(&self) -> Result<(), ChatError>;
    /// Persist one turn.
    fn append(&self, turn: &Turn) -> Result<(), ChatError>;
}

/// Creates the sink for a session.
pub trait SinkFactory: Send + Sync {
    fn create(&self, session: &str) -> Arc<dyn TurnSink>;
}

// =============================================================================
// CsvTurnSink
// =============================================================================

/// One CSV file per session: `timestamp,user_message,emotion,chatbot_response`.
pub struct CsvTurnSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvTurnSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, ChatError> {
        self.write_lock
            .lock()
            .map_err(|e| ChatError::Journal(format!("journal lock poisoned: {}", e)))
    }
}

impl TurnSink for CsvTurnSink {
    fn initialize(&self) -> Result<(), ChatError> {
        let _guard = self.lock()?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ChatError::Journal(e.to_string()))?;
            }
        }
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(JOURNAL_HEADER)?;
        writer.flush().map_err(|e| ChatError::Journal(e.to_string()))?;
        Ok(())
    }

    fn append(&self, turn: &Turn) -> Result<(), ChatError> {
        let _guard = self.lock()?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ChatError::Journal(format!("{}: {}", self.path.display(), e)))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record([
            turn.timestamp.to_rfc3339().as_str(),
            turn.user_message.as_str(),
            turn.emotion.label.as_str(),
            turn.response.as_str(),
        ])?;
        writer.flush().map_err(|e| ChatError::Journal(e.to_string()))?;
        Ok(())
    }
}

/// Creates `{dir}/{session}_memory.csv` journals.
#[derive(Debug, Clone)]
pub struct CsvSinkFactory {
    dir: PathBuf,
}

impl CsvSinkFactory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Journal path for `session`.
    pub fn path_for(&self, session: &str) -> PathBuf {
        self.dir.join(format!("{}_memory.csv", session))
    }
}

impl SinkFactory for CsvSinkFactory {
    fn create(&self, session: &str) -> Arc<dyn TurnSink> {
        Arc::new(CsvTurnSink::new(self.path_for(session)))
    }
}

// =============================================================================
// InMemoryTurnSink
// =============================================================================

/// Sink that keeps turns in memory. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTurnSink {
    turns: Arc<Mutex<Vec<Turn>>>,
    initializations: Arc<AtomicUsize>,
}

impl InMemoryTurnSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored turns.
    pub fn turns(&self) -> Vec<Turn> {
        self.turns
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default()
    }

    /// How many times `initialize` ran.
    pub fn initializations(&self) -> usize {
        self.initializations.load(Ordering::Relaxed)
    }
}

impl TurnSink for InMemoryTurnSink {
    fn initialize(&self) -> Result<(), ChatError> {
        let mut turns = self
            .turns
            .lock()
            .map_err(|e| ChatError::Journal(format!("journal lock poisoned: {}", e)))?;
        turns.clear();
        self.initializations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn append(&self, turn: &Turn) -> Result<(), ChatError> {
        self.turns
            .lock()
            .map_err(|e| ChatError::Journal(format!("journal lock poisoned: {}", e)))?
            .push(turn.clone());
        Ok(())
    }
}

/// Hands out one `InMemoryTurnSink` per session and keeps them for inspection.
#[derive(Debug, Clone, Default)]
pub struct InMemorySinkFactory {
    sinks: Arc<Mutex<HashMap<String, InMemoryTurnSink>>>,
}

impl InMemorySinkFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sink created for `session`, if any.
    pub fn sink(&self, session: &str) -> Option<InMemoryTurnSink> {
        self.sinks.lock().ok().and_then(|s| s.get(session).cloned())
    }
}

impl SinkFactory for InMemorySinkFactory {
    fn create(&self, session: &str) -> Arc<dyn TurnSink> {
        let sink = InMemoryTurnSink::new();
        if let Ok(mut sinks) = self.sinks.lock() {
            sinks.insert(session.to_string(), sink.clone());
        }
        Arc::new(sink)
    }
}
