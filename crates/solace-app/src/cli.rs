//! CLI argument definitions for the Solace binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use solace_chat::session::MAX_SESSION_ID_LEN;
use solace_core::config::SolaceConfig;

/// Environment variable naming the configuration file.
pub const ENV_CONFIG: &str = "SOLACE_CONFIG";

/// Config file used when neither `--config` nor `SOLACE_CONFIG` is set.
pub const DEFAULT_CONFIG_FILE: &str = "solace.toml";

/// Message sent by `probe` when none is given.
pub const DEFAULT_PROBE_MESSAGE: &str = "I feel sad today";

/// Session name used by `chat` when the user gives none.
pub const GUEST_NAME: &str = "Guest";

/// Solace: an emotion-aware support chatbot.
#[derive(Parser, Debug)]
#[command(name = "solace", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port", global = true)]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Chat in the terminal.
    Chat {
        /// Your name; also names the session and its journal file.
        #[arg(short = 'n', long = "name")]
        name: Option<String>,
    },
    /// Send one message to a running server and print the reply.
    Probe {
        #[arg(default_value = DEFAULT_PROBE_MESSAGE)]
        message: String,
    },
}

impl CliArgs {
    /// The subcommand to run, `serve` when omitted.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > SOLACE_CONFIG env var > ./solace.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        self.resolve_config_path_from(|key| std::env::var(key).ok())
    }

    fn resolve_config_path_from<F>(&self, lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Some(p) = lookup(ENV_CONFIG).filter(|p| !p.trim().is_empty()) {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Apply CLI overrides on top of an already env-overridden config.
    pub fn apply_overrides(&self, config: &mut SolaceConfig) {
        if let Some(port) = self.port {
            config.general.port = port;
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
    }
}

/// Session id for a chat user: blank names become `Guest`, characters
/// outside `[A-Za-z0-9_-]` become `_`, and the result is truncated.
pub fn session_for_name(name: &str) -> String {
    let name = name.trim();
    let name = if name.is_empty() { GUEST_NAME } else { name };
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_SESSION_ID_LEN)
        .collect()
}
