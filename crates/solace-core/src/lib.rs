//! Shared types, configuration, and errors for the Solace chat service.

pub mod config;
pub mod error;
pub mod types;

pub use config::SolaceConfig;
pub use error::{Result, SolaceError};
pub use types::*;
