//! Solace HTTP API: axum server and route handlers.
//!
//! `GET /` liveness, `POST /chat` dialogue turns, `GET /sessions/{id}`
//! memory inspection, and `POST /emotions` batch classification.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
