//! HTTP API module for the policy engine.
//!
//! This module provides the REST endpoints for policy evaluation,
//! simulation, retroactive application, and exception management.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{EvaluateRequest, ExceptionCreateRequest, RetroCreateRequest, SimulationRequest};
pub use response::ApiError;
pub use state::AppState;
