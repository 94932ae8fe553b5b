//! Application state for the policy engine API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::engine::{ExceptionResolver, PolicyExecutor, RetroactiveApplier, SimulationEngine};

/// Shared application state.
///
/// Bundles the engine services every handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    executor: Arc<PolicyExecutor>,
    simulations: Arc<SimulationEngine>,
    retro: Arc<RetroactiveApplier>,
    exceptions: Arc<ExceptionResolver>,
}

impl AppState {
    /// Creates the application state from its services.
    pub fn new(
        executor: Arc<PolicyExecutor>,
        simulations: Arc<SimulationEngine>,
        retro: Arc<RetroactiveApplier>,
        exceptions: Arc<ExceptionResolver>,
    ) -> Self {
        Self {
            executor,
            simulations,
            retro,
            exceptions,
        }
    }

    /// The policy executor.
    pub fn executor(&self) -> &PolicyExecutor {
        &self.executor
    }

    /// The simulation engine.
    pub fn simulations(&self) -> &SimulationEngine {
        &self.simulations
    }

    /// The retroactive applier.
    pub fn retro(&self) -> &RetroactiveApplier {
        &self.retro
    }

    /// The exception resolver.
    pub fn exceptions(&self) -> &ExceptionResolver {
        &self.exceptions
    }
}
