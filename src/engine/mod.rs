//! Engine services: execution, occurrence tracking, exceptions,
//! simulation, and retroactive application.

pub mod cache;
pub mod exceptions;
pub mod executor;
pub mod occurrence;
pub mod retroactive;
pub mod simulation;

pub use cache::PolicyCache;
pub use exceptions::{ExceptionResolver, ExceptionStats};
pub use executor::{PolicyExecutor, PolicyProjection, TRIGGER_EVENT, TRIGGER_PAYROLL_RUN};
pub use occurrence::{OccurrenceLedger, OccurrenceStats, PenaltyOutcome, compute_penalty};
pub use retroactive::{DEFAULT_MAX_PERIODS, RetroactiveApplier};
pub use simulation::{DEFAULT_BATCH_SIZE, DEFAULT_BUDGET_MS, SimulationEngine};
