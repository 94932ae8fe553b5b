//! Engine-owned persistence seams.
//!
//! The engine writes only to its own entities: policies and their stats,
//! occurrence trackers, execution records, exceptions, simulation runs,
//! retro applications, and adjustment records. Each seam is an async
//! trait so production wiring can back it with the platform's database
//! while tests use the in-memory implementations.

pub mod fixtures;
pub mod memory;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::EngineResult;
use crate::models::{
    AdjustmentRecord, ExceptionTarget, ExecutionRecord, OccurrenceTracker, Period, Policy,
    PolicyException, PolicyStats, RetroApplication, SimulationRun,
};

pub use memory::{
    MemoryAdjustmentStore, MemoryExceptionStore, MemoryExecutionStore, MemoryPolicyStore,
    MemoryRetroStore, MemorySimulationStore, MemoryTrackerStore,
};

/// Policy definitions and their running statistics.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// One policy by id.
    async fn policy(&self, policy_id: &str) -> EngineResult<Option<Policy>>;

    /// All active policies of a company.
    async fn active_policies(&self, company_id: &str) -> EngineResult<Vec<Policy>>;

    /// Inserts or replaces a policy definition.
    async fn upsert(&self, policy: Policy) -> EngineResult<()>;

    /// Folds one execution into the policy's running statistics.
    async fn fold_stats(
        &self,
        policy_id: &str,
        paid: Decimal,
        deducted: Decimal,
    ) -> EngineResult<()>;

    /// The policy's running statistics, when any executions happened.
    async fn stats(&self, policy_id: &str) -> EngineResult<Option<PolicyStats>>;
}

/// Occurrence counters.
#[async_trait]
pub trait TrackerStore: Send + Sync {
    /// One tracker by its (policy, employee, type) key.
    async fn find(
        &self,
        policy_id: &str,
        employee_id: &str,
        occurrence_type: &str,
    ) -> EngineResult<Option<OccurrenceTracker>>;

    /// Inserts or replaces a tracker.
    async fn save(&self, tracker: OccurrenceTracker) -> EngineResult<()>;

    /// All trackers with a non-zero count, for the auto-reset sweep.
    async fn with_positive_count(&self) -> EngineResult<Vec<OccurrenceTracker>>;

    /// All trackers of one employee under one policy.
    async fn for_employee(
        &self,
        policy_id: &str,
        employee_id: &str,
    ) -> EngineResult<Vec<OccurrenceTracker>>;
}

/// Immutable execution audit records.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Appends a record.
    async fn insert(&self, record: ExecutionRecord) -> EngineResult<()>;

    /// Records for an employee not yet stamped with a payroll period.
    async fn pending_for(&self, employee_id: &str) -> EngineResult<Vec<ExecutionRecord>>;

    /// Stamps a record with its consuming payroll period. Returns false
    /// when the record was already stamped, leaving it untouched.
    async fn stamp(&self, record_id: &str, period: Period) -> EngineResult<bool>;

    /// All records for an employee, newest first.
    async fn for_employee(&self, employee_id: &str) -> EngineResult<Vec<ExecutionRecord>>;
}

/// Policy exceptions.
#[async_trait]
pub trait ExceptionStore: Send + Sync {
    /// Appends an exception.
    async fn insert(&self, exception: PolicyException) -> EngineResult<()>;

    /// The exception for an exact (policy, target type, target) key.
    async fn find(
        &self,
        policy_id: &str,
        target_type: ExceptionTarget,
        target_id: &str,
    ) -> EngineResult<Option<PolicyException>>;

    /// All exceptions of a policy.
    async fn for_policy(&self, policy_id: &str) -> EngineResult<Vec<PolicyException>>;

    /// Deactivates an exception. Returns false when the id is unknown.
    async fn deactivate(&self, exception_id: &str) -> EngineResult<bool>;
}

/// Simulation run snapshots.
#[async_trait]
pub trait SimulationStore: Send + Sync {
    /// Appends a run snapshot.
    async fn insert(&self, run: SimulationRun) -> EngineResult<()>;

    /// One run by id.
    async fn get(&self, run_id: &str) -> EngineResult<Option<SimulationRun>>;

    /// All runs of a policy, newest first.
    async fn for_policy(&self, policy_id: &str) -> EngineResult<Vec<SimulationRun>>;
}

/// Retroactive applications.
#[async_trait]
pub trait RetroStore: Send + Sync {
    /// Inserts or replaces an application.
    async fn save(&self, application: RetroApplication) -> EngineResult<()>;

    /// One application by id.
    async fn get(&self, application_id: &str) -> EngineResult<Option<RetroApplication>>;

    /// All applications of a company, newest first.
    async fn for_company(&self, company_id: &str) -> EngineResult<Vec<RetroApplication>>;
}

/// Adjustment records produced by retro application.
#[async_trait]
pub trait AdjustmentStore: Send + Sync {
    /// Appends an adjustment.
    async fn insert(&self, adjustment: AdjustmentRecord) -> EngineResult<()>;

    /// All adjustments produced by one retro application.
    async fn for_application(&self, application_id: &str) -> EngineResult<Vec<AdjustmentRecord>>;
}
