//! Data model for the policy engine.
//!
//! Everything the engine persists or evaluates against lives here: policy
//! definitions, the per-employee evaluation context, occurrence trackers,
//! exceptions, audit records, simulation snapshots, and retro applications.

pub mod context;
pub mod exception;
pub mod execution;
pub mod period;
pub mod policy;
pub mod retro;
pub mod simulation;
pub mod tracker;

pub use context::{
    AdvanceContext, AttendanceContext, AttendancePatterns, AttendanceWindow, ContractContext,
    CustodyContext, DisciplinaryContext, EmployeeContext, EnrichedContext, LeaveContext,
    OrgUnitContext, PeriodContext, Tenure,
};
pub use exception::{ExceptionTarget, ExclusionCheck, PolicyException};
pub use execution::{
    AdjustmentRecord, ExecutionRecord, LineSign, LineSource, PayrollLine, to_money,
};
pub use period::Period;
pub use policy::{
    Action, ActionType, ComparisonOp, Condition, ConditionLogic, PenaltyTier, Policy, PolicyStats,
    SalaryBase, TierAction, TierActionType, TieredConfig, ValueType,
};
pub use retro::{EmployeeRetroResult, RetroApplication, RetroPeriodLine, RetroStatus};
pub use simulation::{EmployeeProjection, SimulationRun, SimulationSummary};
pub use tracker::{OccurrenceTracker, ResetPeriod, tracker_key};
