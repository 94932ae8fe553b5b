//! Request types for the policy engine API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ExceptionTarget, Period, PolicyException};

/// Request body for the `/evaluate` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    /// The employee to run policies for.
    pub employee_id: String,
    /// The payroll period, as `YYYY-MM`.
    pub period: Period,
}

/// Request body for the `/simulations` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest {
    /// The policy to simulate.
    pub policy_id: String,
    /// The hypothetical payroll period.
    pub period: Period,
    /// Who requested the simulation.
    pub actor_id: String,
}

/// Request body for creating a retroactive application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetroCreateRequest {
    /// The policy to re-apply.
    pub policy_id: String,
    /// The owning company.
    pub company_id: String,
    /// First historical period (inclusive).
    pub from_period: Period,
    /// Last historical period (inclusive).
    pub to_period: Period,
    /// The payroll period adjustments land in.
    pub target_period: Period,
    /// Who requested the application.
    pub requested_by: String,
}

/// Request body for creating a policy exception.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionCreateRequest {
    /// The owning company.
    pub company_id: String,
    /// The policy the exception belongs to.
    pub policy_id: String,
    /// What kind of entity is excluded.
    pub target_type: ExceptionTarget,
    /// The excluded entity's identifier.
    pub target_id: String,
    /// Optional exclusion window start.
    #[serde(default)]
    pub effective_from: Option<DateTime<Utc>>,
    /// Optional exclusion window end.
    #[serde(default)]
    pub effective_to: Option<DateTime<Utc>>,
    /// Free-form justification.
    #[serde(default)]
    pub reason: Option<String>,
}

impl From<ExceptionCreateRequest> for PolicyException {
    fn from(req: ExceptionCreateRequest) -> Self {
        let mut exception = PolicyException::new(&req.policy_id, req.target_type, &req.target_id);
        exception.effective_from = req.effective_from;
        exception.effective_to = req.effective_to;
        exception.reason = req.reason;
        exception
    }
}
