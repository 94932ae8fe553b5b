//! Occurrence counting and tiered penalty calculation.
//!
//! Counters are keyed by (policy, employee, occurrence type) and reset
//! when the current date crosses their reset-period boundary. Increments
//! for the same key are serialized through a per-key lock so concurrent
//! events cannot lose updates.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::EngineResult;
use crate::eval::{FieldValue, expression};
use crate::models::{
    OccurrenceTracker, PenaltyTier, ResetPeriod, TierAction, TierActionType, tracker_key,
};
use crate::store::TrackerStore;

/// The outcome of a tiered penalty calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct PenaltyOutcome {
    /// The matched tier number, when any tier matched.
    pub tier: Option<u32>,
    /// The occurrence count the calculation used.
    pub occurrence_count: u32,
    /// The matched tier's action, when any tier matched.
    pub action: Option<TierAction>,
    /// The computed amount magnitude.
    pub amount: f64,
    /// Explanation for audit and payslips.
    pub explanation: String,
}

impl PenaltyOutcome {
    fn no_tier(count: u32) -> Self {
        Self {
            tier: None,
            occurrence_count: count,
            action: None,
            amount: 0.0,
            explanation: format!("no tier matches {} occurrence(s)", count),
        }
    }
}

/// Aggregate occurrence figures for one policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccurrenceStats {
    /// Distinct employees with at least one recorded occurrence.
    pub tracked_employees: usize,
    /// Sum of all counter values under the policy.
    pub total_occurrences: u64,
    /// The highest single counter value under the policy.
    pub highest_count: u32,
}

/// Maintains occurrence counters and computes tiered penalties.
pub struct OccurrenceLedger {
    store: Arc<dyn TrackerStore>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl OccurrenceLedger {
    /// Creates a ledger over the given tracker store.
    pub fn new(store: Arc<dyn TrackerStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Records one occurrence, applying a pending reset first, and
    /// returns the new count. Concurrent calls for the same key are
    /// serialized.
    pub async fn record_occurrence(
        &self,
        policy_id: &str,
        employee_id: &str,
        occurrence_type: &str,
        reset_period: ResetPeriod,
        event_data: serde_json::Value,
    ) -> EngineResult<u32> {
        let key = tracker_key(policy_id, employee_id, occurrence_type);
        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        let now = Utc::now();
        let mut tracker = match self
            .store
            .find(policy_id, employee_id, occurrence_type)
            .await?
        {
            Some(tracker) => tracker,
            None => OccurrenceTracker::new(policy_id, employee_id, occurrence_type, reset_period),
        };

        if tracker.should_reset(now) {
            debug!(key = %key, old_count = tracker.count, "resetting tracker at period boundary");
            tracker.count = 0;
            tracker.last_reset_at = now;
        }
        tracker.count += 1;
        tracker.last_occurred_at = Some(now);
        tracker.last_event_data = event_data;
        let count = tracker.count;
        self.store.save(tracker).await?;
        Ok(count)
    }

    /// The current count, applying and persisting a pending reset.
    pub async fn occurrence_count(
        &self,
        policy_id: &str,
        employee_id: &str,
        occurrence_type: &str,
    ) -> EngineResult<u32> {
        match self
            .store
            .find(policy_id, employee_id, occurrence_type)
            .await?
        {
            Some(mut tracker) => {
                if tracker.should_reset(Utc::now()) {
                    tracker.count = 0;
                    tracker.last_reset_at = Utc::now();
                    self.store.save(tracker).await?;
                    Ok(0)
                } else {
                    Ok(tracker.count)
                }
            }
            None => Ok(0),
        }
    }

    /// The current count without persisting anything, honoring a pending
    /// reset. Used by simulation, which must stay read-only.
    pub async fn peek_count(
        &self,
        policy_id: &str,
        employee_id: &str,
        occurrence_type: &str,
    ) -> EngineResult<u32> {
        Ok(self
            .store
            .find(policy_id, employee_id, occurrence_type)
            .await?
            .map(|tracker| {
                if tracker.should_reset(Utc::now()) {
                    0
                } else {
                    tracker.count
                }
            })
            .unwrap_or(0))
    }

    /// Computes the tiered penalty for the current occurrence count.
    pub async fn calculate_penalty(
        &self,
        policy_id: &str,
        employee_id: &str,
        occurrence_type: &str,
        tiers: &[PenaltyTier],
        base_salary: f64,
    ) -> EngineResult<PenaltyOutcome> {
        let count = self
            .occurrence_count(policy_id, employee_id, occurrence_type)
            .await?;
        compute_penalty(tiers, count, base_salary)
    }

    /// Resets every tracker whose boundary has passed. Idempotent; safe
    /// to run concurrently with per-event increments.
    pub async fn process_auto_resets(&self) -> EngineResult<u32> {
        let now = Utc::now();
        let mut reset_count = 0;
        for mut tracker in self.store.with_positive_count().await? {
            if tracker.should_reset(now) {
                let lock = self.key_lock(&tracker.key()).await;
                let _guard = lock.lock().await;
                tracker.count = 0;
                tracker.last_reset_at = now;
                self.store.save(tracker).await?;
                reset_count += 1;
            }
        }
        if reset_count > 0 {
            info!(reset_count, "auto-reset swept occurrence trackers");
        }
        Ok(reset_count)
    }

    /// Aggregates counter figures across one policy's trackers.
    pub async fn occurrence_stats(&self, policy_id: &str) -> EngineResult<OccurrenceStats> {
        let mut employees = std::collections::HashSet::new();
        let mut stats = OccurrenceStats::default();
        for tracker in self.store.with_positive_count().await? {
            if tracker.policy_id != policy_id {
                continue;
            }
            employees.insert(tracker.employee_id);
            stats.total_occurrences += u64::from(tracker.count);
            stats.highest_count = stats.highest_count.max(tracker.count);
        }
        stats.tracked_employees = employees.len();
        Ok(stats)
    }

    /// All of an employee's trackers under one policy, for history views.
    pub async fn history(
        &self,
        policy_id: &str,
        employee_id: &str,
    ) -> EngineResult<Vec<OccurrenceTracker>> {
        self.store.for_employee(policy_id, employee_id).await
    }
}

/// Selects the applicable tier and computes the penalty amount.
///
/// The matching tier is the one with the highest `min_occurrences` that
/// is at most the count, honoring `max_occurrences` upper bounds. FIXED
/// values with `per_occurrence` multiply by `count - min + 1`; PERCENTAGE
/// takes a share of the base salary; FORMULA evaluates with `count`,
/// `baseSalary`, `value`, and `extra` bound.
pub fn compute_penalty(
    tiers: &[PenaltyTier],
    count: u32,
    base_salary: f64,
) -> EngineResult<PenaltyOutcome> {
    let matched = tiers
        .iter()
        .filter(|tier| {
            tier.min_occurrences <= count
                && tier.max_occurrences.is_none_or(|max| count <= max)
        })
        .max_by_key(|tier| tier.min_occurrences);

    let Some(tier) = matched else {
        return Ok(PenaltyOutcome::no_tier(count));
    };

    let action = &tier.action;
    let amount = match action.action_type {
        TierActionType::None | TierActionType::Notify => 0.0,
        TierActionType::Deduct | TierActionType::Add => {
            tier_amount(tier, count, base_salary)?
        }
    };

    let explanation = match action.action_type {
        TierActionType::None => format!(
            "tier {} matched at {} occurrence(s): no penalty",
            tier.tier, count
        ),
        TierActionType::Notify => format!(
            "tier {} matched at {} occurrence(s): notification only",
            tier.tier, count
        ),
        TierActionType::Deduct => format!(
            "tier {} matched at {} occurrence(s): deduct {:.2}",
            tier.tier, count, amount
        ),
        TierActionType::Add => format!(
            "tier {} matched at {} occurrence(s): add {:.2}",
            tier.tier, count, amount
        ),
    };

    Ok(PenaltyOutcome {
        tier: Some(tier.tier),
        occurrence_count: count,
        action: Some(action.clone()),
        amount,
        explanation,
    })
}

fn tier_amount(tier: &PenaltyTier, count: u32, base_salary: f64) -> EngineResult<f64> {
    use crate::models::ValueType;

    let action = &tier.action;
    match action.value_type.unwrap_or(ValueType::Fixed) {
        ValueType::Fixed => {
            let value = action.value.unwrap_or(0.0);
            if action.per_occurrence {
                let multiplier = (count - tier.min_occurrences + 1) as f64;
                Ok(value * multiplier)
            } else {
                Ok(value)
            }
        }
        ValueType::Percentage => Ok(base_salary * action.value.unwrap_or(0.0) / 100.0),
        ValueType::Formula => {
            let formula = action.formula.as_deref().unwrap_or("0");
            let mut variables: HashMap<String, FieldValue> = HashMap::new();
            variables.insert("count".to_string(), FieldValue::Number(count as f64));
            variables.insert("baseSalary".to_string(), FieldValue::Number(base_salary));
            variables.insert(
                "value".to_string(),
                FieldValue::Number(action.value.unwrap_or(0.0)),
            );
            variables.insert(
                "extra".to_string(),
                FieldValue::Number(count.saturating_sub(tier.min_occurrences) as f64),
            );
            expression::evaluate_math(formula, &variables)
        }
    }
}
