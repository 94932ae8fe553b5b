//! In-memory store implementations.
//!
//! Used by tests and the demo API wiring. Each store is a tokio
//! `RwLock` over a map, safe to share across tasks via `Arc`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::error::EngineResult;
use crate::models::{
    AdjustmentRecord, ExceptionTarget, ExecutionRecord, OccurrenceTracker, Period, Policy,
    PolicyException, PolicyStats, RetroApplication, SimulationRun, tracker_key,
};
use crate::store::{
    AdjustmentStore, ExceptionStore, ExecutionStore, PolicyStore, RetroStore, SimulationStore,
    TrackerStore,
};

/// In-memory [`PolicyStore`].
#[derive(Default)]
pub struct MemoryPolicyStore {
    policies: RwLock<HashMap<String, Policy>>,
    stats: RwLock<HashMap<String, PolicyStats>>,
}

impl MemoryPolicyStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn policy(&self, policy_id: &str) -> EngineResult<Option<Policy>> {
        Ok(self.policies.read().await.get(policy_id).cloned())
    }

    async fn active_policies(&self, company_id: &str) -> EngineResult<Vec<Policy>> {
        let mut policies: Vec<Policy> = self
            .policies
            .read()
            .await
            .values()
            .filter(|p| p.company_id == company_id && p.is_active)
            .cloned()
            .collect();
        policies.sort_by(|a, b| {
            a.execution_order
                .cmp(&b.execution_order)
                .then(b.priority.cmp(&a.priority))
                .then(a.id.cmp(&b.id))
        });
        Ok(policies)
    }

    async fn upsert(&self, policy: Policy) -> EngineResult<()> {
        self.policies.write().await.insert(policy.id.clone(), policy);
        Ok(())
    }

    async fn fold_stats(
        &self,
        policy_id: &str,
        paid: Decimal,
        deducted: Decimal,
    ) -> EngineResult<()> {
        let mut stats = self.stats.write().await;
        let entry = stats.entry(policy_id.to_string()).or_default();
        entry.execution_count += 1;
        entry.last_executed_at = Some(Utc::now());
        entry.total_paid += paid;
        entry.total_deducted += deducted;
        Ok(())
    }

    async fn stats(&self, policy_id: &str) -> EngineResult<Option<PolicyStats>> {
        Ok(self.stats.read().await.get(policy_id).cloned())
    }
}

/// In-memory [`TrackerStore`].
#[derive(Default)]
pub struct MemoryTrackerStore {
    trackers: RwLock<HashMap<String, OccurrenceTracker>>,
}

impl MemoryTrackerStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrackerStore for MemoryTrackerStore {
    async fn find(
        &self,
        policy_id: &str,
        employee_id: &str,
        occurrence_type: &str,
    ) -> EngineResult<Option<OccurrenceTracker>> {
        let key = tracker_key(policy_id, employee_id, occurrence_type);
        Ok(self.trackers.read().await.get(&key).cloned())
    }

    async fn save(&self, tracker: OccurrenceTracker) -> EngineResult<()> {
        self.trackers.write().await.insert(tracker.key(), tracker);
        Ok(())
    }

    async fn with_positive_count(&self) -> EngineResult<Vec<OccurrenceTracker>> {
        Ok(self
            .trackers
            .read()
            .await
            .values()
            .filter(|t| t.count > 0)
            .cloned()
            .collect())
    }

    async fn for_employee(
        &self,
        policy_id: &str,
        employee_id: &str,
    ) -> EngineResult<Vec<OccurrenceTracker>> {
        Ok(self
            .trackers
            .read()
            .await
            .values()
            .filter(|t| t.policy_id == policy_id && t.employee_id == employee_id)
            .cloned()
            .collect())
    }
}

/// In-memory [`ExecutionStore`].
#[derive(Default)]
pub struct MemoryExecutionStore {
    records: RwLock<Vec<ExecutionRecord>>,
}

impl MemoryExecutionStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionStore for MemoryExecutionStore {
    async fn insert(&self, record: ExecutionRecord) -> EngineResult<()> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn pending_for(&self, employee_id: &str) -> EngineResult<Vec<ExecutionRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.employee_id == employee_id && r.payroll_period.is_none() && r.success)
            .cloned()
            .collect())
    }

    async fn stamp(&self, record_id: &str, period: Period) -> EngineResult<bool> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == record_id) {
            Some(record) if record.payroll_period.is_none() => {
                record.payroll_period = Some(period);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn for_employee(&self, employee_id: &str) -> EngineResult<Vec<ExecutionRecord>> {
        let mut records: Vec<ExecutionRecord> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.employee_id == employee_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.executed_at.cmp(&a.executed_at));
        Ok(records)
    }
}

/// In-memory [`ExceptionStore`].
#[derive(Default)]
pub struct MemoryExceptionStore {
    exceptions: RwLock<Vec<PolicyException>>,
}

impl MemoryExceptionStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExceptionStore for MemoryExceptionStore {
    async fn insert(&self, exception: PolicyException) -> EngineResult<()> {
        self.exceptions.write().await.push(exception);
        Ok(())
    }

    async fn find(
        &self,
        policy_id: &str,
        target_type: ExceptionTarget,
        target_id: &str,
    ) -> EngineResult<Option<PolicyException>> {
        Ok(self
            .exceptions
            .read()
            .await
            .iter()
            .find(|e| {
                e.policy_id == policy_id
                    && e.target_type == target_type
                    && e.target_id == target_id
            })
            .cloned())
    }

    async fn for_policy(&self, policy_id: &str) -> EngineResult<Vec<PolicyException>> {
        Ok(self
            .exceptions
            .read()
            .await
            .iter()
            .filter(|e| e.policy_id == policy_id)
            .cloned()
            .collect())
    }

    async fn deactivate(&self, exception_id: &str) -> EngineResult<bool> {
        let mut exceptions = self.exceptions.write().await;
        match exceptions.iter_mut().find(|e| e.id == exception_id) {
            Some(exception) => {
                exception.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// In-memory [`SimulationStore`].
#[derive(Default)]
pub struct MemorySimulationStore {
    runs: RwLock<Vec<SimulationRun>>,
}

impl MemorySimulationStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SimulationStore for MemorySimulationStore {
    async fn insert(&self, run: SimulationRun) -> EngineResult<()> {
        self.runs.write().await.push(run);
        Ok(())
    }

    async fn get(&self, run_id: &str) -> EngineResult<Option<SimulationRun>> {
        Ok(self
            .runs
            .read()
            .await
            .iter()
            .find(|r| r.id == run_id)
            .cloned())
    }

    async fn for_policy(&self, policy_id: &str) -> EngineResult<Vec<SimulationRun>> {
        let mut runs: Vec<SimulationRun> = self
            .runs
            .read()
            .await
            .iter()
            .filter(|r| r.policy_id == policy_id)
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(runs)
    }
}

/// In-memory [`RetroStore`].
#[derive(Default)]
pub struct MemoryRetroStore {
    applications: RwLock<HashMap<String, RetroApplication>>,
}

impl MemoryRetroStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RetroStore for MemoryRetroStore {
    async fn save(&self, application: RetroApplication) -> EngineResult<()> {
        self.applications
            .write()
            .await
            .insert(application.id.clone(), application);
        Ok(())
    }

    async fn get(&self, application_id: &str) -> EngineResult<Option<RetroApplication>> {
        Ok(self.applications.read().await.get(application_id).cloned())
    }

    async fn for_company(&self, company_id: &str) -> EngineResult<Vec<RetroApplication>> {
        let mut applications: Vec<RetroApplication> = self
            .applications
            .read()
            .await
            .values()
            .filter(|a| a.company_id == company_id)
            .cloned()
            .collect();
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(applications)
    }
}

/// In-memory [`AdjustmentStore`].
#[derive(Default)]
pub struct MemoryAdjustmentStore {
    adjustments: RwLock<Vec<AdjustmentRecord>>,
}

impl MemoryAdjustmentStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdjustmentStore for MemoryAdjustmentStore {
    async fn insert(&self, adjustment: AdjustmentRecord) -> EngineResult<()> {
        self.adjustments.write().await.push(adjustment);
        Ok(())
    }

    async fn for_application(&self, application_id: &str) -> EngineResult<Vec<AdjustmentRecord>> {
        Ok(self
            .adjustments
            .read()
            .await
            .iter()
            .filter(|a| a.retro_application_id == application_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_active_policies_ordered_by_execution_order_then_priority() {
        let store = MemoryPolicyStore::new();
        for (id, order, priority) in [("a", 2, 0), ("b", 1, 5), ("c", 1, 10)] {
            store
                .upsert(Policy {
                    id: id.to_string(),
                    company_id: "co".to_string(),
                    name: id.to_string(),
                    conditions: vec![],
                    condition_logic: Default::default(),
                    actions: vec![],
                    tiered_config: None,
                    execution_order: order,
                    priority,
                    is_active: true,
                })
                .await
                .unwrap();
        }
        let ordered = store.active_policies("co").await.unwrap();
        let ids: Vec<&str> = ordered.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_stamp_is_one_shot() {
        let store = MemoryExecutionStore::new();
        let mut record = ExecutionRecord::new("p", "e", "PAYROLL_RUN");
        record.success = true;
        let id = record.id.clone();
        store.insert(record).await.unwrap();

        let period = Period::new(2025, 1).unwrap();
        assert!(store.stamp(&id, period).await.unwrap());
        assert!(!store.stamp(&id, period).await.unwrap());
        assert!(store.pending_for("e").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pending_excludes_failed_records() {
        let store = MemoryExecutionStore::new();
        let failed = ExecutionRecord::new("p", "e", "EVENT");
        store.insert(failed).await.unwrap();
        assert!(store.pending_for("e").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tracker_round_trip() {
        let store = MemoryTrackerStore::new();
        let mut tracker =
            OccurrenceTracker::new("p", "e", "LATE", crate::models::ResetPeriod::Monthly);
        tracker.count = 2;
        store.save(tracker.clone()).await.unwrap();
        let loaded = store.find("p", "e", "LATE").await.unwrap().unwrap();
        assert_eq!(loaded.count, 2);
        assert_eq!(store.with_positive_count().await.unwrap().len(), 1);
    }
}
