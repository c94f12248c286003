//! Mutable state of a single crew run.
//!
//! A fresh `RunState` is created by every `Crew::execute()` call, so runs
//! never observe each other's statuses or outputs. Each task record sits
//! behind its own lock; the scheduler and the workers only ever hold one
//! record lock at a time.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::Duration;
use uuid::Uuid;

use super::delegation::DelegationDecision;
use crate::tasks::task_output::TaskOutput;
use crate::tasks::task_status::TaskStatus;
use crate::utilities::errors::TaskError;

/// Run-time record of one task.
#[derive(Debug, Clone, Default)]
pub struct TaskRecord {
    pub status: TaskStatus,
    /// Set once when the scheduler hands the task to a worker.
    pub dispatched: bool,
    /// Agent that ran (or was chosen to run) the task.
    pub agent: Option<String>,
    /// Present when the agent was chosen by the delegation router.
    pub delegation: Option<DelegationDecision>,
    pub output: Option<TaskOutput>,
    pub error: Option<TaskError>,
    /// Runtime invocations made so far.
    pub attempts: u32,
    /// Admission wave, 1-based.
    pub wave: Option<usize>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Wall-clock time between start and finish.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).to_std().unwrap_or_default()),
            _ => None,
        }
    }
}

/// Shared state of one run.
#[derive(Debug)]
pub struct RunState {
    id: Uuid,
    started_at: DateTime<Utc>,
    records: Vec<Mutex<TaskRecord>>,
    /// Tasks assigned to each agent so far in this run.
    agent_load: DashMap<String, usize>,
}

impl RunState {
    pub fn new(id: Uuid, task_count: usize) -> Self {
        Self {
            id,
            started_at: Utc::now(),
            records: (0..task_count).map(|_| Mutex::new(TaskRecord::default())).collect(),
            agent_load: DashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy of a task's record.
    pub fn snapshot(&self, idx: usize) -> TaskRecord {
        self.records[idx].lock().clone()
    }

    pub fn status(&self, idx: usize) -> TaskStatus {
        self.records[idx].lock().status
    }

    /// Raw output of a completed task.
    pub fn output(&self, idx: usize) -> Option<String> {
        self.records[idx].lock().output.as_ref().map(|o| o.raw.clone())
    }

    /// Claim a pending task for dispatch. Returns `false` if the task was
    /// already dispatched or is no longer pending.
    pub fn mark_dispatched(
        &self,
        idx: usize,
        agent: &str,
        wave: usize,
        delegation: Option<DelegationDecision>,
    ) -> bool {
        let mut record = self.records[idx].lock();
        if record.dispatched || record.status != TaskStatus::Pending {
            return false;
        }
        record.dispatched = true;
        record.agent = Some(agent.to_string());
        record.wave = Some(wave);
        record.delegation = delegation;
        true
    }

    pub fn mark_running(&self, idx: usize) {
        let mut record = self.records[idx].lock();
        record.status = TaskStatus::Running;
        record.started_at = Some(Utc::now());
    }

    /// Count one runtime invocation; returns the new attempt number.
    pub fn record_attempt(&self, idx: usize) -> u32 {
        let mut record = self.records[idx].lock();
        record.attempts += 1;
        record.attempts
    }

    /// Record a successful outcome. Returns `false`, leaving the record
    /// untouched, if the task is already terminal.
    pub fn complete(&self, idx: usize, output: TaskOutput) -> bool {
        let mut record = self.records[idx].lock();
        if record.status.is_terminal() {
            return false;
        }
        record.status = TaskStatus::Completed;
        record.output = Some(output);
        record.error = None;
        record.finished_at = Some(Utc::now());
        true
    }

    /// Record a terminal failure. Returns `false`, leaving the record
    /// untouched, if the task is already terminal.
    pub fn fail(&self, idx: usize, error: TaskError) -> bool {
        let mut record = self.records[idx].lock();
        if record.status.is_terminal() {
            return false;
        }
        record.status = TaskStatus::Failed;
        record.error = Some(error);
        record.finished_at = Some(Utc::now());
        true
    }

    /// Mark a never-dispatched task failed because of its dependencies.
    /// Returns `false` if the task was already dispatched or is terminal.
    pub fn block(&self, idx: usize, dependencies: Vec<String>) -> bool {
        let mut record = self.records[idx].lock();
        if record.dispatched || record.status != TaskStatus::Pending {
            return false;
        }
        record.status = TaskStatus::Failed;
        record.error = Some(TaskError::DependencyFailed { dependencies });
        true
    }

    /// Count a task assignment against an agent.
    pub fn assign_load(&self, agent: &str) {
        *self.agent_load.entry(agent.to_string()).or_insert(0) += 1;
    }

    /// Tasks assigned to the agent so far in this run.
    pub fn load(&self, agent: &str) -> usize {
        self.agent_load.get(agent).map(|v| *v).unwrap_or(0)
    }
}
