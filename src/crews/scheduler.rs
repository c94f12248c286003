//! Dependency-ordered scheduler over a bounded worker pool.
//!
//! The scheduler is the only owner of the ready set. It admits eligible
//! tasks into a bounded dispatch channel, a fixed set of workers pulls jobs
//! from that channel and runs them through the [`TaskExecutor`], and every
//! terminal status comes back on a completion channel. Completed tasks
//! release their dependents; failed tasks block their whole downstream
//! subtree with `DependencyFailed`, and blocked tasks are never dispatched.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::agent::Agent;
use crate::events::CrewEventKind;
use crate::process::Process;
use crate::tasks::task_context::TaskContext;
use crate::tasks::task_status::TaskStatus;
use crate::utilities::errors::{TaskError, TaskExecutionError};

use super::delegation::DelegationRouter;
use super::task_executor::{ExecutionJob, TaskExecutor};
use super::task_graph::TaskGraph;

/// Terminal status reported by a worker.
#[derive(Debug, Clone, Copy)]
struct Completion {
    index: usize,
    status: TaskStatus,
}

/// Drives one run of a crew.
pub struct Scheduler<'a> {
    graph: &'a TaskGraph,
    agents: &'a [Agent],
    /// Explicitly assigned agent (registry index) per task; `None` means
    /// the task goes through the delegation router.
    assignments: Vec<Option<usize>>,
    agent_index: HashMap<&'a str, usize>,
    router: DelegationRouter<'a>,
    process: Process,
    capacity: usize,
    executor: Arc<TaskExecutor>,
}

impl<'a> Scheduler<'a> {
    /// `capacity` is the worker pool size; it is forced to 1 for the
    /// sequential process.
    pub fn new(
        graph: &'a TaskGraph,
        agents: &'a [Agent],
        assignments: Vec<Option<usize>>,
        process: Process,
        capacity: usize,
        executor: Arc<TaskExecutor>,
    ) -> Self {
        let capacity = if process.is_parallel() { capacity.max(1) } else { 1 };
        Self {
            graph,
            agents,
            assignments,
            agent_index: agents
                .iter()
                .enumerate()
                .map(|(i, a)| (a.name.as_str(), i))
                .collect(),
            router: DelegationRouter::new(agents),
            process,
            capacity,
            executor,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run every task to a terminal status. Returns the number of admission
    /// waves.
    pub async fn run(&self) -> usize {
        if self.graph.is_empty() {
            return 0;
        }

        let workers = self.capacity.min(self.graph.len()).max(1);
        let (job_tx, job_rx) = mpsc::channel::<ExecutionJob>(self.capacity);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();

        let handles: Vec<_> = (0..workers)
            .map(|id| {
                tokio::spawn(worker(
                    id,
                    job_rx.clone(),
                    self.executor.clone(),
                    done_tx.clone(),
                ))
            })
            .collect();
        drop(done_tx);
        log::debug!("Started {} worker(s) for {} task(s)", workers, self.graph.len());

        let mut tracker = self.graph.ready_tracker();
        let mut ready = self.graph.initial_ready();
        let mut in_flight = 0usize;
        let mut waves = 0usize;

        loop {
            let admitted = self.select(&mut ready, self.capacity - in_flight);
            if !admitted.is_empty() {
                waves += 1;
                let names: Vec<String> = admitted
                    .iter()
                    .map(|&i| self.graph.name(i).to_string())
                    .collect();
                log::info!("Wave {}: dispatching {}", waves, names.join(", "));
                self.executor().events().emit(CrewEventKind::WaveStarted {
                    wave: waves,
                    tasks: names,
                });

                for idx in admitted {
                    let job = match self.prepare(idx, waves) {
                        Ok(Some(job)) => job,
                        Ok(None) => continue,
                        Err(error) => {
                            self.fail_undispatched(idx, error);
                            continue;
                        }
                    };
                    if job_tx.send(job).await.is_err() {
                        self.fail_undispatched(idx, "worker pool shut down".to_string());
                        continue;
                    }
                    in_flight += 1;
                }
            }

            if in_flight == 0 {
                if ready.is_empty() {
                    break;
                }
                continue;
            }

            let Some(first) = done_rx.recv().await else {
                log::error!("All workers exited with {} task(s) in flight", in_flight);
                break;
            };
            let mut batch = vec![first];
            while let Ok(next) = done_rx.try_recv() {
                batch.push(next);
            }

            for completion in batch {
                in_flight -= 1;
                if completion.status == TaskStatus::Completed {
                    ready.extend(tracker.resolve(self.graph, completion.index));
                } else {
                    self.block_downstream(completion.index);
                }
            }
        }

        drop(job_tx);
        for handle in handles {
            if let Err(e) = handle.await {
                log::error!("Worker terminated abnormally: {}", e);
            }
        }

        self.settle();
        waves
    }

    fn executor(&self) -> &TaskExecutor {
        &self.executor
    }

    /// Remove up to `room` tasks from the ready set in admission order.
    fn select(&self, ready: &mut Vec<usize>, room: usize) -> Vec<usize> {
        if room == 0 || ready.is_empty() {
            return Vec::new();
        }
        let tasks = self.executor().tasks();
        if self.process.is_parallel() {
            // Async tasks first, then declaration order.
            ready.sort_by_key(|&i| (!tasks[i].async_execution, i));
        } else {
            ready.sort_unstable();
        }
        let take = room.min(ready.len());
        ready.drain(..take).collect()
    }

    /// Resolve the agent, claim the task and gather its context.
    fn prepare(&self, idx: usize, wave: usize) -> Result<Option<ExecutionJob>, String> {
        let tasks = self.executor().tasks();
        let state = self.executor().state();
        let task = &tasks[idx];

        let (agent_idx, delegation) = match self.assignments[idx] {
            Some(agent_idx) => (agent_idx, None),
            None => {
                let decision = self
                    .router
                    .route(task, |name| state.load(name))
                    .map_err(|e| e.to_string())?;
                let agent_idx = *self
                    .agent_index
                    .get(decision.agent.as_str())
                    .ok_or_else(|| format!("delegated to unknown agent '{}'", decision.agent))?;
                self.executor().events().emit(CrewEventKind::TaskDelegated {
                    task: task.name.clone(),
                    agent: decision.agent.clone(),
                    score: decision.score,
                    fallback: decision.fallback,
                });
                (agent_idx, Some(decision))
            }
        };

        let agent = &self.agents[agent_idx];
        if !state.mark_dispatched(idx, &agent.name, wave, delegation) {
            log::error!("Task '{}' was already dispatched", task.name);
            return Ok(None);
        }
        state.assign_load(&agent.name);

        let mut context = TaskContext::new();
        for &dep in self.graph.dependencies(idx) {
            if let Some(output) = state.output(dep) {
                context.push(self.graph.name(dep), output);
            }
        }

        log::debug!(
            "Dispatching task '{}' to agent '{}' ({} context entries)",
            task.name,
            agent.name,
            context.len()
        );
        Ok(Some(ExecutionJob {
            index: idx,
            agent: agent.clone(),
            context,
        }))
    }

    fn fail_undispatched(&self, idx: usize, message: String) {
        let name = self.graph.name(idx);
        log::error!("Could not dispatch task '{}': {}", name, message);
        let error = TaskError::from(TaskExecutionError::Runtime { message });
        self.executor().state().fail(idx, error.clone());
        self.executor().events().emit(CrewEventKind::TaskFailed {
            task: name.to_string(),
            error,
        });
        self.block_downstream(idx);
    }

    /// Block every pending task downstream of a failed one.
    fn block_downstream(&self, failed: usize) {
        let downstream: BTreeSet<usize> = self.graph.transitive_dependents(failed).into_iter().collect();
        if downstream.is_empty() {
            return;
        }
        for &idx in self.graph.topological_order() {
            if downstream.contains(&idx) {
                self.block(idx);
            }
        }
    }

    /// Mark a task `DependencyFailed` citing its failed direct dependencies.
    fn block(&self, idx: usize) -> bool {
        let state = self.executor().state();
        let failed: Vec<String> = self
            .graph
            .dependencies(idx)
            .iter()
            .filter(|&&dep| state.status(dep) == TaskStatus::Failed)
            .map(|&dep| self.graph.name(dep).to_string())
            .collect();
        if failed.is_empty() {
            return false;
        }
        if !state.block(idx, failed.clone()) {
            return false;
        }
        log::warn!(
            "Task '{}' blocked by failed dependencies: {}",
            self.graph.name(idx),
            failed.join(", ")
        );
        self.executor().events().emit(CrewEventKind::TaskBlocked {
            task: self.graph.name(idx).to_string(),
            dependencies: failed,
        });
        true
    }

    /// Guarantee every task ends terminal, even if the loop bailed early.
    fn settle(&self) {
        let state = self.executor().state();
        for &idx in self.graph.topological_order() {
            if state.status(idx).is_terminal() || self.block(idx) {
                continue;
            }
            log::error!("Task '{}' did not reach a terminal status", self.graph.name(idx));
            state.fail(
                idx,
                TaskError::from(TaskExecutionError::Runtime {
                    message: "task did not reach a terminal status".to_string(),
                }),
            );
        }
    }
}

async fn worker(
    id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<ExecutionJob>>>,
    executor: Arc<TaskExecutor>,
    done: mpsc::UnboundedSender<Completion>,
) {
    loop {
        // Hold the lock only while waiting for the next job.
        let job = jobs.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };
        let index = job.index;
        let status = executor.execute(job).await;
        if done.send(Completion { index, status }).is_err() {
            break;
        }
    }
    log::trace!("Worker {} stopped", id);
}
