//! Main Crew struct.
//!
//! A crew is an ordered roster of agents plus an ordered list of tasks,
//! validated once at construction. Every `execute()` call runs against a
//! fresh run state, so a crew can be executed any number of times.

use md5::{Digest, Md5};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::agent::Agent;
use crate::crews::delegation::DelegationRouter;
use crate::crews::run_result::RunResult;
use crate::crews::run_state::RunState;
use crate::crews::scheduler::Scheduler;
use crate::crews::task_executor::{RetryPolicy, TaskExecutor};
use crate::crews::task_graph::TaskGraph;
use crate::events::{CrewEvent, CrewEventKind, EventBus, EventListener};
use crate::process::Process;
use crate::task::{Task, TaskCallback};
use crate::tasks::task_output::TaskOutput;
use crate::utilities::errors::{CrewError, CrewResult, DelegationError};

/// Worker pool size used when none is configured.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Per-call overrides for [`Crew::execute`].
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Values for `{placeholders}` in task descriptions and expected outputs.
    pub inputs: HashMap<String, String>,
    /// Process mode for this call only.
    pub process: Option<Process>,
    /// Worker pool size for this call only.
    pub max_concurrency: Option<usize>,
    /// `Some(true)` runs a sequential crew concurrently; `Some(false)` runs
    /// one task at a time whatever the mode.
    pub async_execution: Option<bool>,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add one interpolation input.
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }

    /// Builder: replace all interpolation inputs.
    pub fn with_inputs(mut self, inputs: HashMap<String, String>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_process(mut self, process: Process) -> Self {
        self.process = Some(process);
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = Some(max_concurrency);
        self
    }

    pub fn with_async_execution(mut self, async_execution: bool) -> Self {
        self.async_execution = Some(async_execution);
        self
    }
}

/// Represents a group of agents, defining how they should collaborate and the
/// tasks they should perform.
pub struct Crew {
    // ---- Identity ----
    /// Unique identifier for the crew instance.
    id: Uuid,
    /// Optional name for the crew.
    name: Option<String>,

    // ---- Tasks and Agents ----
    agents: Vec<Agent>,
    tasks: Vec<Task>,
    /// Compiled once from `tasks`; read-only during runs.
    graph: TaskGraph,

    // ---- Process ----
    process: Process,
    max_concurrency: usize,
    retry: RetryPolicy,

    // ---- Callbacks ----
    /// Callback to be executed after each completed task.
    task_callback: Option<TaskCallback>,
    listeners: Vec<EventListener>,
}

impl fmt::Debug for Crew {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crew")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("agents", &self.agents)
            .field("tasks", &self.tasks)
            .field("process", &self.process)
            .field("max_concurrency", &self.max_concurrency)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Crew {
    /// Create a crew and validate it.
    ///
    /// # Errors
    ///
    /// `CrewError::Graph` for duplicate task names, unknown dependencies or
    /// cycles; `CrewError::Configuration` for an inconsistent roster or
    /// assignment; `CrewError::Delegation` for a hierarchical crew that has
    /// unassigned tasks but no specialist to take them.
    pub fn new(agents: Vec<Agent>, tasks: Vec<Task>, process: Process) -> CrewResult<Self> {
        let graph = TaskGraph::build(&tasks)?;

        let mut names = HashSet::with_capacity(agents.len());
        for agent in &agents {
            if !names.insert(agent.name.as_str()) {
                return Err(CrewError::Configuration(format!(
                    "duplicate agent name '{}'",
                    agent.name
                )));
            }
        }
        for task in &tasks {
            if let Some(agent) = &task.agent {
                if !names.contains(agent.as_str()) {
                    return Err(CrewError::Configuration(format!(
                        "task '{}' is assigned to unknown agent '{}'",
                        task.name, agent
                    )));
                }
            }
        }

        let crew = Self {
            id: Uuid::new_v4(),
            name: None,
            agents,
            tasks,
            graph,
            process,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            retry: RetryPolicy::default(),
            task_callback: None,
            listeners: Vec::new(),
        };
        crew.validate_process(process)?;
        Ok(crew)
    }

    /// Builder: name the crew.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder: set the worker pool size. Zero is rejected at execution.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Builder: set the backoff between task attempts.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Builder: set a callback invoked after every completed task.
    pub fn with_task_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Task, &TaskOutput) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.task_callback = Some(Arc::new(callback));
        self
    }

    /// Builder: register an execution event listener.
    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&CrewEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn process(&self) -> Process {
        self.process
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Get an agent by name.
    pub fn agent(&self, name: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.name == name)
    }

    /// The manager of the crew, if there is one.
    pub fn manager(&self) -> Option<&Agent> {
        self.agents.iter().find(|a| a.is_manager())
    }

    /// Compute the key property (MD5 hash of agent keys + task keys).
    pub fn key(&self) -> String {
        let mut source: Vec<String> = self.agents.iter().map(Agent::key).collect();
        source.extend(self.tasks.iter().map(Task::key));
        let mut hasher = Md5::new();
        hasher.update(source.join("|").as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Execute the crew with default options.
    pub async fn kickoff(&self) -> CrewResult<RunResult> {
        self.execute(ExecuteOptions::default()).await
    }

    /// Execute the crew's workflow.
    ///
    /// A run where some tasks fail still returns `Ok`; the failures are
    /// reported per task in the result.
    ///
    /// # Errors
    ///
    /// Configuration, delegation and interpolation problems, all detected
    /// before any task is dispatched.
    pub async fn execute(&self, options: ExecuteOptions) -> CrewResult<RunResult> {
        let mut process = options.process.unwrap_or(self.process);
        let mut capacity = options.max_concurrency.unwrap_or(self.max_concurrency);
        if capacity == 0 {
            return Err(CrewError::Configuration(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        match options.async_execution {
            Some(true) if process == Process::Sequential => process = Process::Concurrent,
            Some(false) => capacity = 1,
            _ => {}
        }
        self.validate_process(process)?;

        let tasks = if options.inputs.is_empty() {
            self.tasks.clone()
        } else {
            self.tasks
                .iter()
                .map(|t| t.interpolated(&options.inputs))
                .collect::<Result<Vec<Task>, String>>()
                .map_err(CrewError::Interpolation)?
        };
        let assignments = tasks
            .iter()
            .map(|t| {
                t.agent
                    .as_deref()
                    .and_then(|name| self.agents.iter().position(|a| a.name == name))
            })
            .collect();

        let run_id = Uuid::new_v4();
        let total_tasks = tasks.len();
        let state = Arc::new(RunState::new(run_id, total_tasks));
        let events = EventBus::new(run_id, self.listeners.clone());
        let executor = Arc::new(TaskExecutor::new(
            Arc::new(tasks),
            state.clone(),
            events.clone(),
            self.retry,
            self.task_callback.clone(),
        ));
        let scheduler = Scheduler::new(
            &self.graph,
            &self.agents,
            assignments,
            process,
            capacity,
            executor,
        );

        log::info!(
            "Crew {} run {} started: {} task(s), process {}, max concurrency {}",
            self.name.as_deref().unwrap_or("crew"),
            run_id,
            total_tasks,
            process,
            scheduler.capacity()
        );
        events.emit(CrewEventKind::CrewStarted {
            process,
            total_tasks,
            max_concurrency: scheduler.capacity(),
        });

        let waves = scheduler.run().await;
        let result = RunResult::aggregate(self.key(), process, &self.graph, &state, waves);

        events.emit(CrewEventKind::CrewCompleted {
            completed_tasks: result.completed_tasks,
            failed_tasks: result.failed_tasks,
            success_rate: result.success_rate,
        });
        log::info!("Crew run {} finished: {}", run_id, result);
        Ok(result)
    }

    fn validate_process(&self, process: Process) -> CrewResult<()> {
        if !process.delegates() {
            if let Some(task) = self.tasks.iter().find(|t| t.agent.is_none()) {
                return Err(CrewError::Configuration(format!(
                    "task '{}' has no assigned agent; only a hierarchical crew delegates",
                    task.name
                )));
            }
            return Ok(());
        }

        let managers = self.agents.iter().filter(|a| a.is_manager()).count();
        match managers {
            0 => {
                return Err(CrewError::Configuration(
                    "a hierarchical crew requires a manager agent".to_string(),
                ))
            }
            1 => {}
            n => {
                return Err(CrewError::Configuration(format!(
                    "a hierarchical crew allows one manager agent, found {}",
                    n
                )))
            }
        }

        if let Some(task) = self.tasks.iter().find(|t| t.agent.is_none()) {
            if !DelegationRouter::new(&self.agents).has_candidates() {
                return Err(DelegationError::NoEligibleAgent {
                    task: task.name.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::runtime::{runtime_fn, RuntimeRequest};
    use crate::tasks::task_status::TaskStatus;
    use crate::utilities::errors::{GraphError, TaskError};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::time::Duration;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn quick() -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(1), Duration::from_millis(2))
    }

    /// Agent whose runtime echoes the task name followed by its context.
    fn echo(name: &str, role: &str, goal: &str) -> Agent {
        Agent::new(
            name,
            role,
            goal,
            "",
            runtime_fn(|req: RuntimeRequest| async move {
                tokio::time::sleep(Duration::from_millis(2)).await;
                Ok(match req.context_text() {
                    Some(ctx) => format!("{}[{}]", req.task_name, ctx.replace("\n\n---\n\n", "+")),
                    None => req.task_name,
                })
            }),
        )
    }

    fn counting(name: &str, calls: Arc<AtomicUsize>) -> Agent {
        Agent::new(
            name,
            "Worker",
            "Work",
            "",
            runtime_fn(move |req: RuntimeRequest| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(req.task_name) }
            }),
        )
    }

    #[tokio::test]
    async fn test_cycle_fails_before_any_dispatch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let err = Crew::new(
            vec![counting("w", calls.clone())],
            vec![
                Task::new("a", "A", "a").with_agent("w").with_context(["b"]),
                Task::new("b", "B", "b").with_agent("w").with_context(["a"]),
            ],
            Process::Concurrent,
        )
        .unwrap_err();
        assert!(matches!(err, CrewError::Graph(GraphError::CycleDetected { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dependency_order_in_every_mode() {
        init_logger();
        for process in [Process::Sequential, Process::Concurrent, Process::Hierarchical] {
            let agents = vec![
                Agent::manager("boss", "Manager", "Coordinate", "", runtime_fn(|_| async { Ok(String::new()) })),
                echo("w", "Worker", "Work"),
            ];
            let tasks = vec![
                Task::new("a", "first", "x").with_agent("w"),
                Task::new("b", "second", "y").with_agent("w").with_context(["a"]),
            ];
            let crew = Crew::new(agents, tasks, process).unwrap();
            let result = crew.kickoff().await.unwrap();

            let a = result.task("a").unwrap();
            let b = result.task("b").unwrap();
            assert!(a.finished_at.unwrap() <= b.started_at.unwrap());
            assert_eq!(b.raw(), Some("b[a]"));
            assert_eq!(result.success_rate, 100.0);
        }
    }

    #[tokio::test]
    async fn test_context_is_in_declaration_order() {
        let agent = Agent::new(
            "w",
            "Worker",
            "Work",
            "",
            runtime_fn(|req: RuntimeRequest| async move {
                if req.task_name == "a" {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                }
                Ok(req.context_text().unwrap_or_else(|| req.task_name.clone()))
            }),
        );
        let tasks = vec![
            Task::new("a", "A", "a").with_agent("w"),
            Task::new("b", "B", "b").with_agent("w"),
            Task::new("c", "C", "c").with_agent("w").with_context(["a", "b"]),
        ];
        let crew = Crew::new(vec![agent], tasks, Process::Concurrent)
            .unwrap()
            .with_max_concurrency(2);
        let result = crew.kickoff().await.unwrap();
        assert_eq!(result.task("c").unwrap().raw(), Some("a\n\n---\n\nb"));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let agent = Agent::new(
            "w",
            "Worker",
            "Work",
            "",
            runtime_fn(move |_| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        anyhow::bail!("transient failure {}", n);
                    }
                    Ok("finally".to_string())
                }
            }),
        );
        let crew = Crew::new(
            vec![agent],
            vec![Task::new("t", "flaky", "ok").with_agent("w").with_max_retries(3)],
            Process::Sequential,
        )
        .unwrap()
        .with_retry_policy(quick());

        let result = crew.kickoff().await.unwrap();
        let t = result.task("t").unwrap();
        assert_eq!(t.status, TaskStatus::Completed);
        assert_eq!(t.attempts, 3);
        assert_eq!(t.raw(), Some("finally"));
    }

    #[tokio::test]
    async fn test_exhausted_retries_block_dependents() {
        init_logger();
        for process in [Process::Sequential, Process::Concurrent, Process::Hierarchical] {
            let invoked: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
            let log = invoked.clone();
            let agent = Agent::new(
                "w",
                "Worker",
                "Work",
                "",
                runtime_fn(move |req: RuntimeRequest| {
                    log.lock().push(req.task_name.clone());
                    async move {
                        if req.task_name == "load" {
                            anyhow::bail!("database unavailable");
                        }
                        Ok(String::from("ok"))
                    }
                }),
            );
            let mut agents = vec![agent];
            if process == Process::Hierarchical {
                agents.push(Agent::manager(
                    "boss",
                    "Manager",
                    "Coordinate",
                    "",
                    runtime_fn(|_| async { Ok(String::new()) }),
                ));
            }
            let tasks = vec![
                Task::new("load", "Load", "rows").with_agent("w").with_max_retries(2),
                Task::new("summarize", "Summarize", "text").with_agent("w").with_context(["load"]),
                Task::new("publish", "Publish", "url").with_agent("w").with_context(["summarize"]),
                Task::new("ping", "Ping", "pong").with_agent("w"),
            ];
            let crew = Crew::new(agents, tasks, process)
                .unwrap()
                .with_retry_policy(quick());
            let result = crew.kickoff().await.unwrap();

            let load = result.task("load").unwrap();
            assert_eq!(load.status, TaskStatus::Failed, "{:?}", process);
            assert_eq!(load.attempts, 2);
            assert!(matches!(load.error, Some(TaskError::Execution(_))));

            for name in ["summarize", "publish"] {
                let blocked = result.task(name).unwrap();
                assert_eq!(blocked.status, TaskStatus::Failed);
                assert!(blocked.is_blocked(), "{} in {:?}", name, process);
                assert_eq!(blocked.attempts, 0);
                assert!(!invoked.lock().contains(&name.to_string()));
            }
            assert_eq!(result.task("ping").unwrap().raw(), Some("ok"));

            assert_eq!(result.completed_tasks, 1);
            assert_eq!(result.failed_tasks, 3);
            assert_eq!(result.blocked_tasks, 2);
            assert_eq!(result.completed_tasks + result.failed_tasks, result.total_tasks);
            assert_eq!(
                result.success_rate,
                result.completed_tasks as f64 / result.total_tasks as f64 * 100.0
            );
            assert_eq!(result.success_rate, 25.0);
        }
    }

    #[tokio::test]
    async fn test_hierarchical_delegation_is_deterministic() {
        let manager = Agent::manager(
            "lead",
            "Project Manager",
            "Coordinate the team",
            "",
            runtime_fn(|_| async { Ok("manager".to_string()) }),
        );
        let agents = vec![
            manager,
            echo("writer", "Technical Writer", "Write clear documentation"),
            echo("analyst", "Data Analyst", "Analyze datasets and statistics"),
        ];
        let tasks = vec![Task::new("stats", "Analyze the sales dataset", "Summary statistics")];
        let crew = Crew::new(agents, tasks, Process::Hierarchical).unwrap();

        for _ in 0..3 {
            let result = crew.kickoff().await.unwrap();
            let stats = result.task("stats").unwrap();
            assert_eq!(stats.agent.as_deref(), Some("analyst"));
            assert!(stats.delegated);
            assert!(!stats.delegation.as_ref().unwrap().fallback);
        }
    }

    #[tokio::test]
    async fn test_wave_scenario() {
        let tasks = vec![
            Task::new("t1", "one", "x").with_agent("w"),
            Task::new("t2", "two", "x").with_agent("w").with_async_execution(true),
            Task::new("t3", "three", "x").with_agent("w").with_context(["t1", "t2"]),
            Task::new("t4", "four", "x").with_agent("w").with_context(["t3"]),
        ];
        let crew = Crew::new(vec![echo("w", "Worker", "Work")], tasks, Process::Concurrent)
            .unwrap()
            .with_max_concurrency(2);
        let result = crew.kickoff().await.unwrap();

        assert_eq!(result.waves, 3);
        let waves: Vec<Option<usize>> = result.task_results.iter().map(|r| r.wave).collect();
        assert_eq!(waves, vec![Some(1), Some(1), Some(2), Some(3)]);
        assert_eq!(result.success_rate, 100.0);
        assert!(result.is_success());
        assert_eq!(result.final_output().unwrap().raw, "t4[t3[t1+t2]]");
    }

    #[tokio::test]
    async fn test_crew_is_reusable() {
        let crew = Crew::new(
            vec![echo("w", "Worker", "Work")],
            vec![
                Task::new("a", "A", "a").with_agent("w"),
                Task::new("b", "B", "b").with_agent("w").with_context(["a"]),
            ],
            Process::Sequential,
        )
        .unwrap();

        let first = crew.kickoff().await.unwrap();
        let second = crew.kickoff().await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(first.crew_key, second.crew_key);
        for (x, y) in first.task_results.iter().zip(&second.task_results) {
            assert_eq!(x.status, y.status);
            assert_eq!(x.raw(), y.raw());
            assert_eq!(x.attempts, 1);
            assert_eq!(y.attempts, 1);
        }
    }

    #[tokio::test]
    async fn test_callback_failure_does_not_fail_task() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let crew = Crew::new(
            vec![echo("w", "Worker", "Work")],
            vec![Task::new("t", "T", "t")
                .with_agent("w")
                .with_callback(|_, _| anyhow::bail!("webhook down"))],
            Process::Sequential,
        )
        .unwrap()
        .with_task_callback(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let result = crew.kickoff().await.unwrap();
        assert_eq!(result.task("t").unwrap().status, TaskStatus::Completed);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_callback_keeps_task_and_dependents_running() {
        init_logger();
        let crew = Crew::new(
            vec![echo("w", "Worker", "Work")],
            vec![
                Task::new("a", "A", "a")
                    .with_agent("w")
                    .with_callback(|_, _| panic!("callback bug")),
                Task::new("b", "B", "b").with_agent("w").with_context(["a"]),
            ],
            Process::Sequential,
        )
        .unwrap()
        .with_task_callback(|_, _| panic!("crew callback bug"));

        let result = crew.kickoff().await.unwrap();
        let a = result.task("a").unwrap();
        assert_eq!(a.status, TaskStatus::Completed);
        assert_eq!(a.raw(), Some("a"));
        assert_eq!(a.error, None);
        let b = result.task("b").unwrap();
        assert_eq!(b.status, TaskStatus::Completed);
        assert_eq!(b.raw(), Some("b[a]"));
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_disturb_the_run() {
        init_logger();
        for process in [Process::Sequential, Process::Concurrent] {
            let crew = Crew::new(
                vec![echo("w", "Worker", "Work")],
                vec![
                    Task::new("a", "A", "a").with_agent("w"),
                    Task::new("b", "B", "b").with_agent("w").with_context(["a"]),
                ],
                process,
            )
            .unwrap()
            .with_listener(|e| {
                if matches!(e.kind.event_type(), "wave_started" | "task_completed" | "crew_started") {
                    panic!("listener bug");
                }
            });

            let result = crew.kickoff().await.unwrap();
            assert_eq!(result.total_tasks, 2);
            assert_eq!(result.completed_tasks, 2);
            assert_eq!(result.task("b").unwrap().raw(), Some("b[a]"));
            assert_eq!(result.waves, 2);
        }
    }

    #[tokio::test]
    async fn test_inputs_are_interpolated_per_call() {
        let agent = Agent::new(
            "w",
            "Worker",
            "Work",
            "",
            runtime_fn(|req: RuntimeRequest| async move { Ok(req.description) }),
        );
        let crew = Crew::new(
            vec![agent],
            vec![Task::new("t", "Research {topic}", "Notes").with_agent("w")],
            Process::Sequential,
        )
        .unwrap();

        let result = crew
            .execute(ExecuteOptions::new().with_input("topic", "tokio"))
            .await
            .unwrap();
        assert_eq!(result.task("t").unwrap().raw(), Some("Research tokio"));
        assert_eq!(crew.tasks()[0].description, "Research {topic}");

        let err = crew
            .execute(ExecuteOptions::new().with_input("other", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, CrewError::Interpolation(_)));
    }

    #[tokio::test]
    async fn test_async_option_runs_sequential_crew_concurrently() {
        let crew = Crew::new(
            vec![echo("w", "Worker", "Work")],
            vec![
                Task::new("a", "A", "a").with_agent("w"),
                Task::new("b", "B", "b").with_agent("w"),
            ],
            Process::Sequential,
        )
        .unwrap();

        let sequential = crew.kickoff().await.unwrap();
        assert_eq!(sequential.waves, 2);

        let concurrent = crew
            .execute(ExecuteOptions::new().with_async_execution(true))
            .await
            .unwrap();
        assert_eq!(concurrent.process, Process::Concurrent);
        assert_eq!(concurrent.waves, 1);
    }

    #[tokio::test]
    async fn test_events_bracket_the_run() {
        let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let crew = Crew::new(
            vec![echo("w", "Worker", "Work")],
            vec![Task::new("a", "A", "a").with_agent("w")],
            Process::Sequential,
        )
        .unwrap()
        .with_listener(move |e| sink.lock().push(e.kind.event_type().to_string()));

        crew.kickoff().await.unwrap();
        assert_eq!(
            *events.lock(),
            vec![
                "crew_started",
                "wave_started",
                "task_started",
                "task_completed",
                "crew_completed"
            ]
        );
    }

    #[test]
    fn test_configuration_errors() {
        let rt = || runtime_fn(|_| async { Ok(String::new()) });
        let specialist = |name: &str| Agent::new(name, "Worker", "Work", "", rt());
        let manager = |name: &str| Agent::manager(name, "Manager", "Lead", "", rt());

        let unassigned = Crew::new(vec![specialist("w")], vec![Task::new("t", "T", "t")], Process::Sequential);
        assert!(matches!(unassigned, Err(CrewError::Configuration(_))));

        let unknown = Crew::new(
            vec![specialist("w")],
            vec![Task::new("t", "T", "t").with_agent("ghost")],
            Process::Sequential,
        );
        assert!(matches!(unknown, Err(CrewError::Configuration(_))));

        let duplicate = Crew::new(vec![specialist("w"), specialist("w")], vec![], Process::Sequential);
        assert!(matches!(duplicate, Err(CrewError::Configuration(_))));

        let no_manager = Crew::new(vec![specialist("w")], vec![], Process::Hierarchical);
        assert!(matches!(no_manager, Err(CrewError::Configuration(_))));

        let two_managers = Crew::new(
            vec![manager("a"), manager("b"), specialist("w")],
            vec![],
            Process::Hierarchical,
        );
        assert!(matches!(two_managers, Err(CrewError::Configuration(_))));

        let nobody_to_delegate_to = Crew::new(
            vec![manager("boss")],
            vec![Task::new("t", "T", "t")],
            Process::Hierarchical,
        );
        assert_eq!(
            nobody_to_delegate_to.unwrap_err(),
            CrewError::Delegation(DelegationError::NoEligibleAgent { task: "t".into() })
        );
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let crew = Crew::new(
            vec![echo("w", "Worker", "Work")],
            vec![Task::new("t", "T", "t").with_agent("w")],
            Process::Concurrent,
        )
        .unwrap();
        let err = tokio_test::block_on(crew.execute(ExecuteOptions::new().with_max_concurrency(0))).unwrap_err();
        assert!(matches!(err, CrewError::Configuration(_)));
    }

    #[test]
    fn test_empty_crew_runs() {
        let crew = Crew::new(Vec::new(), Vec::new(), Process::Concurrent).unwrap();
        let result = tokio_test::block_on(crew.kickoff()).unwrap();
        assert_eq!(result.total_tasks, 0);
        assert_eq!(result.success_rate, 0.0);
        assert_eq!(result.waves, 0);
    }
}
