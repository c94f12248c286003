//! Task dependency graph.
//!
//! Compiles the crew's task list into a DAG keyed by task index. The graph
//! is validated once (duplicate names, unknown dependencies, cycles) and is
//! read-only afterwards; per-run eligibility counters live in a separate
//! [`ReadyTracker`].

use std::collections::{BTreeSet, HashMap};

use crate::task::Task;
use crate::utilities::errors::GraphError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Validated dependency graph over a crew's tasks.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    names: Vec<String>,
    /// Direct dependencies per task, in declaration order, deduplicated.
    dependencies: Vec<Vec<usize>>,
    /// Direct dependents per task, ascending.
    dependents: Vec<Vec<usize>>,
    /// Topological order, lowest index first among ready tasks.
    order: Vec<usize>,
}

impl TaskGraph {
    /// Build and validate the graph for the given tasks.
    ///
    /// # Errors
    ///
    /// `DuplicateTask` for a repeated name, `UnknownDependency` for a
    /// dependency naming no task, `CycleDetected` with the cycle's path.
    pub fn build(tasks: &[Task]) -> Result<Self, GraphError> {
        let mut index = HashMap::with_capacity(tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            if index.insert(task.name.clone(), i).is_some() {
                return Err(GraphError::DuplicateTask {
                    name: task.name.clone(),
                });
            }
        }

        let mut dependencies = vec![Vec::new(); tasks.len()];
        let mut dependents = vec![Vec::new(); tasks.len()];
        for (i, task) in tasks.iter().enumerate() {
            for dep in &task.context {
                let j = *index
                    .get(dep)
                    .ok_or_else(|| GraphError::UnknownDependency {
                        task: task.name.clone(),
                        dependency: dep.clone(),
                    })?;
                if !dependencies[i].contains(&j) {
                    dependencies[i].push(j);
                    dependents[j].push(i);
                }
            }
        }

        let mut graph = Self {
            names: tasks.iter().map(|t| t.name.clone()).collect(),
            dependencies,
            dependents,
            order: Vec::new(),
        };

        if let Some(cycle) = graph.find_cycle() {
            return Err(GraphError::CycleDetected { cycle });
        }
        graph.order = graph.compute_order();

        log::debug!(
            "Built task graph: {} tasks, {} edges",
            graph.len(),
            graph.dependencies.iter().map(Vec::len).sum::<usize>()
        );
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name of the task at `idx`.
    pub fn name(&self, idx: usize) -> &str {
        &self.names[idx]
    }

    /// Direct dependencies of a task, in declaration order.
    pub fn dependencies(&self, idx: usize) -> &[usize] {
        &self.dependencies[idx]
    }

    /// Tasks that directly depend on `idx`, ascending.
    pub fn dependents(&self, idx: usize) -> &[usize] {
        &self.dependents[idx]
    }

    /// Tasks with no dependencies, ascending.
    pub fn initial_ready(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| self.dependencies[i].is_empty())
            .collect()
    }

    /// A topological order of all tasks.
    pub fn topological_order(&self) -> &[usize] {
        &self.order
    }

    /// Every task reachable downstream of `idx`, ascending.
    pub fn transitive_dependents(&self, idx: usize) -> Vec<usize> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<usize> = self.dependents[idx].clone();
        while let Some(next) = stack.pop() {
            if seen.insert(next) {
                stack.extend(self.dependents[next].iter().copied());
            }
        }
        seen.into_iter().collect()
    }

    /// Fresh per-run eligibility counters.
    pub fn ready_tracker(&self) -> ReadyTracker {
        ReadyTracker {
            remaining: self.dependencies.iter().map(Vec::len).collect(),
        }
    }

    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut colors = vec![Color::White; self.len()];
        let mut path = Vec::new();
        for start in 0..self.len() {
            if colors[start] == Color::White {
                if let Some(cycle) = self.visit(start, &mut colors, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn visit(&self, node: usize, colors: &mut [Color], path: &mut Vec<usize>) -> Option<Vec<String>> {
        colors[node] = Color::Gray;
        path.push(node);

        for &dep in &self.dependencies[node] {
            match colors[dep] {
                Color::Gray => {
                    let pos = path.iter().position(|&n| n == dep).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[pos..].iter().map(|&i| self.names[i].clone()).collect();
                    cycle.push(self.names[dep].clone());
                    return Some(cycle);
                }
                Color::White => {
                    if let Some(cycle) = self.visit(dep, colors, path) {
                        return Some(cycle);
                    }
                }
                Color::Black => {}
            }
        }

        path.pop();
        colors[node] = Color::Black;
        None
    }

    fn compute_order(&self) -> Vec<usize> {
        let mut tracker = self.ready_tracker();
        let mut ready: BTreeSet<usize> = self.initial_ready().into_iter().collect();
        let mut order = Vec::with_capacity(self.len());
        while let Some(next) = ready.pop_first() {
            order.push(next);
            ready.extend(tracker.resolve(self, next));
        }
        order
    }
}

/// Per-run count of unresolved dependencies for every task.
#[derive(Debug, Clone)]
pub struct ReadyTracker {
    remaining: Vec<usize>,
}

impl ReadyTracker {
    /// Record `completed` as done and return the dependents that just became
    /// eligible, ascending.
    pub fn resolve(&mut self, graph: &TaskGraph, completed: usize) -> Vec<usize> {
        let mut newly_ready = Vec::new();
        for &dependent in graph.dependents(completed) {
            let count = &mut self.remaining[dependent];
            if *count > 0 {
                *count -= 1;
                if *count == 0 {
                    newly_ready.push(dependent);
                }
            }
        }
        newly_ready
    }
}
