//! Delegation router for hierarchical crews.
//!
//! Picks a specialist for a task that has no assigned agent. Candidates are
//! scored on keyword overlap between the task (name and description) and
//! the agent (role and goal), plus declared capabilities covering the
//! task's explicit requirements and the names of its tool overrides. The
//! best score wins and earlier-registered agents win ties. When nobody
//! clears the relevance floor the task goes to the least-loaded
//! specialist, so delegation always succeeds as long as one specialist
//! exists.

use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::task::Task;
use crate::tools::base_tool::tool_names;
use crate::utilities::errors::DelegationError;
use crate::utilities::string_utils::{keywords, keywords_match};

/// Weight of a task keyword found in the agent's role.
pub const ROLE_WEIGHT: f64 = 2.0;
/// Weight of a task keyword found in the agent's goal.
pub const GOAL_WEIGHT: f64 = 1.0;
/// Weight of each required capability the agent declares.
pub const CAPABILITY_WEIGHT: f64 = 1.5;
/// A score must exceed this to count as relevant.
pub const MIN_RELEVANCE: f64 = 0.5;

/// Outcome of routing one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationDecision {
    /// Name of the chosen agent.
    pub agent: String,
    /// Relevance score of the chosen agent.
    pub score: f64,
    /// Whether the least-loaded fallback was used.
    pub fallback: bool,
}

/// Scores and selects delegation targets from a crew's agents.
#[derive(Debug)]
pub struct DelegationRouter<'a> {
    agents: &'a [Agent],
    candidates: Vec<usize>,
}

impl<'a> DelegationRouter<'a> {
    /// Build a router over the registry. Managers are never candidates.
    pub fn new(agents: &'a [Agent]) -> Self {
        let candidates = agents
            .iter()
            .enumerate()
            .filter(|(_, a)| a.can_be_delegated_to())
            .map(|(i, _)| i)
            .collect();
        Self { agents, candidates }
    }

    /// Whether any agent can receive delegated work.
    pub fn has_candidates(&self) -> bool {
        !self.candidates.is_empty()
    }

    /// Relevance of `agent` for `task`.
    pub fn score(task: &Task, agent: &Agent) -> f64 {
        let task_words = keywords(&format!("{} {}", task.name, task.description));
        let role_words = keywords(&agent.role);
        let goal_words = keywords(&agent.goal);

        let hits = |words: &[String]| {
            task_words
                .iter()
                .filter(|t| words.iter().any(|w| keywords_match(t, w)))
                .count() as f64
        };

        let satisfied = required_capabilities(task)
            .iter()
            .filter(|c| agent.has_capability(c))
            .count() as f64;

        hits(&role_words) * ROLE_WEIGHT + hits(&goal_words) * GOAL_WEIGHT + satisfied * CAPABILITY_WEIGHT
    }

    /// Choose an agent for `task`. `load` reports how many tasks an agent has
    /// been assigned so far in the run.
    ///
    /// # Errors
    ///
    /// `NoEligibleAgent` when the registry holds no specialist.
    pub fn route<F>(&self, task: &Task, load: F) -> Result<DelegationDecision, DelegationError>
    where
        F: Fn(&str) -> usize,
    {
        let mut best: Option<(usize, f64)> = None;
        for &idx in &self.candidates {
            let score = Self::score(task, &self.agents[idx]);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((idx, score));
            }
        }

        let (best_idx, best_score) = best.ok_or_else(|| DelegationError::NoEligibleAgent {
            task: task.name.clone(),
        })?;

        if best_score > MIN_RELEVANCE {
            let agent = &self.agents[best_idx];
            log::debug!(
                "Delegating task '{}' to '{}' (score: {:.2})",
                task.name,
                agent.name,
                best_score
            );
            return Ok(DelegationDecision {
                agent: agent.name.clone(),
                score: best_score,
                fallback: false,
            });
        }

        let mut chosen: Option<(usize, usize)> = None;
        for &idx in &self.candidates {
            let current = load(&self.agents[idx].name);
            if chosen.map_or(true, |(_, least)| current < least) {
                chosen = Some((idx, current));
            }
        }
        // candidates is non-empty here, so `chosen` is always set.
        let (idx, current) = chosen.ok_or_else(|| DelegationError::NoEligibleAgent {
            task: task.name.clone(),
        })?;
        let agent = &self.agents[idx];
        log::debug!(
            "No relevant agent for task '{}'; falling back to least-loaded '{}' ({} assigned)",
            task.name,
            agent.name,
            current
        );
        Ok(DelegationDecision {
            agent: agent.name.clone(),
            score: Self::score(task, agent),
            fallback: true,
        })
    }
}

/// Explicit requirements plus the task's tool names, deduplicated
/// case-insensitively.
fn required_capabilities(task: &Task) -> Vec<String> {
    let mut required: Vec<String> = Vec::new();
    for name in task
        .required_capabilities
        .iter()
        .cloned()
        .chain(tool_names(&task.tools))
    {
        if !required.iter().any(|r| r.eq_ignore_ascii_case(&name)) {
            required.push(name);
        }
    }
    required
}
