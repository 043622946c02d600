//! Workload-based assignee ranking.
//!
//! Agents are ranked by the number of open tickets currently assigned to them
//! in the project. The least loaded active agent is recommended.
//!
//! When an agent's load cannot be determined the agent is excluded from the
//! ranking (and reported in [`AgentRanking::excluded`]) rather than guessed at,
//! so a failing lookup can never make an agent look idle.

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use triage_core::{Agent, AssigneeRecommendation, RankedAgent, Result, TicketStore};

use crate::jql;

/// Outcome of ranking a set of agents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRanking {
    /// Active agents ordered by `current_load` ascending; ties keep input order.
    pub ranked: Vec<RankedAgent>,
    /// Account ids whose load lookup failed.
    pub excluded: Vec<String>,
    /// Lowest-load agent, or `None` when nobody could be ranked.
    pub recommendation: Option<AssigneeRecommendation>,
}

/// Rank agents by load using a synchronous lookup.
pub fn rank_agents<F>(agents: &[Agent], mut load_lookup: F) -> AgentRanking
where
    F: FnMut(&Agent) -> Result<u32>,
{
    let loads = agents
        .iter()
        .filter(|agent| agent.active)
        .map(|agent| (agent.clone(), load_lookup(agent)))
        .collect();
    build_ranking(loads)
}

/// Rank agents by counting their open tickets in `project_key`.
///
/// Lookups run concurrently; each result lands in its own slot of the local
/// accumulator so no shared state is touched.
#[instrument(skip(store, agents), fields(
    subsystem = "search",
    component = "workload",
    op = "rank_agents",
    project_key = %project_key,
    agent_count = agents.len(),
))]
pub async fn rank_agents_with_store(
    store: &dyn TicketStore,
    project_key: &str,
    agents: &[Agent],
) -> AgentRanking {
    let active: Vec<&Agent> = agents.iter().filter(|a| a.active).collect();
    let lookups = active.iter().map(move |agent| {
        let query = jql::open_assigned(project_key, &agent.account_id);
        async move { store.count_tickets(&query).await }
    });
    let results = join_all(lookups).await;

    let loads = active.into_iter().cloned().zip(results).collect();
    build_ranking(loads)
}

fn build_ranking(loads: Vec<(Agent, Result<u32>)>) -> AgentRanking {
    let mut ranked = Vec::with_capacity(loads.len());
    let mut excluded = Vec::new();

    for (agent, load) in loads {
        match load {
            Ok(current_load) => {
                debug!(account_id = %agent.account_id, current_load, "Resolved agent load");
                ranked.push(RankedAgent {
                    agent,
                    current_load,
                });
            }
            Err(e) => {
                warn!(
                    account_id = %agent.account_id,
                    error = %e,
                    "Workload lookup failed, excluding agent from ranking"
                );
                excluded.push(agent.account_id);
            }
        }
    }

    // Stable: equal loads keep insertion order.
    ranked.sort_by_key(|r| r.current_load);

    let recommendation = ranked
        .first()
        .cloned()
        .map(AssigneeRecommendation::lowest_workload);

    AgentRanking {
        ranked,
        excluded,
        recommendation,
    }
}
