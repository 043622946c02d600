//! Similarity search and workload ranking against a scripted ticket store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use triage_core::{Agent, Error, Result, Ticket, TicketStore, TicketUpdate};
use triage_search::{find_similar, rank_agents_with_store, SimilarityConfig};

/// Store that answers searches from a fixed list and counts from a map,
/// recording every query it receives.
#[derive(Default)]
struct ScriptedStore {
    search_results: Vec<Ticket>,
    counts: HashMap<String, u32>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedStore {
    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl TicketStore for ScriptedStore {
    async fn get_ticket(&self, key: &str) -> Result<Ticket> {
        Err(Error::NotFound(key.to_string()))
    }

    async fn search_tickets(&self, jql: &str, max_results: u32) -> Result<Vec<Ticket>> {
        self.queries.lock().unwrap().push(jql.to_string());
        Ok(self
            .search_results
            .iter()
            .take(max_results as usize)
            .cloned()
            .collect())
    }

    async fn count_tickets(&self, jql: &str) -> Result<u32> {
        self.queries.lock().unwrap().push(jql.to_string());
        self.counts
            .iter()
            .find(|(account, _)| jql.contains(&format!("assignee = \"{}\"", account)))
            .map(|(_, count)| *count)
            .ok_or_else(|| Error::Upstream("count failed".to_string()))
    }

    async fn update_ticket(&self, _key: &str, _update: &TicketUpdate) -> Result<()> {
        Ok(())
    }

    async fn assign_ticket(&self, _key: &str, _account_id: &str) -> Result<()> {
        Ok(())
    }

    async fn add_comment(&self, _key: &str, _text: &str) -> Result<()> {
        Ok(())
    }

    async fn list_assignable_agents(&self, _project: &str, _max: u32) -> Result<Vec<Agent>> {
        Ok(Vec::new())
    }
}

fn ticket(key: &str, summary: &str, description: &str) -> Ticket {
    Ticket {
        key: key.to_string(),
        summary: summary.to_string(),
        description: description.to_string(),
        resolution: Some("Done".to_string()),
        ..Default::default()
    }
}

fn agent(id: &str) -> Agent {
    Agent {
        account_id: id.to_string(),
        display_name: id.to_string(),
        email: None,
        active: true,
    }
}

#[tokio::test]
async fn test_short_summary_issues_no_query() {
    let store = ScriptedStore::default();
    let query = ticket("IT-1", "VM is up", "");

    let similar = find_similar(&store, &query, &SimilarityConfig::default())
        .await
        .unwrap();

    assert!(similar.is_empty());
    assert!(store.queries().is_empty(), "no search may be issued");
}

#[tokio::test]
async fn test_vpn_example_scores_twenty() {
    let store = ScriptedStore {
        search_results: vec![
            ticket("IT-3", "New VPN certificate", "Rotated the certificate."),
            ticket("IT-2", "Printer offline", "Cable unplugged."),
        ],
        ..Default::default()
    };
    let query = ticket("IT-9", "Cannot connect to VPN from home", "");

    let similar = find_similar(&store, &query, &SimilarityConfig::default())
        .await
        .unwrap();

    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].key, "IT-3");
    assert_eq!(similar[0].similarity_score, 20);
    assert_eq!(similar[0].resolution.as_deref(), Some("Done"));

    let queries = store.queries();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].contains(r#"key != "IT-9""#));
    assert!(queries[0].contains(r#"text ~ "VPN""#));
}

#[tokio::test]
async fn test_rank_agents_with_store_orders_by_open_tickets() {
    let store = ScriptedStore {
        counts: HashMap::from([
            ("a".to_string(), 5),
            ("b".to_string(), 2),
            ("c".to_string(), 8),
        ]),
        ..Default::default()
    };
    let agents = vec![agent("a"), agent("b"), agent("c")];

    let ranking = rank_agents_with_store(&store, "IT", &agents).await;

    let order: Vec<&str> = ranking
        .ranked
        .iter()
        .map(|r| r.agent.account_id.as_str())
        .collect();
    assert_eq!(order, vec!["b", "a", "c"]);
    assert_eq!(ranking.recommendation.unwrap().agent.current_load, 2);
    assert!(store
        .queries()
        .iter()
        .all(|q| q.contains("statusCategory != Done")));
}

#[tokio::test]
async fn test_rank_agents_with_store_excludes_failed_lookup() {
    let store = ScriptedStore {
        counts: HashMap::from([("a".to_string(), 4)]),
        ..Default::default()
    };
    let agents = vec![agent("a"), agent("missing")];

    let ranking = rank_agents_with_store(&store, "IT", &agents).await;

    assert_eq!(ranking.ranked.len(), 1);
    assert_eq!(ranking.excluded, vec!["missing".to_string()]);
}
