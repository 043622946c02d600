//! Triage operations behind the HTTP surface.
//!
//! Every operation takes validated inputs: an [`IssueKey`] and the
//! [`RequestContext`] of the caller. Raw strings are checked once, at the
//! boundary, and never again.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use triage_core::defaults;
use triage_core::{
    project_key_of, Classification, ClassificationSource, Error, MetricsSnapshot, Priority,
    Result, SettingsStore, Ticket, TicketStore, TriageResult, Urgency,
};
use triage_inference::{ChainOutcome, ClassificationChain, MetricsTracker};
use triage_jira::{apply_triage, ApplyReport};
use triage_search::{find_similar, rank_agents_with_store, AgentRanking, SimilarityConfig};

// =============================================================================
// VALIDATED INPUTS
// =============================================================================

/// A ticket key of the form `PROJ-123`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueKey(String);

impl IssueKey {
    pub fn parse(raw: &str) -> Result<Self> {
        let key = raw.trim();
        if key.is_empty() {
            return Err(Error::InvalidInput("issue key is required".to_string()));
        }
        if project_key_of(key).is_none() {
            return Err(Error::InvalidInput(format!(
                "issue key must look like PROJ-123, got {:?}",
                key
            )));
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn project(&self) -> &str {
        // parse() guarantees a project prefix
        project_key_of(&self.0).unwrap_or_default()
    }
}

impl std::fmt::Display for IssueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who is asking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub account_id: String,
}

impl RequestContext {
    pub fn new(account_id: &str) -> Result<Self> {
        let account_id = account_id.trim();
        if account_id.is_empty() {
            return Err(Error::InvalidInput(
                "request context must carry an account id".to_string(),
            ));
        }
        Ok(Self {
            account_id: account_id.to_string(),
        })
    }
}

/// Operator-supplied classification used instead of running the chain.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationOverride {
    pub category: String,
    #[serde(default)]
    pub sub_category: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub urgency: Option<Urgency>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl ClassificationOverride {
    pub fn into_classification(self) -> Result<Classification> {
        let category = self.category.trim().to_string();
        if category.is_empty() {
            return Err(Error::InvalidInput("category is required".to_string()));
        }
        let sub_category = self
            .sub_category
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "General".to_string());
        Ok(Classification {
            category,
            sub_category,
            priority: self.priority.unwrap_or_default(),
            urgency: self.urgency.unwrap_or_default(),
            confidence: 100,
            reasoning: self
                .reasoning
                .unwrap_or_else(|| "manual classification".to_string()),
            tags: Vec::new(),
            source: ClassificationSource::Manual,
        })
    }
}

/// Body of an apply request. An empty body runs the classification chain.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    #[serde(default)]
    pub classification: Option<ClassificationOverride>,
}

/// Triage result together with what was written back.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOutcome {
    pub triage: TriageResult,
    pub report: ApplyReport,
}

/// Classification response for a single ticket.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResponse {
    pub issue_key: String,
    pub classification: Classification,
    pub fallback_reason: Option<String>,
}

// =============================================================================
// SERVICE
// =============================================================================

/// Entry point for every triage operation.
pub struct TriageService {
    store: Arc<dyn TicketStore>,
    chain: ClassificationChain,
    metrics: Arc<MetricsTracker>,
    settings: Arc<dyn SettingsStore>,
    similarity: SimilarityConfig,
}

impl TriageService {
    pub fn new(
        store: Arc<dyn TicketStore>,
        chain: ClassificationChain,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        let metrics = Arc::clone(chain.metrics());
        Self {
            store,
            chain,
            metrics,
            settings,
            similarity: SimilarityConfig::default(),
        }
    }

    pub fn with_similarity_config(mut self, config: SimilarityConfig) -> Self {
        self.similarity = config;
        self
    }

    #[instrument(skip(self, ctx), fields(
        subsystem = "api",
        op = "classify",
        issue_key = %key,
        account_id = %ctx.account_id,
    ))]
    pub async fn classify(&self, ctx: &RequestContext, key: &IssueKey) -> Result<ClassifyResponse> {
        let ticket = self.store.get_ticket(key.as_str()).await?;
        let outcome = self.chain.classify(&ticket).await;
        Ok(ClassifyResponse {
            issue_key: ticket.key,
            classification: outcome.classification,
            fallback_reason: outcome.fallback_reason.map(|r| r.as_str().to_string()),
        })
    }

    #[instrument(skip(self, ctx), fields(
        subsystem = "api",
        op = "similar",
        issue_key = %key,
        account_id = %ctx.account_id,
    ))]
    pub async fn similar(
        &self,
        ctx: &RequestContext,
        key: &IssueKey,
    ) -> Result<Vec<triage_core::SimilarTicket>> {
        let ticket = self.store.get_ticket(key.as_str()).await?;
        find_similar(self.store.as_ref(), &ticket, &self.similarity).await
    }

    #[instrument(skip(self, ctx), fields(
        subsystem = "api",
        op = "recommend_assignee",
        issue_key = %key,
        account_id = %ctx.account_id,
    ))]
    pub async fn recommend_assignee(
        &self,
        ctx: &RequestContext,
        key: &IssueKey,
    ) -> Result<AgentRanking> {
        let ticket = self.store.get_ticket(key.as_str()).await?;
        self.rank_for(&ticket, key.project()).await
    }

    /// Classify, rank agents and find similar tickets concurrently.
    ///
    /// Only a missing ticket fails the call. Agent and similarity failures
    /// degrade to empty lists.
    #[instrument(skip(self, ctx), fields(
        subsystem = "api",
        op = "triage",
        issue_key = %key,
        account_id = %ctx.account_id,
    ))]
    pub async fn triage(&self, ctx: &RequestContext, key: &IssueKey) -> Result<TriageResult> {
        let ticket = self.store.get_ticket(key.as_str()).await?;
        Ok(self.assemble(&ticket, key.project(), None).await)
    }

    /// Triage a ticket (or take the operator's classification) and write the
    /// result back.
    #[instrument(skip(self, ctx, request), fields(
        subsystem = "api",
        op = "apply",
        issue_key = %key,
        account_id = %ctx.account_id,
        manual = request.classification.is_some(),
    ))]
    pub async fn apply(
        &self,
        ctx: &RequestContext,
        key: &IssueKey,
        request: ApplyRequest,
    ) -> Result<ApplyOutcome> {
        let manual = request
            .classification
            .map(ClassificationOverride::into_classification)
            .transpose()?;
        let ticket = self.store.get_ticket(key.as_str()).await?;
        let triage = self.assemble(&ticket, key.project(), manual).await;
        let report = apply_triage(self.store.as_ref(), &ticket, &triage).await;
        Ok(ApplyOutcome { triage, report })
    }

    /// Apply triage to a newly created ticket when auto-triage is on.
    ///
    /// Returns `None` when the setting is off.
    #[instrument(skip(self, ctx), fields(
        subsystem = "api",
        op = "issue_created",
        issue_key = %key,
        account_id = %ctx.account_id,
    ))]
    pub async fn handle_issue_created(
        &self,
        ctx: &RequestContext,
        key: &IssueKey,
    ) -> Result<Option<ApplyOutcome>> {
        if !self.auto_triage_enabled().await? {
            debug!("Auto-triage disabled, ignoring new ticket");
            return Ok(None);
        }
        self.apply(ctx, key, ApplyRequest::default()).await.map(Some)
    }

    pub async fn auto_triage_enabled(&self) -> Result<bool> {
        let value = self.settings.get(defaults::AUTO_TRIAGE_SETTING).await?;
        Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    #[instrument(skip(self, ctx), fields(
        subsystem = "api",
        op = "set_auto_triage",
        account_id = %ctx.account_id,
    ))]
    pub async fn set_auto_triage(&self, ctx: &RequestContext, enabled: bool) -> Result<bool> {
        self.settings
            .set(defaults::AUTO_TRIAGE_SETTING, json!(enabled))
            .await?;
        info!(enabled, "Auto-triage setting changed");
        Ok(enabled)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    #[instrument(skip(self, ctx), fields(
        subsystem = "api",
        op = "reset_metrics",
        account_id = %ctx.account_id,
    ))]
    pub fn reset_metrics(&self, ctx: &RequestContext) -> MetricsSnapshot {
        self.metrics.reset();
        self.metrics.snapshot()
    }

    async fn rank_for(&self, ticket: &Ticket, project: &str) -> Result<AgentRanking> {
        let agents = self
            .store
            .list_assignable_agents(project, defaults::AGENT_LIMIT)
            .await?;
        debug!(
            issue_key = %ticket.key,
            agent_count = agents.len(),
            "Loaded assignable agents"
        );
        Ok(rank_agents_with_store(self.store.as_ref(), project, &agents).await)
    }

    async fn assemble(
        &self,
        ticket: &Ticket,
        project: &str,
        manual: Option<Classification>,
    ) -> TriageResult {
        let start = Instant::now();
        let classify = async move {
            match manual {
                Some(classification) => ChainOutcome {
                    classification,
                    fallback_reason: None,
                },
                None => self.chain.classify(ticket).await,
            }
        };

        let (outcome, ranking, similar) = tokio::join!(
            classify,
            self.rank_for(ticket, project),
            find_similar(self.store.as_ref(), ticket, &self.similarity),
        );

        let ranking = ranking.unwrap_or_else(|e| {
            warn!(error = %e, "Assignee ranking unavailable, continuing without it");
            AgentRanking::default()
        });
        let similar_tickets = similar.unwrap_or_else(|e| {
            warn!(error = %e, "Similar ticket search failed, continuing without it");
            Vec::new()
        });

        info!(
            source = outcome.classification.source.as_str(),
            ranked = ranking.ranked.len(),
            similar = similar_tickets.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Triage assembled"
        );

        TriageResult {
            issue_key: ticket.key.clone(),
            classification: outcome.classification,
            recommendation: ranking.recommendation,
            ranked_agents: ranking.ranked,
            similar_tickets,
            fallback_reason: outcome.fallback_reason.map(|r| r.as_str().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::Agent;
    use triage_inference::mock::{MockChatBackend, MockReply};
    use triage_inference::ChainConfig;
    use triage_jira::{MemorySettingsStore, MemoryTicketStore};

    const LLM_ANSWER: &str = r#"{"category":"Network","subCategory":"VPN","priority":"High","urgency":"Urgent","confidence":85,"reasoning":"VPN outage"}"#;

    fn ctx() -> RequestContext {
        RequestContext::new("acc-operator").unwrap()
    }

    fn key(raw: &str) -> IssueKey {
        IssueKey::parse(raw).unwrap()
    }

    fn seeded_store() -> Arc<MemoryTicketStore> {
        let store = Arc::new(MemoryTicketStore::new());
        store.insert_ticket(
            Ticket {
                key: "IT-1".to_string(),
                summary: "Cannot connect to VPN from home".to_string(),
                labels: vec!["remote".to_string()],
                ..Default::default()
            },
            None,
        );
        store.add_agent(
            "IT",
            Agent {
                account_id: "a1".to_string(),
                display_name: "Ana".to_string(),
                email: None,
                active: true,
            },
        );
        store
    }

    fn service(store: Arc<MemoryTicketStore>, reply: MockReply) -> TriageService {
        let backend = Arc::new(MockChatBackend::new().with_default_reply(reply));
        let chain = ClassificationChain::new(
            backend,
            Arc::new(MetricsTracker::new()),
            ChainConfig::default(),
        );
        TriageService::new(store, chain, Arc::new(MemorySettingsStore::new()))
    }

    #[test]
    fn test_issue_key_validation() {
        assert_eq!(key(" IT-42 ").as_str(), "IT-42");
        assert_eq!(key("IT-42").project(), "IT");
        assert!(matches!(IssueKey::parse(""), Err(Error::InvalidInput(_))));
        assert!(matches!(IssueKey::parse("IT42"), Err(Error::InvalidInput(_))));
        assert!(matches!(IssueKey::parse("IT-"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_request_context_requires_account() {
        assert!(matches!(RequestContext::new("  "), Err(Error::InvalidInput(_))));
        assert_eq!(RequestContext::new("acc-1").unwrap().account_id, "acc-1");
    }

    #[test]
    fn test_override_requires_category() {
        let blank = ClassificationOverride {
            category: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            blank.into_classification(),
            Err(Error::InvalidInput(_))
        ));

        let c = ClassificationOverride {
            category: "Access".to_string(),
            priority: Some(Priority::Low),
            ..Default::default()
        }
        .into_classification()
        .unwrap();
        assert_eq!(c.sub_category, "General");
        assert_eq!(c.priority, Priority::Low);
        assert_eq!(c.source, ClassificationSource::Manual);
    }

    #[tokio::test]
    async fn test_triage_merges_all_parts() {
        let svc = service(seeded_store(), MockReply::text(LLM_ANSWER));
        let result = svc.triage(&ctx(), &key("IT-1")).await.unwrap();

        assert_eq!(result.classification.source, ClassificationSource::Llm);
        assert_eq!(result.classification.category, "Network");
        assert!(result.fallback_reason.is_none());
        assert_eq!(
            result.recommendation.unwrap().agent.agent.account_id,
            "a1"
        );
        assert!(result.similar_tickets.is_empty());
    }

    #[tokio::test]
    async fn test_similarity_config_limits_results() {
        let store = seeded_store();
        for (key, summary) in [("IT-2", "VPN drops hourly"), ("IT-3", "VPN from home blocked")] {
            store.insert_ticket(
                Ticket {
                    key: key.to_string(),
                    summary: summary.to_string(),
                    resolution: Some("Fixed".to_string()),
                    ..Default::default()
                },
                None,
            );
        }

        let svc = service(store.clone(), MockReply::text(LLM_ANSWER));
        assert_eq!(svc.similar(&ctx(), &key("IT-1")).await.unwrap().len(), 2);

        let svc = service(store, MockReply::text(LLM_ANSWER)).with_similarity_config(
            SimilarityConfig {
                top_n: 1,
                ..Default::default()
            },
        );
        let similar = svc.similar(&ctx(), &key("IT-1")).await.unwrap();
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].key, "IT-3");
    }

    #[tokio::test]
    async fn test_triage_survives_search_failure() {
        let store = seeded_store();
        store.fail_search(true);
        let svc = service(store, MockReply::text(LLM_ANSWER));

        let result = svc.triage(&ctx(), &key("IT-1")).await.unwrap();
        assert_eq!(result.classification.source, ClassificationSource::Llm);
        assert!(result.similar_tickets.is_empty());
        assert_eq!(
            result.recommendation.unwrap().agent.agent.account_id,
            "a1"
        );
    }

    #[tokio::test]
    async fn test_triage_survives_agent_listing_failure() {
        let store = seeded_store();
        store.fail_agent_listing(true);
        let svc = service(store, MockReply::network_error());

        let result = svc.triage(&ctx(), &key("IT-1")).await.unwrap();
        assert_eq!(
            result.classification.source,
            ClassificationSource::KeywordFallback
        );
        assert_eq!(result.fallback_reason.as_deref(), Some("network-error"));
        assert!(result.recommendation.is_none());
        assert!(result.ranked_agents.is_empty());
    }

    #[tokio::test]
    async fn test_recommend_assignee_surfaces_listing_failure() {
        let store = seeded_store();
        store.fail_agent_listing(true);
        let svc = service(store, MockReply::text(LLM_ANSWER));

        let err = svc
            .recommend_assignee(&ctx(), &key("IT-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }

    #[tokio::test]
    async fn test_missing_ticket_is_not_found() {
        let svc = service(seeded_store(), MockReply::text(LLM_ANSWER));
        assert!(matches!(
            svc.triage(&ctx(), &key("IT-99")).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_apply_with_manual_override_skips_llm() {
        let store = seeded_store();
        let backend = Arc::new(MockChatBackend::new().with_default_reply(MockReply::text(LLM_ANSWER)));
        let chain = ClassificationChain::new(
            backend.clone(),
            Arc::new(MetricsTracker::new()),
            ChainConfig::default(),
        );
        let svc = TriageService::new(store.clone(), chain, Arc::new(MemorySettingsStore::new()));

        let request = ApplyRequest {
            classification: Some(ClassificationOverride {
                category: "Access".to_string(),
                sub_category: Some("Password Reset".to_string()),
                ..Default::default()
            }),
        };
        let outcome = svc.apply(&ctx(), &key("IT-1"), request).await.unwrap();

        assert_eq!(backend.call_count(), 0);
        assert!(outcome.report.is_complete());
        assert_eq!(
            outcome.report.labels,
            vec![
                "remote",
                "ai-category:access",
                "ai-subcategory:password-reset",
                "ai-triaged"
            ]
        );
        assert_eq!(store.assignee_account("IT-1").as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn test_auto_triage_setting_defaults_off() {
        let store = seeded_store();
        let svc = service(store.clone(), MockReply::text(LLM_ANSWER));

        assert!(!svc.auto_triage_enabled().await.unwrap());
        assert!(svc
            .handle_issue_created(&ctx(), &key("IT-1"))
            .await
            .unwrap()
            .is_none());
        assert!(store.comments("IT-1").is_empty());

        svc.set_auto_triage(&ctx(), true).await.unwrap();
        assert!(svc.auto_triage_enabled().await.unwrap());
        let outcome = svc
            .handle_issue_created(&ctx(), &key("IT-1"))
            .await
            .unwrap()
            .unwrap();
        assert!(outcome.report.comment_added);
        assert_eq!(store.comments("IT-1").len(), 1);
    }

    #[tokio::test]
    async fn test_reset_metrics() {
        let svc = service(seeded_store(), MockReply::network_error());
        svc.classify(&ctx(), &key("IT-1")).await.unwrap();
        assert_eq!(svc.metrics().fallback_usage.total, 1);

        let snapshot = svc.reset_metrics(&ctx());
        assert_eq!(snapshot.fallback_usage.total, 0);
        assert_eq!(snapshot.rovo_calls.total, 0);
    }
}
