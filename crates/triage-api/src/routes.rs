//! HTTP routes and handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{FromRequestParts, Path, State},
    http::{header, request::Parts, HeaderName, HeaderValue, Method, Request},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use triage_core::{MetricsSnapshot, SimilarTicket, TriageResult};
use triage_search::AgentRanking;

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::service::{
    ApplyOutcome, ApplyRequest, ClassifyResponse, IssueKey, RequestContext, TriageService,
};

/// Header carrying the caller's account id.
pub const ACCOUNT_HEADER: &str = "x-account-id";

pub type AppState = Arc<TriageService>;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Time-ordered request correlation ids.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// CALLER EXTRACTOR
// =============================================================================

/// Validated caller context taken from the `X-Account-Id` header.
#[derive(Debug, Clone)]
pub struct Caller(pub RequestContext);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account_id = parts
            .headers
            .get(ACCOUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        Ok(Caller(RequestContext::new(account_id)?))
    }
}

fn json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid request body: {}", e)))
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the application router with tracing, request ids and CORS.
pub fn router(service: AppState, config: &ServerConfig) -> Router {
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/tickets/:key/classify", post(classify_ticket))
        .route("/api/v1/tickets/:key/similar", get(similar_tickets))
        .route("/api/v1/tickets/:key/assignee", get(recommend_assignee))
        .route("/api/v1/tickets/:key/triage", post(triage_ticket))
        .route("/api/v1/tickets/:key/apply", post(apply_ticket))
        .route(
            "/api/v1/settings/auto-triage",
            get(get_auto_triage).put(set_auto_triage),
        )
        .route("/api/v1/metrics", get(get_metrics))
        .route("/api/v1/metrics/reset", post(reset_metrics))
        .route("/api/v1/webhooks/issue-created", post(issue_created))
        .layer(CatchPanicLayer::new())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .with_state(service);

    if config.allowed_origins.is_empty() {
        return app;
    }
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    app.layer(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([
                header::CONTENT_TYPE,
                header::ACCEPT,
                HeaderName::from_static(ACCOUNT_HEADER),
            ])
            .max_age(Duration::from_secs(3600)),
    )
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn classify_ticket(
    State(service): State<AppState>,
    Caller(ctx): Caller,
    Path(key): Path<String>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let key = IssueKey::parse(&key)?;
    Ok(Json(service.classify(&ctx, &key).await?))
}

async fn similar_tickets(
    State(service): State<AppState>,
    Caller(ctx): Caller,
    Path(key): Path<String>,
) -> Result<Json<Vec<SimilarTicket>>, ApiError> {
    let key = IssueKey::parse(&key)?;
    Ok(Json(service.similar(&ctx, &key).await?))
}

async fn recommend_assignee(
    State(service): State<AppState>,
    Caller(ctx): Caller,
    Path(key): Path<String>,
) -> Result<Json<AgentRanking>, ApiError> {
    let key = IssueKey::parse(&key)?;
    Ok(Json(service.recommend_assignee(&ctx, &key).await?))
}

async fn triage_ticket(
    State(service): State<AppState>,
    Caller(ctx): Caller,
    Path(key): Path<String>,
) -> Result<Json<TriageResult>, ApiError> {
    let key = IssueKey::parse(&key)?;
    Ok(Json(service.triage(&ctx, &key).await?))
}

async fn apply_ticket(
    State(service): State<AppState>,
    Caller(ctx): Caller,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<Json<ApplyOutcome>, ApiError> {
    let key = IssueKey::parse(&key)?;
    let request: ApplyRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ApplyRequest::default()
    } else {
        json_body(&body)?
    };
    Ok(Json(service.apply(&ctx, &key, request).await?))
}

#[derive(Debug, Serialize, Deserialize)]
struct AutoTriageSetting {
    enabled: bool,
}

async fn get_auto_triage(
    State(service): State<AppState>,
    Caller(_ctx): Caller,
) -> Result<Json<AutoTriageSetting>, ApiError> {
    let enabled = service.auto_triage_enabled().await?;
    Ok(Json(AutoTriageSetting { enabled }))
}

async fn set_auto_triage(
    State(service): State<AppState>,
    Caller(ctx): Caller,
    body: Bytes,
) -> Result<Json<AutoTriageSetting>, ApiError> {
    let setting: AutoTriageSetting = json_body(&body)?;
    let enabled = service.set_auto_triage(&ctx, setting.enabled).await?;
    Ok(Json(AutoTriageSetting { enabled }))
}

async fn get_metrics(
    State(service): State<AppState>,
    Caller(_ctx): Caller,
) -> Json<MetricsSnapshot> {
    Json(service.metrics())
}

async fn reset_metrics(
    State(service): State<AppState>,
    Caller(ctx): Caller,
) -> Json<MetricsSnapshot> {
    Json(service.reset_metrics(&ctx))
}

/// Subset of Jira's `jira:issue_created` webhook payload.
#[derive(Debug, Deserialize)]
struct IssueCreatedEvent {
    issue: EventIssue,
    #[serde(default)]
    user: Option<EventUser>,
}

#[derive(Debug, Deserialize)]
struct EventIssue {
    key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventUser {
    account_id: String,
}

#[derive(Debug, Serialize)]
struct IssueCreatedResponse {
    applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<ApplyOutcome>,
}

/// Jira webhooks carry the acting user in the payload rather than a header.
async fn issue_created(
    State(service): State<AppState>,
    body: Bytes,
) -> Result<Json<IssueCreatedResponse>, ApiError> {
    let event: IssueCreatedEvent = json_body(&body)?;
    let ctx = RequestContext::new(
        event
            .user
            .as_ref()
            .map(|u| u.account_id.as_str())
            .unwrap_or_default(),
    )?;
    let key = IssueKey::parse(&event.issue.key)?;
    let outcome = service.handle_issue_created(&ctx, &key).await?;
    Ok(Json(IssueCreatedResponse {
        applied: outcome.is_some(),
        outcome,
    }))
}
