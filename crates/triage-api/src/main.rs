//! triage-api - HTTP API server for the ticket triage assistant

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use triage_api::{router, ServerConfig, TriageService};
use triage_core::defaults;
use triage_core::{SettingsStore, TicketStore};
use triage_inference::{ChainConfig, ClassificationChain, MetricsTracker, OpenAIChatBackend};
use triage_jira::{JiraClient, JiraConfig, MemorySettingsStore, MemoryTicketStore};
use triage_search::SimilarityConfig;

const DEFAULT_LOG_FILTER: &str =
    "triage_api=debug,triage_inference=info,triage_search=info,triage_jira=info,tower_http=debug";

/// Logging settings read from the environment.
///
/// - `LOG_FORMAT`: "json" or "text" (default "text")
/// - `LOG_FILE`: optional path; enables daily-rotated file output
/// - `LOG_ANSI`: "true"/"false" override for ANSI colors
/// - `RUST_LOG`: env filter
struct LogSettings {
    json: bool,
    file: Option<String>,
    ansi: Option<bool>,
}

impl LogSettings {
    fn from_env() -> Self {
        Self {
            json: std::env::var("LOG_FORMAT").map_or(false, |v| v.eq_ignore_ascii_case("json")),
            file: std::env::var("LOG_FILE").ok().filter(|p| !p.is_empty()),
            ansi: std::env::var("LOG_ANSI").ok().map(|v| v == "true" || v == "1"),
        }
    }
}

/// Install the global subscriber. The returned guard must live as long as
/// the process so buffered file output is flushed.
fn init_logging(settings: &LogSettings) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (writer, guard) = match &settings.file {
        Some(path) => {
            let path = Path::new(path);
            let dir = path.parent().unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or("triage-api.log");
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let layer = match (writer, settings.json) {
        (Some(w), true) => fmt::layer().json().with_writer(w).boxed(),
        // no ANSI in files unless asked for
        (Some(w), false) => fmt::layer()
            .with_writer(w)
            .with_ansi(settings.ansi.unwrap_or(false))
            .boxed(),
        (None, true) => fmt::layer().json().boxed(),
        (None, false) => match settings.ansi {
            Some(ansi) => fmt::layer().with_ansi(ansi).boxed(),
            None => fmt::layer().boxed(),
        },
    };

    tracing_subscriber::registry().with(filter).with(layer).init();
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let logging = LogSettings::from_env();
    let _file_guard = init_logging(&logging);
    info!(
        log_format = if logging.json { "json" } else { "text" },
        log_file = logging.file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let server_config = ServerConfig::from_env();
    server_config.validate()?;

    // Ticket store: real Jira site when configured, otherwise an empty in-memory store
    let jira_config = JiraConfig::from_env();
    let store: Arc<dyn TicketStore> = if jira_config.is_configured() {
        Arc::new(JiraClient::new(jira_config)?)
    } else {
        warn!(
            subsystem = "api",
            "JIRA_BASE_URL/JIRA_EMAIL/JIRA_API_TOKEN not set, using in-memory ticket store"
        );
        Arc::new(MemoryTicketStore::new())
    };
    let settings: Arc<dyn SettingsStore> = Arc::new(MemorySettingsStore::new());

    // Classification chain
    let chain_config = ChainConfig::from_env();
    chain_config.validate()?;
    if !chain_config.llm_enabled {
        warn!(subsystem = "api", "LLM_ENABLED is off, classifications use the keyword heuristic");
    }
    let backend = Arc::new(OpenAIChatBackend::from_env()?);
    let metrics = Arc::new(MetricsTracker::with_log_interval(Duration::from_secs(
        defaults::METRICS_LOG_INTERVAL_SECS,
    )));
    let chain = ClassificationChain::new(backend, metrics, chain_config);

    let similarity = SimilarityConfig::from_env();
    similarity.validate()?;

    let service =
        Arc::new(TriageService::new(store, chain, settings).with_similarity_config(similarity));
    let app = router(service, &server_config);

    // Start server
    let addr: SocketAddr = server_config.bind_address().parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
