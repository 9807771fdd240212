//! HTTP surface for the search aggregator.
//!
//! `/api/search` runs one aggregation per request, `/health` is always open,
//! and `/api/auth` plus a cookie check form an optional shared-password gate.
pub mod gate;
pub mod routes;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use clipscout_search::{PublishTime, SearchOrchestrator};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub use gate::{SITE_AUTH_COOKIE, SiteGate};

/// Values used when a request leaves `publish_time` or `sort_by` out.
#[derive(Debug, Clone)]
pub struct SearchDefaults {
    pub publish_time: PublishTime,
    pub sort_by: String,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            publish_time: PublishTime::default(),
            sort_by: clipscout_search::DEFAULT_SORT_BY.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SearchOrchestrator>,
    pub defaults: SearchDefaults,
    /// `None` leaves every route open.
    pub gate: Option<Arc<SiteGate>>,
}

impl AppState {
    pub fn new(orchestrator: Arc<SearchOrchestrator>) -> Self {
        Self {
            orchestrator,
            defaults: SearchDefaults::default(),
            gate: None,
        }
    }

    pub fn with_defaults(mut self, defaults: SearchDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_gate(mut self, gate: Option<SiteGate>) -> Self {
        self.gate = gate.map(Arc::new);
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/search", get(routes::search))
        .route("/api/auth", post(routes::auth))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::require_site_auth,
        ))
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener.local_addr()?;
    tracing::info!(
        target: "server",
        addr = %local_addr,
        gated = state.gate.is_some(),
        "server.listening"
    );
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!(target: "server", addr = %local_addr, "server.stopped");
    Ok(())
}

/// Bind `host:port` and serve until Ctrl-C.
pub async fn bind_and_serve(host: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    serve(listener, state, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(target: "server", error = %err, "server.signal_failed");
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Bind an ephemeral loopback port and serve in the background.
pub async fn spawn(state: AppState) -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(err) = serve(listener, state, std::future::pending()).await {
            tracing::error!(target: "server", error = %err, "server.failed");
        }
    });
    Ok(addr)
}
