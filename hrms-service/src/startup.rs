//! Application startup and lifecycle management.

use axum::{
    http::{header, HeaderName, HeaderValue, Method, Request},
    middleware::from_fn,
    routing::{get, patch, post, put},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use service_core::observability::init_metrics;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{HrmsConfig, StoreBackend};
use crate::handlers::{health, nodes, tree};
use crate::hierarchy::HierarchyService;
use crate::services::{InMemoryNodeRepository, NodeRepository, PgNodeRepository};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: HrmsConfig,
    pub hierarchy: HierarchyService,
}

impl AppState {
    pub fn new(config: HrmsConfig, repo: Arc<dyn NodeRepository>) -> Self {
        Self {
            config,
            hierarchy: HierarchyService::new(repo),
        }
    }
}

/// Routes plus the middleware stack. Exposed separately from
/// [`Application`] so tests can drive it without a socket.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/org-tree", get(tree::org_tree))
        .route("/:kind", get(nodes::list_nodes).post(nodes::create_node))
        .route("/:kind/bulk", post(nodes::bulk_create_nodes))
        .route("/:kind/with-children", post(nodes::create_with_children))
        .route("/:kind/order", put(nodes::reorder_nodes))
        .route("/:kind/tree", get(tree::kind_tree))
        .route(
            "/:kind/:id",
            get(nodes::get_node)
                .patch(nodes::rename_node)
                .delete(nodes::delete_node),
        )
        .route("/:kind/:id/parent", patch(nodes::reparent_node))
        .route("/:kind/:id/status", patch(nodes::set_node_status))
        .route("/:kind/:id/move", post(nodes::move_node));

    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", origin, e);
                None
            }
        })
        .collect();

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics_handler))
        .nest("/api", api)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::AUTHORIZATION,
                    HeaderName::from_static("x-request-id"),
                ]),
        )
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Connect the configured store and bind the listener.
    pub async fn build(config: HrmsConfig) -> Result<Self, AppError> {
        let repo: Arc<dyn NodeRepository> = match (config.store, &config.database) {
            (StoreBackend::Postgres, Some(db)) => {
                let repo = PgNodeRepository::connect(
                    db.url.expose_secret(),
                    db.max_connections,
                    db.min_connections,
                )
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                    e
                })?;
                repo.run_migrations().await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to run migrations");
                    e
                })?;
                Arc::new(repo)
            }
            (StoreBackend::Postgres, None) => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "PostgreSQL store selected without database settings"
                )));
            }
            (StoreBackend::Memory, _) => {
                tracing::warn!("Using in-memory node store; data will not survive a restart");
                Arc::new(InMemoryNodeRepository::new())
            }
        };

        Self::build_with_repository(config, repo).await
    }

    /// Bind the listener around an already constructed store.
    pub async fn build_with_repository(
        config: HrmsConfig,
        repo: Arc<dyn NodeRepository>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let addr: SocketAddr = format!("{}:{}", config.common.host, config.common.port)
            .parse()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid listen address: {}", e)))?;
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, store = ?config.store, "HTTP listener bound");

        Ok(Self {
            port,
            listener,
            router: build_router(AppState::new(config, repo)),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT or SIGTERM.
    pub async fn run_until_stopped(self) -> Result<(), AppError> {
        tracing::info!(port = self.port, "HTTP server listening");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
