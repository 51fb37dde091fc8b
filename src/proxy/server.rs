use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::error::{AppError, AppResult};
use crate::proxy::config::GatewayConfig;
use crate::proxy::handlers;
use crate::proxy::session::CredentialStore;
use crate::proxy::upstream::UpstreamClient;

/// Axum application state
#[derive(Clone)]
pub struct AppState {
    pub credentials: CredentialStore,
    pub upstream: Arc<UpstreamClient>,
}

impl AppState {
    pub fn new(config: &GatewayConfig) -> AppResult<Self> {
        Ok(Self {
            credentials: CredentialStore::new(config.production),
            upstream: Arc::new(UpstreamClient::new(config)?),
        })
    }
}

/// Build the gateway routes
///
/// `/api/proxy/*` sits behind the session middleware; `/api/auth/*` and
/// `/healthz` do not.
pub fn build_router(state: AppState) -> Router {
    let forward = handlers::forward::handle_forward;
    let proxy_routes = Router::new()
        .route(
            "/api/proxy/*path",
            get(forward).post(forward).patch(forward).delete(forward),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::proxy::middleware::auth_middleware,
        ));

    Router::new()
        .merge(proxy_routes)
        .route("/api/auth/login", post(handlers::auth::handle_login))
        .route("/api/auth/logout", post(handlers::auth::handle_logout))
        .route("/api/auth/me", get(handlers::auth::handle_me))
        .route("/healthz", get(health_check_handler))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Axum server instance
pub struct AxumServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
    local_addr: SocketAddr,
}

impl AxumServer {
    /// Start Axum server
    pub async fn start(config: &GatewayConfig) -> AppResult<(Self, tokio::task::JoinHandle<()>)> {
        let state = AppState::new(config)?;
        let app = build_router(state);

        let addr = format!("{}:{}", config.get_bind_address(), config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::Config(format!("Failed to bind address {}: {}", addr, e)))?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            "Gateway started at http://{} (upstream {})",
            local_addr,
            config.api_base()
        );

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            use hyper::server::conn::http1;
            use hyper_util::rt::TokioIo;
            use hyper_util::service::TowerToHyperService;

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let service = TowerToHyperService::new(app.clone());

                                tokio::task::spawn(async move {
                                    if let Err(err) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Connection handling finished or errored: {:?}", err);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {:?}", e);
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("Gateway stopped listening");
                        break;
                    }
                }
            }
        });

        Ok((
            Self {
                shutdown_tx: Some(shutdown_tx),
                local_addr,
            },
            handle,
        ))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop server
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Health check handler
async fn health_check_handler() -> Response {
    Json(serde_json::json!({
        "status": "ok"
    }))
    .into_response()
}
