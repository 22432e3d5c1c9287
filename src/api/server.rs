//! HTTP server for the REST API

use super::handlers;
use crate::state::AppState;
use axum::http::HeaderValue;
use axum::{routing::get, routing::post, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Build the application router with CORS and request tracing
pub fn router(state: Arc<AppState>) -> Router {
    let prefix = state.config.api_prefix.clone();
    let cors = cors_layer(&state.config.cors_origins);

    let api = Router::new()
        .route(
            "/stocks",
            get(handlers::list_stocks).post(handlers::create_stock),
        )
        .route(
            "/stocks/:symbol",
            get(handlers::get_stock)
                .put(handlers::update_stock)
                .delete(handlers::delete_stock),
        )
        .route(
            "/stocks/:symbol/prices",
            get(handlers::get_prices).post(handlers::upsert_price),
        )
        .route(
            "/stocks/:symbol/prices/batch",
            post(handlers::batch_upsert_prices),
        )
        .route("/stocks/:symbol/events", get(handlers::list_stock_events))
        .route(
            "/events",
            get(handlers::list_events).post(handlers::create_event),
        )
        .route(
            "/events/:id",
            get(handlers::get_event)
                .put(handlers::update_event)
                .delete(handlers::delete_event),
        );

    let app = Router::new().route("/health", get(handlers::health_check));
    let app = if prefix.is_empty() {
        app.merge(api)
    } else {
        app.nest(&prefix, api)
    };

    app.with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Running API server
pub struct ApiServer {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ApiServer {
    /// Bind the configured address and serve in a background task
    pub async fn start(state: Arc<AppState>) -> Result<Self, String> {
        let addr = state.config.bind_addr();
        let prefix = state.config.api_prefix.clone();
        let app = router(state);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("API server shutting down");
            });

            if let Err(e) = server.await {
                error!("API server error: {}", e);
            }
        });

        info!("Stock Events API listening on http://{}", local_addr);
        info!("  GET  http://{}/health", local_addr);
        info!("  REST http://{}{}/stocks", local_addr, prefix);
        info!("  REST http://{}{}/events", local_addr, prefix);

        Ok(Self {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("API server task failed: {}", e);
            }
        }
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
