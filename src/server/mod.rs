//! REST control plane
//!
//! Maps each control-surface operation onto a JSON route, guarded by an
//! optional API key and wrapped in permissive CORS.

pub mod auth;
pub mod error;
pub mod routes;

pub use auth::ApiKey;
pub use error::ApiError;

use crate::control::ControlSurface;
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all control routes and middleware
pub fn build_router(control: Arc<ControlSurface>, api_key: ApiKey) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Loop lifecycle and health
        .route("/api/crawler/start", post(routes::start_loop))
        .route("/api/crawler/stop", post(routes::stop_loop))
        .route("/api/crawler/test-cycle", post(routes::test_cycle))
        .route("/api/crawler/state", get(routes::get_health))
        // Policy
        .route("/api/anti-crawl/strategy", get(routes::get_policy))
        .route(
            "/api/anti-crawl/strategy/update",
            post(routes::update_policy),
        )
        // Identity pool
        .route("/api/anti-crawl/ip-pool", get(routes::get_pool_status))
        .route("/api/anti-crawl/ip-pool/add", post(routes::add_identity))
        .route(
            "/api/anti-crawl/ip-pool/remove",
            post(routes::remove_identity),
        )
        .layer(middleware::from_fn_with_state(
            api_key,
            auth::api_key_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(control)
}

/// Serves `router` on a pre-bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!("control plane listening on http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
