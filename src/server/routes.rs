//! REST handlers, one per control-surface operation

use crate::control::{
    AddIdentityRequest, AddResponse, ControlSurface, RemoveResponse, StartResponse, StopResponse,
};
use crate::orchestrator::CycleReport;
use crate::pool::PoolStatus;
use crate::server::error::ApiError;
use crate::strategy::{HealthSnapshot, Policy, PolicyUpdate};
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

type Control = State<Arc<ControlSurface>>;

/// POST /api/crawler/start
pub async fn start_loop(State(control): Control) -> Json<StartResponse> {
    Json(control.start_loop())
}

/// POST /api/crawler/stop
pub async fn stop_loop(State(control): Control) -> Json<StopResponse> {
    Json(control.stop_loop().await)
}

/// POST /api/crawler/test-cycle
pub async fn test_cycle(State(control): Control) -> Json<CycleReport> {
    Json(control.test_cycle().await)
}

/// GET /api/crawler/state
pub async fn get_health(State(control): Control) -> Json<HealthSnapshot> {
    Json(control.get_health())
}

/// GET /api/anti-crawl/strategy
pub async fn get_policy(State(control): Control) -> Json<Policy> {
    Json(control.get_policy())
}

/// POST /api/anti-crawl/strategy/update
pub async fn update_policy(
    State(control): Control,
    Json(update): Json<PolicyUpdate>,
) -> Json<Policy> {
    Json(control.update_policy(&update))
}

/// POST /api/anti-crawl/ip-pool/add
pub async fn add_identity(
    State(control): Control,
    Json(request): Json<AddIdentityRequest>,
) -> Result<Json<AddResponse>, ApiError> {
    Ok(Json(control.add_identity(&request).await?))
}

#[derive(Debug, Deserialize)]
pub struct RemoveQuery {
    #[serde(default, alias = "ip")]
    address: String,
}

/// POST /api/anti-crawl/ip-pool/remove?address=
pub async fn remove_identity(
    State(control): Control,
    Query(query): Query<RemoveQuery>,
) -> Result<Json<RemoveResponse>, ApiError> {
    Ok(Json(control.remove_identity(&query.address)?))
}

/// GET /api/anti-crawl/ip-pool
pub async fn get_pool_status(State(control): Control) -> Json<PoolStatus> {
    Json(control.get_pool_status())
}
