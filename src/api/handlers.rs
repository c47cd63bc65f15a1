//! Request Handlers

use super::{errors::ApiError, middleware::RequestId, models::*};
use crate::{
    betting::{BettingService, PlaceBet, PlacedBet},
    engine::RoundEngine,
    errors::GameError,
    games::types::UserId,
    metrics::GameMetrics,
    notifier::RoundNotifier,
    query::RoundQueryService,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use std::sync::Arc;

const DEFAULT_BET_LIMIT: usize = 20;
const MAX_BET_LIMIT: usize = 100;

/// Shared application state
pub struct AppState {
    pub betting: Arc<BettingService>,
    pub query: Arc<RoundQueryService>,
    pub engine: Arc<RoundEngine>,
    pub notifier: RoundNotifier,
    pub metrics: Arc<GameMetrics>,
    pub history_limit: usize,
    pub version: String,
}

/// Unwrap a JSON body, reporting a malformed one through `invalid`
fn json_body<T>(
    request_id: &RequestId,
    payload: Result<Json<T>, JsonRejection>,
    invalid: fn(String) -> GameError,
) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::from_game(request_id.0.clone(), invalid(rejection.body_text())))
}

/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
        version: state.version.clone(),
        engine_running: state.engine.is_running(),
        websocket_clients: super::websocket::client_count(),
    })
}

/// GET /api/round/current
pub async fn current_round_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<CurrentRoundResponse>, ApiError> {
    let now = Utc::now();
    let round = state
        .query
        .current_status(now)
        .await
        .map_err(|e| ApiError::from_game(request_id.0, e))?;

    Ok(Json(CurrentRoundResponse {
        server_time: now,
        round,
    }))
}

/// GET /api/round/history?limit={n}
pub async fn round_history_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<RoundHistoryResponse>, ApiError> {
    let limit = params.limit.unwrap_or(state.history_limit);
    let rounds = state
        .query
        .settled_history(limit)
        .await
        .map_err(|e| ApiError::from_game(request_id.0, e))?;

    Ok(Json(RoundHistoryResponse { rounds }))
}

/// POST /api/users
pub async fn register_user_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let body = json_body(&request_id, payload, GameError::InvalidUsername)?;
    let user = state
        .betting
        .register_user(&body.username)
        .await
        .map_err(|e| ApiError::from_game(request_id.0, e))?;

    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

/// GET /api/users/:id
pub async fn get_user_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .betting
        .get_user(&user_id)
        .await
        .map_err(|e| ApiError::from_game(request_id.0, e))?;

    Ok(Json(UserResponse { user }))
}

/// GET /api/users/:id/bets?limit={n}
pub async fn user_bets_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<UserBetsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_BET_LIMIT).clamp(1, MAX_BET_LIMIT);
    let bets = state
        .betting
        .user_bets(&user_id, limit)
        .await
        .map_err(|e| ApiError::from_game(request_id.0, e))?;

    Ok(Json(UserBetsResponse { bets }))
}

/// POST /api/bets
pub async fn place_bet_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PlaceBet>, JsonRejection>,
) -> Result<(StatusCode, Json<PlacedBet>), ApiError> {
    let body = json_body(&request_id, payload, GameError::InvalidBet)?;
    let placed = state
        .betting
        .place_bet(body)
        .await
        .map_err(|e| ApiError::from_game(request_id.0, e))?;

    Ok((StatusCode::CREATED, Json(placed)))
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus_format(),
    )
}
