//! Route Definitions

use super::{handlers::*, websocket::websocket_handler};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Round state for pollers
        .route("/api/round/current", get(current_round_handler))
        .route("/api/round/history", get(round_history_handler))
        // Users and wagers
        .route("/api/users", post(register_user_handler))
        .route("/api/users/:id", get(get_user_handler))
        .route("/api/users/:id/bets", get(user_bets_handler))
        .route("/api/bets", post(place_bet_handler))
        .route("/ws", get(websocket_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
