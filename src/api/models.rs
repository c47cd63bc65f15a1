//! API Request and Response Models

use crate::{
    games::types::{Bet, User},
    query::{RoundResult, RoundStatus},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub engine_running: bool,
    pub websocket_clients: u64,
}

/// GET /api/round/current. `round` is absent before the first tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentRoundResponse {
    pub server_time: DateTime<Utc>,
    pub round: Option<RoundStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundHistoryResponse {
    pub rounds: Vec<RoundResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    #[serde(flatten)]
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBetsResponse {
    pub bets: Vec<Bet>,
}

/// `?limit=` on list endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}
