//! Read-only views of rounds for pollers

use crate::{
    common::traits::GameStore,
    config::EngineConfig,
    errors::WingoResult,
    games::types::{Color, Round, RoundId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Current round as shown to clients. The drawn outcome is withheld until
/// the round is settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStatus {
    pub round_id: RoundId,
    pub period: String,
    pub opened_at: DateTime<Utc>,
    pub elapsed_secs: u64,
    /// Round length minus elapsed, floored at zero
    pub remaining_secs: u64,
    pub betting_open: bool,
}

/// A settled round with its revealed outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round_id: RoundId,
    pub period: String,
    pub color: Color,
    pub number: u8,
    pub opened_at: DateTime<Utc>,
}

impl From<Round> for RoundResult {
    fn from(round: Round) -> Self {
        Self {
            round_id: round.id,
            period: round.period,
            color: round.color,
            number: round.number,
            opened_at: round.created_at,
        }
    }
}

/// Whether `round` still accepts bets at `now`
pub fn betting_open(round: &Round, now: DateTime<Utc>, window: Duration) -> bool {
    let elapsed = now - round.created_at;
    match elapsed.to_std() {
        Ok(elapsed) => elapsed < window,
        // Clock went backwards relative to the round; treat as just opened
        Err(_) => !window.is_zero(),
    }
}

#[derive(Clone)]
pub struct RoundQueryService {
    store: Arc<dyn GameStore>,
    config: EngineConfig,
}

impl RoundQueryService {
    pub fn new(store: Arc<dyn GameStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub async fn get_current(&self) -> WingoResult<Option<Round>> {
        self.store.get_current_round().await
    }

    /// Most recent first, including the unsettled current round
    pub async fn get_recent(&self, limit: usize) -> WingoResult<Vec<Round>> {
        self.store.get_recent_rounds(limit).await
    }

    pub async fn current_status(&self, now: DateTime<Utc>) -> WingoResult<Option<RoundStatus>> {
        let Some(round) = self.get_current().await? else {
            return Ok(None);
        };

        let elapsed_secs = round.elapsed_secs(now);
        let interval_secs = self.config.round_interval().as_secs();
        Ok(Some(RoundStatus {
            round_id: round.id,
            betting_open: betting_open(&round, now, self.config.betting_window()),
            period: round.period,
            opened_at: round.created_at,
            elapsed_secs,
            remaining_secs: interval_secs.saturating_sub(elapsed_secs),
        }))
    }

    /// Settled rounds, most recent first. The current round is excluded
    /// because its outcome is not public yet.
    pub async fn settled_history(&self, limit: usize) -> WingoResult<Vec<RoundResult>> {
        let limit = limit.clamp(1, self.config.history_limit);
        let rounds = self.get_recent(limit + 1).await?;
        Ok(rounds.into_iter().skip(1).map(RoundResult::from).collect())
    }
}
