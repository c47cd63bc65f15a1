//! User registration and bet placement

use crate::{
    common::{money::Amount, traits::GameStore},
    config::{EngineConfig, WalletConfig},
    engine::RoundGate,
    errors::{GameError, WingoResult},
    games::types::{Bet, BetChoice, BetKind, NewBet, NewUser, User, UserId},
    ledger::Ledger,
    metrics::GameMetrics,
    query::betting_open,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

const MAX_USERNAME_LEN: usize = 32;

/// Placement request as received from a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBet {
    pub user_id: UserId,
    pub kind: BetKind,
    pub value: String,
    pub amount: Amount,
    /// Period the client thinks is open; rejected if it has moved on
    #[serde(default)]
    pub period: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedBet {
    pub bet: Bet,
    pub period: String,
    pub balance: Amount,
}

pub struct BettingService {
    store: Arc<dyn GameStore>,
    ledger: Arc<Ledger>,
    gate: Arc<RoundGate>,
    metrics: Arc<GameMetrics>,
    engine: EngineConfig,
    wallet: WalletConfig,
}

impl BettingService {
    pub fn new(
        ledger: Arc<Ledger>,
        gate: Arc<RoundGate>,
        metrics: Arc<GameMetrics>,
        engine: EngineConfig,
        wallet: WalletConfig,
    ) -> Self {
        Self {
            store: ledger.store().clone(),
            ledger,
            gate,
            metrics,
            engine,
            wallet,
        }
    }

    pub async fn register_user(&self, username: &str) -> WingoResult<User> {
        let username = username.trim();
        if username.is_empty() || username.len() > MAX_USERNAME_LEN {
            return Err(GameError::InvalidUsername(format!(
                "must be 1-{} characters",
                MAX_USERNAME_LEN
            )));
        }

        let user = self
            .store
            .create_user(NewUser {
                username: username.to_string(),
                balance: self.wallet.starting_balance,
            })
            .await?;
        info!(user_id = %user.id, username = %user.username, balance = %user.balance, "User registered");
        Ok(user)
    }

    pub async fn get_user(&self, id: &UserId) -> WingoResult<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| GameError::UserNotFound(id.to_string()))
    }

    pub async fn user_bets(&self, id: &UserId, limit: usize) -> WingoResult<Vec<Bet>> {
        self.get_user(id).await?;
        self.store.get_bets_by_user_id(id, limit).await
    }

    /// Validate and record a wager against the current round, debiting the
    /// user's balance. On any error nothing is written.
    pub async fn place_bet(&self, request: PlaceBet) -> WingoResult<PlacedBet> {
        match self.try_place(request).await {
            Ok(placed) => {
                self.metrics.record_bet_placed(placed.bet.amount);
                info!(
                    bet_id = %placed.bet.id,
                    user_id = %placed.bet.user_id,
                    period = %placed.period,
                    kind = %placed.bet.kind,
                    value = %placed.bet.value,
                    amount = %placed.bet.amount,
                    "Bet placed"
                );
                Ok(placed)
            }
            Err(e) => {
                self.metrics.record_bet_rejected();
                debug!("Bet rejected: {}", e);
                Err(e)
            }
        }
    }

    async fn try_place(&self, request: PlaceBet) -> WingoResult<PlacedBet> {
        if request.amount.is_zero() {
            return Err(GameError::InvalidBet("amount must be positive".to_string()));
        }
        let choice = BetChoice::parse(request.kind, &request.value)?;

        let _gate = self.gate.enter_placement().await;

        let round = self
            .store
            .get_current_round()
            .await?
            .ok_or(GameError::NoActiveRound)?;
        if request.period.as_deref().is_some_and(|period| period != round.period) {
            return Err(GameError::NoActiveRound);
        }
        if !betting_open(&round, Utc::now(), self.engine.betting_window()) {
            return Err(GameError::NoActiveRound);
        }

        let (bet, balance) = self
            .ledger
            .place(NewBet {
                user_id: request.user_id,
                round_id: round.id,
                choice,
                amount: request.amount,
            })
            .await?;

        Ok(PlacedBet {
            bet,
            period: round.period,
            balance,
        })
    }
}
