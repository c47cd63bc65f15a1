//! In-process `GameStore` for tests and `--memory` runs. Nothing survives a
//! restart.

use crate::{
    common::{money::Amount, traits::{BalanceCredit, GameStore}},
    errors::{GameError, StorageError, WingoResult},
    games::types::{
        Bet, BetId, BetStatus, NewBet, NewRound, NewUser, Round, RoundId, User, UserId,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    usernames: HashMap<String, UserId>,
    /// Ordered by id, which is also creation order
    rounds: Vec<Round>,
    bets: HashMap<BetId, Bet>,
    /// Bet ids in placement order
    bet_order: Vec<BetId>,
}

impl MemoryState {
    fn insert_bet(&mut self, fields: NewBet) -> Bet {
        let bet = Bet {
            id: Uuid::new_v4(),
            user_id: fields.user_id,
            round_id: fields.round_id,
            kind: fields.choice.kind(),
            value: fields.choice.value(),
            amount: fields.amount,
            payout: Amount::ZERO,
            status: BetStatus::Pending,
            created_at: Utc::now(),
        };
        self.bet_order.push(bet.id);
        self.bets.insert(bet.id, bet.clone());
        bet
    }

    fn pending_bet_mut(&mut self, id: &BetId) -> WingoResult<&mut Bet> {
        let bet = self
            .bets
            .get_mut(id)
            .ok_or_else(|| GameError::Persistence(StorageError::Missing(format!("bet {}", id))))?;
        if bet.status.is_terminal() {
            return Err(GameError::Persistence(StorageError::WriteFailed(format!(
                "bet {} already settled as {:?}",
                id, bet.status
            ))));
        }
        Ok(bet)
    }

    fn user_mut(&mut self, id: &UserId) -> WingoResult<&mut User> {
        self.users
            .get_mut(id)
            .ok_or_else(|| GameError::UserNotFound(id.to_string()))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn get_user(&self, id: &UserId) -> WingoResult<Option<User>> {
        Ok(self.state.read().await.users.get(id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> WingoResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .usernames
            .get(&username.to_lowercase())
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn create_user(&self, fields: NewUser) -> WingoResult<User> {
        let mut state = self.state.write().await;
        let key = fields.username.to_lowercase();
        if state.usernames.contains_key(&key) {
            return Err(GameError::DuplicateUser(fields.username));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: fields.username,
            balance: fields.balance,
            created_at: Utc::now(),
        };
        state.usernames.insert(key, user.id);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user_balance(&self, id: &UserId, new_balance: Amount) -> WingoResult<()> {
        self.state.write().await.user_mut(id)?.balance = new_balance;
        Ok(())
    }

    async fn create_round(&self, fields: NewRound) -> WingoResult<Round> {
        let mut state = self.state.write().await;
        let round = Round {
            id: state.rounds.last().map_or(1, |r| r.id + 1),
            period: fields.period,
            color: fields.outcome.color,
            number: fields.outcome.number,
            created_at: fields.created_at,
        };
        state.rounds.push(round.clone());
        Ok(round)
    }

    async fn get_current_round(&self) -> WingoResult<Option<Round>> {
        Ok(self.state.read().await.rounds.last().cloned())
    }

    async fn get_recent_rounds(&self, limit: usize) -> WingoResult<Vec<Round>> {
        Ok(self.state.read().await.rounds.iter().rev().take(limit).cloned().collect())
    }

    async fn create_bet(&self, fields: NewBet) -> WingoResult<Bet> {
        Ok(self.state.write().await.insert_bet(fields))
    }

    async fn get_bets_by_round_id(&self, round_id: RoundId) -> WingoResult<Vec<Bet>> {
        let state = self.state.read().await;
        Ok(state
            .bet_order
            .iter()
            .filter_map(|id| state.bets.get(id))
            .filter(|bet| bet.round_id == round_id)
            .cloned()
            .collect())
    }

    async fn update_bet_result(&self, id: &BetId, status: BetStatus, payout: Amount) -> WingoResult<()> {
        let mut state = self.state.write().await;
        let bet = state.pending_bet_mut(id)?;
        bet.status = status;
        bet.payout = payout;
        Ok(())
    }

    async fn get_bets_by_user_id(&self, user_id: &UserId, limit: usize) -> WingoResult<Vec<Bet>> {
        let state = self.state.read().await;
        Ok(state
            .bet_order
            .iter()
            .rev()
            .filter_map(|id| state.bets.get(id))
            .filter(|bet| &bet.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn record_bet(&self, fields: NewBet, new_balance: Amount) -> WingoResult<Bet> {
        let mut state = self.state.write().await;
        state.user_mut(&fields.user_id)?;
        let bet = state.insert_bet(fields);
        state.user_mut(&bet.user_id)?.balance = new_balance;
        Ok(bet)
    }

    async fn record_settlement(
        &self,
        bet_id: &BetId,
        status: BetStatus,
        payout: Amount,
        credit: Option<BalanceCredit>,
    ) -> WingoResult<()> {
        let mut state = self.state.write().await;
        state.pending_bet_mut(bet_id)?;
        if let Some(credit) = credit {
            state.user_mut(&credit.user_id)?;
        }

        let bet = state.pending_bet_mut(bet_id)?;
        bet.status = status;
        bet.payout = payout;
        if let Some(credit) = credit {
            state.user_mut(&credit.user_id)?.balance = credit.new_balance;
        }
        Ok(())
    }
}
