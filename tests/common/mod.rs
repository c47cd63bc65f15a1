#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wingo::{
    common::traits::BalanceCredit,
    config::WingoConfig,
    games::{
        types::{
            Bet, BetId, BetStatus, Color, NewBet, NewRound, NewUser, Outcome, Round, RoundId, User,
            UserId,
        },
        OutcomeSource,
    },
    errors::{GameError, StorageError, WingoResult},
    Amount, GameStore, MemoryStore,
};

pub fn outcome(color: Color, number: u8) -> Outcome {
    Outcome { color, number }
}

/// Hands out queued outcomes, then red 2 forever
#[derive(Clone, Default)]
pub struct ScriptedOutcomes {
    queue: Arc<Mutex<VecDeque<Outcome>>>,
}

impl ScriptedOutcomes {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::from(outcomes))),
        }
    }

    pub fn boxed(outcomes: Vec<Outcome>) -> Box<dyn OutcomeSource> {
        Box::new(Self::new(outcomes))
    }
}

impl OutcomeSource for ScriptedOutcomes {
    fn next_outcome(&mut self) -> Outcome {
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(outcome(Color::Red, 2))
    }
}

pub fn test_config(starting_cents: u64) -> WingoConfig {
    let mut config = WingoConfig::default();
    config.wallet.starting_balance = Amount::from_cents(starting_cents);
    config
}

fn injected(what: &str) -> GameError {
    GameError::Persistence(StorageError::WriteFailed(format!("injected {} failure", what)))
}

/// MemoryStore wrapper whose writes can be made to fail
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    pub fail_round_creates: AtomicUsize,
    pub fail_settlements: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameStore for FlakyStore {
    async fn get_user(&self, id: &UserId) -> WingoResult<Option<User>> {
        self.inner.get_user(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> WingoResult<Option<User>> {
        self.inner.get_user_by_username(username).await
    }

    async fn create_user(&self, fields: NewUser) -> WingoResult<User> {
        self.inner.create_user(fields).await
    }

    async fn update_user_balance(&self, id: &UserId, new_balance: Amount) -> WingoResult<()> {
        self.inner.update_user_balance(id, new_balance).await
    }

    async fn create_round(&self, fields: NewRound) -> WingoResult<Round> {
        let remaining = self.fail_round_creates.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_round_creates.store(remaining - 1, Ordering::SeqCst);
            return Err(injected("round create"));
        }
        self.inner.create_round(fields).await
    }

    async fn get_current_round(&self) -> WingoResult<Option<Round>> {
        self.inner.get_current_round().await
    }

    async fn get_recent_rounds(&self, limit: usize) -> WingoResult<Vec<Round>> {
        self.inner.get_recent_rounds(limit).await
    }

    async fn create_bet(&self, fields: NewBet) -> WingoResult<Bet> {
        self.inner.create_bet(fields).await
    }

    async fn get_bets_by_round_id(&self, round_id: RoundId) -> WingoResult<Vec<Bet>> {
        self.inner.get_bets_by_round_id(round_id).await
    }

    async fn update_bet_result(&self, id: &BetId, status: BetStatus, payout: Amount) -> WingoResult<()> {
        if self.fail_settlements.load(Ordering::SeqCst) {
            return Err(injected("settlement"));
        }
        self.inner.update_bet_result(id, status, payout).await
    }

    async fn get_bets_by_user_id(&self, user_id: &UserId, limit: usize) -> WingoResult<Vec<Bet>> {
        self.inner.get_bets_by_user_id(user_id, limit).await
    }

    async fn record_bet(&self, fields: NewBet, new_balance: Amount) -> WingoResult<Bet> {
        self.inner.record_bet(fields, new_balance).await
    }

    async fn record_settlement(
        &self,
        bet_id: &BetId,
        status: BetStatus,
        payout: Amount,
        credit: Option<BalanceCredit>,
    ) -> WingoResult<()> {
        if self.fail_settlements.load(Ordering::SeqCst) {
            return Err(injected("settlement"));
        }
        self.inner.record_settlement(bet_id, status, payout, credit).await
    }
}
