//! Balance mutations serialized per user
//!
//! Every read-modify-write of a balance happens under that user's lock, so
//! a debit from placement and a credit from settlement cannot interleave.

use crate::{
    common::{money::Amount, traits::{BalanceCredit, GameStore}},
    errors::{GameError, WingoResult},
    games::{
        settlement::BetSettlement,
        types::{Bet, NewBet, User, UserId},
    },
};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct Ledger {
    store: Arc<dyn GameStore>,
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl Ledger {
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn GameStore> {
        &self.store
    }

    fn lock_for(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        self.locks
            .entry(*user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load_user(&self, user_id: &UserId) -> WingoResult<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| GameError::UserNotFound(user_id.to_string()))
    }

    /// Debit the wager and persist the bet. The balance check and both
    /// writes happen under the user's lock; nothing is written on failure.
    pub async fn place(&self, fields: NewBet) -> WingoResult<(Bet, Amount)> {
        let lock = self.lock_for(&fields.user_id);
        let _guard = lock.lock().await;

        let user = self.load_user(&fields.user_id).await?;
        let new_balance = user
            .balance
            .checked_sub(fields.amount)
            .ok_or(GameError::InsufficientBalance {
                required: fields.amount,
                available: user.balance,
            })?;

        let bet = self.store.record_bet(fields, new_balance).await?;
        Ok((bet, new_balance))
    }

    /// Record one bet result, crediting the payout to winners
    pub async fn settle(&self, settlement: &BetSettlement) -> WingoResult<()> {
        if !settlement.is_win() {
            return self
                .store
                .record_settlement(&settlement.bet_id, settlement.status, settlement.payout, None)
                .await;
        }

        let lock = self.lock_for(&settlement.user_id);
        let _guard = lock.lock().await;

        let user = self.load_user(&settlement.user_id).await?;
        let new_balance = user
            .balance
            .checked_add(settlement.payout)
            .ok_or_else(|| GameError::BalanceOverflow(user.id.to_string()))?;

        self.store
            .record_settlement(
                &settlement.bet_id,
                settlement.status,
                settlement.payout,
                Some(BalanceCredit {
                    user_id: user.id,
                    new_balance,
                }),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::types::{BetChoice, BetStatus, Color, NewUser};
    use crate::memory_store::MemoryStore;

    async fn ledger_with_user(cents: u64) -> (Ledger, User) {
        let store: Arc<dyn GameStore> = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser { username: "erin".into(), balance: Amount::from_cents(cents) })
            .await
            .unwrap();
        (Ledger::new(store), user)
    }

    fn wager(user_id: UserId, cents: u64) -> NewBet {
        NewBet {
            user_id,
            round_id: 1,
            choice: BetChoice::Color(Color::Red),
            amount: Amount::from_cents(cents),
        }
    }

    #[tokio::test]
    async fn test_place_debits_balance() {
        let (ledger, user) = ledger_with_user(5000).await;
        let (bet, balance) = ledger.place(wager(user.id, 1000)).await.unwrap();

        assert_eq!(balance, Amount::from_cents(4000));
        assert_eq!(bet.status, BetStatus::Pending);
        let stored = ledger.store().get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, Amount::from_cents(4000));
    }

    #[tokio::test]
    async fn test_insufficient_balance_leaves_state_untouched() {
        let (ledger, user) = ledger_with_user(5000).await;
        let err = ledger.place(wager(user.id, 6000)).await.unwrap_err();

        assert!(matches!(err, GameError::InsufficientBalance { .. }));
        let stored = ledger.store().get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, Amount::from_cents(5000));
        assert!(ledger.store().get_bets_by_user_id(&user.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let (ledger, _) = ledger_with_user(0).await;
        let err = ledger.place(wager(uuid::Uuid::new_v4(), 1)).await.unwrap_err();
        assert!(matches!(err, GameError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_debits_never_overdraw() {
        let (ledger, user) = ledger_with_user(5000).await;
        let ledger = Arc::new(ledger);
        let user_id = user.id;

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.place(wager(user_id, 4000)).await })
            })
            .collect();

        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }

        assert_eq!(ok, 1);
        let stored = ledger.store().get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, Amount::from_cents(1000));
    }

    #[tokio::test]
    async fn test_winning_settlement_credits_payout() {
        let (ledger, user) = ledger_with_user(5000).await;
        let (bet, _) = ledger.place(wager(user.id, 1000)).await.unwrap();

        ledger
            .settle(&BetSettlement {
                bet_id: bet.id,
                user_id: user.id,
                status: BetStatus::Won,
                payout: Amount::from_cents(1950),
            })
            .await
            .unwrap();

        let stored = ledger.store().get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, Amount::from_cents(5950));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_credit_and_debit_never_lose_an_update() {
        for _ in 0..50 {
            let (ledger, user) = ledger_with_user(5000).await;
            let ledger = Arc::new(ledger);
            let user_id = user.id;
            let (bet, _) = ledger.place(wager(user_id, 1000)).await.unwrap();

            let credit = {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    ledger
                        .settle(&BetSettlement {
                            bet_id: bet.id,
                            user_id,
                            status: BetStatus::Won,
                            payout: Amount::from_cents(1950),
                        })
                        .await
                })
            };
            let debit = {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.place(wager(user_id, 1000)).await })
            };
            credit.await.unwrap().unwrap();
            debit.await.unwrap().unwrap();

            let stored = ledger.store().get_user(&user_id).await.unwrap().unwrap();
            assert_eq!(stored.balance, Amount::from_cents(5000 - 1000 - 1000 + 1950));
        }
    }

    #[tokio::test]
    async fn test_overflowing_credit_is_rejected() {
        let (ledger, user) = ledger_with_user(u64::MAX - 500).await;
        let (bet, _) = ledger.place(wager(user.id, 1000)).await.unwrap();

        let err = ledger
            .settle(&BetSettlement {
                bet_id: bet.id,
                user_id: user.id,
                status: BetStatus::Won,
                payout: Amount::from_cents(1950),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, GameError::BalanceOverflow(_)));
        let stored = ledger.store().get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, Amount::from_cents(u64::MAX - 1500));
        let bets = ledger.store().get_bets_by_user_id(&user.id, 1).await.unwrap();
        assert_eq!(bets[0].status, BetStatus::Pending);
    }
}
