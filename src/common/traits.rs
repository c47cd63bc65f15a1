//! Shared traits and interfaces
//!
//! `GameStore` is the persistence seam between the round engine, the bet
//! ledger and the storage backends.

use crate::common::money::Amount;
use crate::errors::WingoResult;
use crate::games::types::{
    Bet, BetId, BetStatus, NewBet, NewRound, NewUser, Round, RoundId, User, UserId,
};
use async_trait::async_trait;

/// Balance credit applied together with a bet result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceCredit {
    pub user_id: UserId,
    pub new_balance: Amount,
}

/// CRUD over users, rounds and bets
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn get_user(&self, id: &UserId) -> WingoResult<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> WingoResult<Option<User>>;

    /// Fails with `DuplicateUser` when the username is taken
    async fn create_user(&self, fields: NewUser) -> WingoResult<User>;

    async fn update_user_balance(&self, id: &UserId, new_balance: Amount) -> WingoResult<()>;

    /// Assigns the next round id
    async fn create_round(&self, fields: NewRound) -> WingoResult<Round>;

    async fn get_current_round(&self) -> WingoResult<Option<Round>>;

    /// Newest first, at most `limit` rounds
    async fn get_recent_rounds(&self, limit: usize) -> WingoResult<Vec<Round>>;

    /// Creates a pending bet with zero payout
    async fn create_bet(&self, fields: NewBet) -> WingoResult<Bet>;

    async fn get_bets_by_round_id(&self, round_id: RoundId) -> WingoResult<Vec<Bet>>;

    async fn update_bet_result(&self, id: &BetId, status: BetStatus, payout: Amount) -> WingoResult<()>;

    /// Newest first, at most `limit` bets
    async fn get_bets_by_user_id(&self, user_id: &UserId, limit: usize) -> WingoResult<Vec<Bet>>;

    /// Persist a new bet and the owner's debited balance. Backends that can
    /// write both in one batch override this.
    async fn record_bet(&self, fields: NewBet, new_balance: Amount) -> WingoResult<Bet> {
        let user_id = fields.user_id;
        let bet = self.create_bet(fields).await?;
        self.update_user_balance(&user_id, new_balance).await?;
        Ok(bet)
    }

    /// Persist a bet result and, for winners, the owner's credited balance
    async fn record_settlement(
        &self,
        bet_id: &BetId,
        status: BetStatus,
        payout: Amount,
        credit: Option<BalanceCredit>,
    ) -> WingoResult<()> {
        self.update_bet_result(bet_id, status, payout).await?;
        if let Some(credit) = credit {
            self.update_user_balance(&credit.user_id, credit.new_balance).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{GameError, StorageError};
    use std::sync::Mutex;

    // Records call order to check the default composite methods
    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingStore {
        fn log(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }
    }

    #[async_trait]
    impl GameStore for RecordingStore {
        async fn get_user(&self, _id: &UserId) -> WingoResult<Option<User>> {
            Ok(None)
        }

        async fn get_user_by_username(&self, _username: &str) -> WingoResult<Option<User>> {
            Ok(None)
        }

        async fn create_user(&self, _fields: NewUser) -> WingoResult<User> {
            Err(GameError::Persistence(StorageError::WriteFailed("unsupported".into())))
        }

        async fn update_user_balance(&self, _id: &UserId, new_balance: Amount) -> WingoResult<()> {
            self.log(&format!("balance {}", new_balance));
            Ok(())
        }

        async fn create_round(&self, _fields: NewRound) -> WingoResult<Round> {
            Err(GameError::Persistence(StorageError::WriteFailed("unsupported".into())))
        }

        async fn get_current_round(&self) -> WingoResult<Option<Round>> {
            Ok(None)
        }

        async fn get_recent_rounds(&self, _limit: usize) -> WingoResult<Vec<Round>> {
            Ok(vec![])
        }

        async fn create_bet(&self, fields: NewBet) -> WingoResult<Bet> {
            self.log("create_bet");
            Ok(Bet {
                id: uuid::Uuid::new_v4(),
                user_id: fields.user_id,
                round_id: fields.round_id,
                kind: fields.choice.kind(),
                value: fields.choice.value(),
                amount: fields.amount,
                payout: Amount::ZERO,
                status: BetStatus::Pending,
                created_at: chrono::Utc::now(),
            })
        }

        async fn get_bets_by_round_id(&self, _round_id: RoundId) -> WingoResult<Vec<Bet>> {
            Ok(vec![])
        }

        async fn update_bet_result(&self, _id: &BetId, status: BetStatus, _payout: Amount) -> WingoResult<()> {
            self.log(&format!("result {:?}", status));
            Ok(())
        }

        async fn get_bets_by_user_id(&self, _user_id: &UserId, _limit: usize) -> WingoResult<Vec<Bet>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_default_composites_write_bet_then_balance() {
        use crate::games::types::{BetChoice, Color};

        let store = RecordingStore::default();
        let fields = NewBet {
            user_id: uuid::Uuid::new_v4(),
            round_id: 1,
            choice: BetChoice::Color(Color::Red),
            amount: Amount::from_cents(1000),
        };
        store.record_bet(fields, Amount::from_cents(4000)).await.unwrap();
        store
            .record_settlement(&uuid::Uuid::new_v4(), BetStatus::Lost, Amount::ZERO, None)
            .await
            .unwrap();

        let calls = store.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["create_bet", "balance 40.00", "result Lost"]);
    }
}
