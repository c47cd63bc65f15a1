//! Persistent users, rounds and bets stored in RocksDB.
//!
//! Values are JSON. Secondary indexes are empty-valued keys whose layout
//! gives the scan order: rounds newest-first via an inverted id, bets by
//! round, and bets by user newest-first via an inverted timestamp.

use crate::{
    common::{money::Amount, traits::{BalanceCredit, GameStore}},
    errors::{GameError, StorageError, WingoResult},
    games::types::{
        Bet, BetId, BetStatus, NewBet, NewRound, NewUser, Round, RoundId, User, UserId,
    },
    storage::OptimizedStorage,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

const USER_PREFIX: &[u8] = b"user:id:";
const USERNAME_PREFIX: &[u8] = b"user:name:";
const ROUND_PREFIX: &[u8] = b"round:id:";
const RECENT_ROUNDS_PREFIX: &[u8] = b"round:index:recent:";
const BET_PREFIX: &[u8] = b"bet:id:";
const BET_ROUND_INDEX_PREFIX: &[u8] = b"bet:index:round:";
const BET_USER_INDEX_PREFIX: &[u8] = b"bet:index:user:";

fn user_key(id: &UserId) -> Vec<u8> {
    [USER_PREFIX, id.as_bytes()].concat()
}

fn username_key(username: &str) -> Vec<u8> {
    [USERNAME_PREFIX, username.to_lowercase().as_bytes()].concat()
}

fn round_key(id: RoundId) -> Vec<u8> {
    [ROUND_PREFIX, &id.to_be_bytes()[..]].concat()
}

fn recent_round_index_key(id: RoundId) -> Vec<u8> {
    // Sort newest-first by using an inverted id.
    // Key layout: prefix | inv_id(be)
    let inv_id = u64::MAX - id;
    [RECENT_ROUNDS_PREFIX, &inv_id.to_be_bytes()[..]].concat()
}

fn bet_key(id: &BetId) -> Vec<u8> {
    [BET_PREFIX, id.as_bytes()].concat()
}

fn bet_round_index_key(round_id: RoundId, bet_id: &BetId) -> Vec<u8> {
    [BET_ROUND_INDEX_PREFIX, &round_id.to_be_bytes()[..], bet_id.as_bytes()].concat()
}

fn bet_user_index_key(bet: &Bet) -> Vec<u8> {
    // Key layout: prefix | user_id | inv_created_ms(be) | bet_id
    let created_ms = u64::try_from(bet.created_at.timestamp_millis()).unwrap_or(0);
    let inv_created = u64::MAX - created_ms;
    [
        BET_USER_INDEX_PREFIX,
        bet.user_id.as_bytes(),
        &inv_created.to_be_bytes()[..],
        bet.id.as_bytes(),
    ]
    .concat()
}

/// Trailing 16 bytes of an index key as a uuid
fn trailing_uuid(key: &[u8]) -> Option<Uuid> {
    let start = key.len().checked_sub(16)?;
    Uuid::from_slice(&key[start..]).ok()
}

fn encode<T: Serialize>(what: &str, value: &T) -> WingoResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        GameError::Persistence(StorageError::WriteFailed(format!("Failed to encode {}: {}", what, e)))
    })
}

fn decode<T: DeserializeOwned>(what: &str, bytes: &[u8]) -> WingoResult<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        GameError::Persistence(StorageError::CorruptedData(format!("Failed to decode {}: {}", what, e)))
    })
}

fn read_failed(e: rocksdb::Error) -> GameError {
    GameError::Persistence(StorageError::ReadFailed(e.to_string()))
}

fn write_failed(e: rocksdb::Error) -> GameError {
    GameError::Persistence(StorageError::WriteFailed(e.to_string()))
}

/// `GameStore` backed by RocksDB
pub struct RocksGameStore {
    storage: Arc<OptimizedStorage>,
    /// Serializes username reservation and round id allocation
    write_guard: Mutex<()>,
}

impl RocksGameStore {
    pub fn new(storage: Arc<OptimizedStorage>) -> Self {
        Self {
            storage,
            write_guard: Mutex::new(()),
        }
    }

    fn load<T: DeserializeOwned>(&self, what: &str, key: &[u8]) -> WingoResult<Option<T>> {
        match self.storage.get(key).map_err(read_failed)? {
            Some(bytes) => decode(what, &bytes).map(Some),
            None => Ok(None),
        }
    }

    fn load_round(&self, id: RoundId) -> WingoResult<Option<Round>> {
        self.load(&format!("round {}", id), &round_key(id))
    }

    fn load_bet(&self, id: &BetId) -> WingoResult<Option<Bet>> {
        self.load(&format!("bet {}", id), &bet_key(id))
    }

    fn require_user(&self, id: &UserId) -> WingoResult<User> {
        self.load(&format!("user {}", id), &user_key(id))?
            .ok_or_else(|| GameError::UserNotFound(id.to_string()))
    }

    fn require_pending_bet(&self, id: &BetId) -> WingoResult<Bet> {
        let bet = self
            .load_bet(id)?
            .ok_or_else(|| GameError::Persistence(StorageError::Missing(format!("bet {}", id))))?;
        if bet.status.is_terminal() {
            return Err(GameError::Persistence(StorageError::WriteFailed(format!(
                "bet {} already settled as {:?}",
                id, bet.status
            ))));
        }
        Ok(bet)
    }

    fn latest_round_id(&self) -> WingoResult<Option<RoundId>> {
        let rows = self
            .storage
            .scan_prefix(RECENT_ROUNDS_PREFIX, 1)
            .map_err(read_failed)?;
        Ok(rows.first().and_then(|(key, _)| {
            let start = key.len().checked_sub(8)?;
            let inv: [u8; 8] = key[start..].try_into().ok()?;
            Some(u64::MAX - u64::from_be_bytes(inv))
        }))
    }

    fn new_bet_row(fields: NewBet) -> Bet {
        Bet {
            id: Uuid::new_v4(),
            user_id: fields.user_id,
            round_id: fields.round_id,
            kind: fields.choice.kind(),
            value: fields.choice.value(),
            amount: fields.amount,
            payout: Amount::ZERO,
            status: BetStatus::Pending,
            created_at: Utc::now(),
        }
    }

    fn bet_rows(bet: &Bet) -> WingoResult<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(vec![
            (bet_key(&bet.id), encode("bet", bet)?),
            (bet_round_index_key(bet.round_id, &bet.id), Vec::new()),
            (bet_user_index_key(bet), Vec::new()),
        ])
    }

    fn bets_from_index(&self, rows: Vec<(Vec<u8>, Vec<u8>)>) -> WingoResult<Vec<Bet>> {
        let mut bets = Vec::with_capacity(rows.len());
        for (key, _) in rows {
            let Some(bet_id) = trailing_uuid(&key) else {
                tracing::warn!("Skipping malformed bet index key {:?}", key);
                continue;
            };
            match self.load_bet(&bet_id)? {
                Some(bet) => bets.push(bet),
                None => tracing::warn!(%bet_id, "Bet index points at a missing bet"),
            }
        }
        Ok(bets)
    }
}

#[async_trait]
impl GameStore for RocksGameStore {
    async fn get_user(&self, id: &UserId) -> WingoResult<Option<User>> {
        self.load(&format!("user {}", id), &user_key(id))
    }

    async fn get_user_by_username(&self, username: &str) -> WingoResult<Option<User>> {
        let Some(id_bytes) = self.storage.get(&username_key(username)).map_err(read_failed)? else {
            return Ok(None);
        };
        let id = Uuid::from_slice(&id_bytes).map_err(|e| {
            GameError::Persistence(StorageError::CorruptedData(format!(
                "Bad username index for '{}': {}",
                username, e
            )))
        })?;
        self.get_user(&id).await
    }

    async fn create_user(&self, fields: NewUser) -> WingoResult<User> {
        let _guard = self.write_guard.lock().await;

        let name_key = username_key(&fields.username);
        if self.storage.get(&name_key).map_err(read_failed)?.is_some() {
            return Err(GameError::DuplicateUser(fields.username));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: fields.username,
            balance: fields.balance,
            created_at: Utc::now(),
        };
        self.storage
            .batch_write(&[
                (user_key(&user.id), encode("user", &user)?),
                (name_key, user.id.as_bytes().to_vec()),
            ])
            .map_err(write_failed)?;

        Ok(user)
    }

    async fn update_user_balance(&self, id: &UserId, new_balance: Amount) -> WingoResult<()> {
        let mut user = self.require_user(id)?;
        user.balance = new_balance;
        self.storage
            .put(&user_key(id), &encode("user", &user)?)
            .map_err(write_failed)
    }

    async fn create_round(&self, fields: NewRound) -> WingoResult<Round> {
        let _guard = self.write_guard.lock().await;

        let id = self.latest_round_id()?.map_or(1, |latest| latest + 1);
        let round = Round {
            id,
            period: fields.period,
            color: fields.outcome.color,
            number: fields.outcome.number,
            created_at: fields.created_at,
        };
        self.storage
            .batch_write(&[
                (round_key(id), encode("round", &round)?),
                (recent_round_index_key(id), Vec::new()),
            ])
            .map_err(write_failed)?;

        Ok(round)
    }

    async fn get_current_round(&self) -> WingoResult<Option<Round>> {
        match self.latest_round_id()? {
            Some(id) => self.load_round(id),
            None => Ok(None),
        }
    }

    async fn get_recent_rounds(&self, limit: usize) -> WingoResult<Vec<Round>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let rows = self
            .storage
            .scan_prefix(RECENT_ROUNDS_PREFIX, limit)
            .map_err(read_failed)?;

        let mut rounds = Vec::with_capacity(rows.len());
        for (key, _) in rows {
            let Some(inv) = key
                .len()
                .checked_sub(8)
                .and_then(|start| <[u8; 8]>::try_from(&key[start..]).ok())
            else {
                continue;
            };
            let id = u64::MAX - u64::from_be_bytes(inv);
            match self.load_round(id)? {
                Some(round) => rounds.push(round),
                None => tracing::warn!(round_id = id, "Recent index points at a missing round"),
            }
        }
        Ok(rounds)
    }

    async fn create_bet(&self, fields: NewBet) -> WingoResult<Bet> {
        let bet = Self::new_bet_row(fields);
        self.storage
            .batch_write(&Self::bet_rows(&bet)?)
            .map_err(write_failed)?;
        Ok(bet)
    }

    async fn get_bets_by_round_id(&self, round_id: RoundId) -> WingoResult<Vec<Bet>> {
        let prefix = [BET_ROUND_INDEX_PREFIX, &round_id.to_be_bytes()[..]].concat();
        let rows = self
            .storage
            .scan_prefix(&prefix, usize::MAX)
            .map_err(read_failed)?;
        self.bets_from_index(rows)
    }

    async fn update_bet_result(&self, id: &BetId, status: BetStatus, payout: Amount) -> WingoResult<()> {
        let mut bet = self.require_pending_bet(id)?;
        bet.status = status;
        bet.payout = payout;
        self.storage
            .put(&bet_key(id), &encode("bet", &bet)?)
            .map_err(write_failed)
    }

    async fn get_bets_by_user_id(&self, user_id: &UserId, limit: usize) -> WingoResult<Vec<Bet>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let prefix = [BET_USER_INDEX_PREFIX, user_id.as_bytes()].concat();
        let rows = self
            .storage
            .scan_prefix(&prefix, limit)
            .map_err(read_failed)?;
        self.bets_from_index(rows)
    }

    async fn record_bet(&self, fields: NewBet, new_balance: Amount) -> WingoResult<Bet> {
        let mut user = self.require_user(&fields.user_id)?;
        user.balance = new_balance;

        let bet = Self::new_bet_row(fields);
        let mut items = Self::bet_rows(&bet)?;
        items.push((user_key(&user.id), encode("user", &user)?));

        self.storage.batch_write(&items).map_err(write_failed)?;
        Ok(bet)
    }

    async fn record_settlement(
        &self,
        bet_id: &BetId,
        status: BetStatus,
        payout: Amount,
        credit: Option<BalanceCredit>,
    ) -> WingoResult<()> {
        let mut bet = self.require_pending_bet(bet_id)?;
        bet.status = status;
        bet.payout = payout;

        let mut items = vec![(bet_key(bet_id), encode("bet", &bet)?)];
        if let Some(credit) = credit {
            let mut user = self.require_user(&credit.user_id)?;
            user.balance = credit.new_balance;
            items.push((user_key(&user.id), encode("user", &user)?));
        }

        self.storage.batch_write(&items).map_err(write_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::types::{BetChoice, Color, Outcome};
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> RocksGameStore {
        let storage = Arc::new(OptimizedStorage::new(dir.path()).unwrap());
        RocksGameStore::new(storage)
    }

    fn new_round(period: &str) -> NewRound {
        NewRound {
            period: period.to_string(),
            outcome: Outcome { color: Color::Green, number: 3 },
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_rounds_are_numbered_and_listed_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        assert!(store.get_current_round().await.unwrap().is_none());

        for period in ["WG001", "WG002", "WG003"] {
            store.create_round(new_round(period)).await.unwrap();
        }

        let current = store.get_current_round().await.unwrap().unwrap();
        assert_eq!(current.id, 3);
        assert_eq!(current.period, "WG003");

        let recent = store.get_recent_rounds(2).await.unwrap();
        let ids: Vec<RoundId> = recent.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[tokio::test]
    async fn test_usernames_are_unique() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let alice = store
            .create_user(NewUser { username: "alice".into(), balance: Amount::from_cents(100) })
            .await
            .unwrap();
        let duplicate = store
            .create_user(NewUser { username: "Alice".into(), balance: Amount::ZERO })
            .await;

        assert!(matches!(duplicate, Err(GameError::DuplicateUser(_))));
        let found = store.get_user_by_username("ALICE").await.unwrap().unwrap();
        assert_eq!(found.id, alice.id);
    }

    #[tokio::test]
    async fn test_record_bet_and_settlement_are_batched() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let user = store
            .create_user(NewUser { username: "bob".into(), balance: Amount::from_cents(5000) })
            .await
            .unwrap();
        let round = store.create_round(new_round("WG001")).await.unwrap();

        let bet = store
            .record_bet(
                NewBet {
                    user_id: user.id,
                    round_id: round.id,
                    choice: BetChoice::Color(Color::Green),
                    amount: Amount::from_cents(1000),
                },
                Amount::from_cents(4000),
            )
            .await
            .unwrap();

        assert_eq!(store.get_user(&user.id).await.unwrap().unwrap().balance, Amount::from_cents(4000));
        assert_eq!(store.get_bets_by_round_id(round.id).await.unwrap(), vec![bet.clone()]);
        assert_eq!(store.get_bets_by_user_id(&user.id, 10).await.unwrap().len(), 1);

        store
            .record_settlement(
                &bet.id,
                BetStatus::Won,
                Amount::from_cents(1950),
                Some(BalanceCredit { user_id: user.id, new_balance: Amount::from_cents(5950) }),
            )
            .await
            .unwrap();

        let settled = store.get_bets_by_round_id(round.id).await.unwrap();
        assert_eq!(settled[0].status, BetStatus::Won);
        assert_eq!(settled[0].payout, Amount::from_cents(1950));
        assert_eq!(store.get_user(&user.id).await.unwrap().unwrap().balance, Amount::from_cents(5950));

        // A bet result is written exactly once
        let again = store.update_bet_result(&bet.id, BetStatus::Lost, Amount::ZERO).await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn test_user_bets_newest_first_with_limit() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let user = store
            .create_user(NewUser { username: "carol".into(), balance: Amount::from_cents(10_000) })
            .await
            .unwrap();
        let round = store.create_round(new_round("WG001")).await.unwrap();

        let mut placed = Vec::new();
        for digit in 0..3u8 {
            let bet = store
                .create_bet(NewBet {
                    user_id: user.id,
                    round_id: round.id,
                    choice: BetChoice::Number(digit),
                    amount: Amount::from_cents(100),
                })
                .await
                .unwrap();
            placed.push(bet);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let bets = store.get_bets_by_user_id(&user.id, 2).await.unwrap();
        assert_eq!(bets.len(), 2);
        assert_eq!(bets[0].id, placed[2].id);
        assert_eq!(bets[1].id, placed[1].id);
    }
}
