//! Wingo - periodic color/number betting rounds
//!
//! A single engine task opens a round every interval with its outcome drawn
//! up front, and settles the previous round's bets on the same tick. Bet
//! placement runs concurrently on the request path; balance changes are
//! serialized per user by the [`ledger::Ledger`].
//!
//! Storage is pluggable behind [`common::GameStore`]: RocksDB for real
//! deployments, an in-memory map for tests.

pub mod api;
pub mod betting;
pub mod common;
pub mod config;
pub mod engine;
pub mod errors;
pub mod game_store;
pub mod games;
pub mod ledger;
pub mod memory_store;
pub mod metrics;
pub mod notifier;
pub mod query;
pub mod services;
pub mod storage;

pub use betting::{BettingService, PlaceBet, PlacedBet};
pub use common::{Amount, GameStore};
pub use config::{ConfigLoader, WingoConfig};
pub use engine::{RoundEngine, RoundGate, TickReport};
pub use errors::{GameError, WingoResult};
pub use game_store::RocksGameStore;
pub use memory_store::MemoryStore;
pub use notifier::{GameEvent, RoundNotifier};
pub use query::{RoundQueryService, RoundStatus};
pub use services::{GameContext, ServiceBuilder, ServiceContainer};
