//! Round lifecycle events fanned out to WebSocket clients and tests

use crate::common::money::Amount;
use crate::games::types::{Color, Round, RoundId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A new round started accepting bets. The outcome is not included.
    RoundOpened {
        round_id: RoundId,
        period: String,
        opened_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
    },

    RoundSettled {
        round_id: RoundId,
        period: String,
        color: Color,
        number: u8,
        bets_settled: usize,
        winners: usize,
        total_payout: Amount,
    },

    Heartbeat { timestamp: DateTime<Utc> },
}

impl GameEvent {
    pub fn round_opened(round: &Round, betting_window: std::time::Duration) -> Self {
        let window = chrono::Duration::from_std(betting_window).unwrap_or_else(|_| chrono::Duration::zero());
        GameEvent::RoundOpened {
            round_id: round.id,
            period: round.period.clone(),
            opened_at: round.created_at,
            closes_at: round.created_at + window,
        }
    }
}

#[derive(Clone)]
pub struct RoundNotifier {
    tx: broadcast::Sender<GameEvent>,
}

impl Default for RoundNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

impl RoundNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn publish(&self, event: GameEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!("No subscribers for round event: {:?}", e.0);
        }
    }
}
