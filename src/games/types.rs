use crate::common::money::Amount;
use crate::errors::GameError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Rounds are numbered by the store in creation order
pub type RoundId = u64;
pub type UserId = Uuid;
pub type BetId = Uuid;

/// Round outcome color
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Green,
    Violet,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Violet => "violet",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Color {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(Color::Red),
            "green" => Ok(Color::Green),
            "violet" => Ok(Color::Violet),
            other => Err(GameError::InvalidBet(format!("unknown color '{}'", other))),
        }
    }
}

/// Color and number drawn for a round
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Outcome {
    pub color: Color,
    pub number: u8,
}

/// Persisted round. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Round {
    pub id: RoundId,
    /// Human-facing period label, e.g. `WG042`
    pub period: String,
    pub color: Color,
    pub number: u8,
    pub created_at: DateTime<Utc>,
}

impl Round {
    /// Whole seconds since the round opened, never negative
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((now - self.created_at).num_seconds()).unwrap_or(0)
    }
}

/// Fields supplied by the engine when opening a round
#[derive(Debug, Clone)]
pub struct NewRound {
    pub period: String,
    pub outcome: Outcome,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BetKind {
    Color,
    Number,
}

impl fmt::Display for BetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetKind::Color => write!(f, "color"),
            BetKind::Number => write!(f, "number"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Pending,
    Won,
    Lost,
}

impl BetStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BetStatus::Pending)
    }
}

/// Parsed bet target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetChoice {
    Color(Color),
    Number(u8),
}

impl BetChoice {
    /// Validate a raw kind/value pair from a placement request
    pub fn parse(kind: BetKind, value: &str) -> Result<Self, GameError> {
        match kind {
            BetKind::Color => value.parse().map(BetChoice::Color),
            BetKind::Number => {
                let number: u8 = value.trim().parse().map_err(|_| {
                    GameError::InvalidBet(format!("number bet value '{}' is not a digit", value))
                })?;
                if number > 9 {
                    return Err(GameError::InvalidBet(format!(
                        "number bet value {} is outside 0-9",
                        number
                    )));
                }
                Ok(BetChoice::Number(number))
            }
        }
    }

    pub fn kind(&self) -> BetKind {
        match self {
            BetChoice::Color(_) => BetKind::Color,
            BetChoice::Number(_) => BetKind::Number,
        }
    }

    /// Canonical stored form of the bet value
    pub fn value(&self) -> String {
        match self {
            BetChoice::Color(color) => color.to_string(),
            BetChoice::Number(number) => number.to_string(),
        }
    }
}

/// Persisted wager on a single round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bet {
    pub id: BetId,
    pub user_id: UserId,
    pub round_id: RoundId,
    pub kind: BetKind,
    pub value: String,
    pub amount: Amount,
    #[serde(default)]
    pub payout: Amount,
    pub status: BetStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by a placement request
#[derive(Debug, Clone)]
pub struct NewBet {
    pub user_id: UserId,
    pub round_id: RoundId,
    pub choice: BetChoice,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub balance: Amount,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub balance: Amount,
}
