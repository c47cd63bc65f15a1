//! Error types for the Wingo round engine
//!
//! Placement errors surface to callers synchronously; storage errors are
//! wrapped as `Persistence` so the engine can log and skip a failed tick.

use crate::common::money::Amount;
use thiserror::Error;

/// Root error type for all game operations
#[derive(Debug, Error)]
pub enum GameError {
    /// A bet arrived while no round was accepting wagers
    #[error("No active round is accepting bets")]
    NoActiveRound,

    #[error("Insufficient balance: wager {required}, available {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Username already registered: {0}")]
    DuplicateUser(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// Malformed bet kind, value or amount
    #[error("Invalid bet: {0}")]
    InvalidBet(String),

    /// Crediting a payout would exceed the representable balance
    #[error("Balance overflow crediting user {0}")]
    BalanceOverflow(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Storage system errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database open failed: {0}")]
    DatabaseOpenFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Corrupted data: {0}")]
    CorruptedData(String),

    #[error("Record not found: {0}")]
    Missing(String),
}

/// Configuration and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

impl GameError {
    /// True for errors raised by the storage layer rather than by validation
    pub fn is_persistence(&self) -> bool {
        matches!(self, GameError::Persistence(_))
    }
}

// Convenience type alias for Results
pub type WingoResult<T> = Result<T, GameError>;
