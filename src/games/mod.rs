pub mod types;
pub mod outcome;
pub mod sequencer;
pub mod settlement;

pub use types::*;
pub use outcome::{OutcomeGenerator, OutcomeSource};
pub use sequencer::PeriodSequencer;
pub use settlement::{settle, BetSettlement, SettlementSummary};
