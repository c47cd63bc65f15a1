//! Common utilities and shared functionality
//!
//! Money representation and the persistence interface used across the crate.

pub mod money;
pub mod traits;

pub use money::Amount;
pub use traits::{BalanceCredit, GameStore};
