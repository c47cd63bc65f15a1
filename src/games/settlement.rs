//! Settlement calculator
//!
//! Pure win/loss and payout computation for the bets on a closed round. The
//! round engine persists the results and credits balances.

use crate::common::money::Amount;
use crate::games::types::{Bet, BetChoice, BetId, BetKind, BetStatus, Color, Round, UserId};
use serde::{Deserialize, Serialize};

/// Payout factors in hundredths
pub const COLOR_MULTIPLIER: u64 = 195;
pub const VIOLET_MULTIPLIER: u64 = 450;
pub const NUMBER_MULTIPLIER: u64 = 900;

/// Result for a single bet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetSettlement {
    pub bet_id: BetId,
    pub user_id: UserId,
    pub status: BetStatus,
    pub payout: Amount,
}

impl BetSettlement {
    pub fn is_win(&self) -> bool {
        self.status == BetStatus::Won
    }
}

/// Aggregate of a round's settlement, used for logs and notifications
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub bets_settled: usize,
    pub winners: usize,
    pub total_wagered: Amount,
    pub total_payout: Amount,
}

/// Compute the outcome of every pending bet on `round`. Bets that already
/// carry a terminal status are skipped.
pub fn settle(round: &Round, bets: &[Bet]) -> Vec<BetSettlement> {
    bets.iter()
        .filter(|bet| bet.round_id == round.id && bet.status == BetStatus::Pending)
        .map(|bet| settle_bet(round, bet))
        .collect()
}

fn settle_bet(round: &Round, bet: &Bet) -> BetSettlement {
    let multiplier = winning_multiplier(round, bet);
    let (status, payout) = match multiplier {
        Some(factor) => (BetStatus::Won, bet.amount.times_hundredths(factor)),
        None => (BetStatus::Lost, Amount::ZERO),
    };

    BetSettlement {
        bet_id: bet.id,
        user_id: bet.user_id,
        status,
        payout,
    }
}

/// Payout factor when the bet wins, `None` when it loses. A stored value that
/// no longer parses is treated as a loss.
fn winning_multiplier(round: &Round, bet: &Bet) -> Option<u64> {
    let hit = match BetChoice::parse(bet.kind, &bet.value).ok()? {
        BetChoice::Color(color) => color == round.color,
        BetChoice::Number(number) => number == round.number,
    };
    hit.then(|| bet.kind.multiplier_for(round.color))
}

/// Summarize settlements against the bets they came from
pub fn summarize(bets: &[Bet], settlements: &[BetSettlement]) -> SettlementSummary {
    let mut summary = SettlementSummary::default();
    for settlement in settlements {
        summary.bets_settled += 1;
        if settlement.is_win() {
            summary.winners += 1;
        }
        summary.total_payout = summary
            .total_payout
            .checked_add(settlement.payout)
            .unwrap_or(summary.total_payout);
        if let Some(bet) = bets.iter().find(|b| b.id == settlement.bet_id) {
            summary.total_wagered = summary
                .total_wagered
                .checked_add(bet.amount)
                .unwrap_or(summary.total_wagered);
        }
    }
    summary
}

impl BetKind {
    /// Payout factor in hundredths for a winning bet of this kind on `color`
    pub fn multiplier_for(&self, color: Color) -> u64 {
        match self {
            BetKind::Number => NUMBER_MULTIPLIER,
            BetKind::Color if color == Color::Violet => VIOLET_MULTIPLIER,
            BetKind::Color => COLOR_MULTIPLIER,
        }
    }
}
