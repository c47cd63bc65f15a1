//! Round and wager counters, rendered in Prometheus text format

use crate::common::money::Amount;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub struct GameMetrics {
    start_time: Instant,
    rounds_opened: AtomicU64,
    rounds_settled: AtomicU64,
    bets_placed: AtomicU64,
    bets_rejected: AtomicU64,
    bets_won: AtomicU64,
    bets_lost: AtomicU64,
    settlement_failures: AtomicU64,
    tick_failures: AtomicU64,
    wagered_cents: AtomicU64,
    paid_out_cents: AtomicU64,
}

impl Default for GameMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            rounds_opened: AtomicU64::new(0),
            rounds_settled: AtomicU64::new(0),
            bets_placed: AtomicU64::new(0),
            bets_rejected: AtomicU64::new(0),
            bets_won: AtomicU64::new(0),
            bets_lost: AtomicU64::new(0),
            settlement_failures: AtomicU64::new(0),
            tick_failures: AtomicU64::new(0),
            wagered_cents: AtomicU64::new(0),
            paid_out_cents: AtomicU64::new(0),
        }
    }

    pub fn record_round_opened(&self) {
        self.rounds_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_round_settled(&self) {
        self.rounds_settled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bet_placed(&self, amount: Amount) {
        self.bets_placed.fetch_add(1, Ordering::Relaxed);
        self.wagered_cents.fetch_add(amount.cents(), Ordering::Relaxed);
    }

    pub fn record_bet_rejected(&self) {
        self.bets_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bet_won(&self, payout: Amount) {
        self.bets_won.fetch_add(1, Ordering::Relaxed);
        self.paid_out_cents.fetch_add(payout.cents(), Ordering::Relaxed);
    }

    pub fn record_bet_lost(&self) {
        self.bets_lost.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_settlement_failure(&self) {
        self.settlement_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick_failure(&self) {
        self.tick_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime().as_secs(),
            rounds_opened: self.rounds_opened.load(Ordering::Relaxed),
            rounds_settled: self.rounds_settled.load(Ordering::Relaxed),
            bets_placed: self.bets_placed.load(Ordering::Relaxed),
            bets_rejected: self.bets_rejected.load(Ordering::Relaxed),
            bets_won: self.bets_won.load(Ordering::Relaxed),
            bets_lost: self.bets_lost.load(Ordering::Relaxed),
            settlement_failures: self.settlement_failures.load(Ordering::Relaxed),
            tick_failures: self.tick_failures.load(Ordering::Relaxed),
            wagered: Amount::from_cents(self.wagered_cents.load(Ordering::Relaxed)),
            paid_out: Amount::from_cents(self.paid_out_cents.load(Ordering::Relaxed)),
        }
    }

    pub fn to_prometheus_format(&self) -> String {
        let s = self.snapshot();
        let mut output = String::new();

        let counters: [(&str, &str, u64); 9] = [
            ("wingo_rounds_opened_total", "Rounds opened by the engine", s.rounds_opened),
            ("wingo_rounds_settled_total", "Rounds whose bets were settled", s.rounds_settled),
            ("wingo_bets_placed_total", "Bets accepted", s.bets_placed),
            ("wingo_bets_rejected_total", "Bets refused during placement", s.bets_rejected),
            ("wingo_bets_won_total", "Bets settled as won", s.bets_won),
            ("wingo_bets_lost_total", "Bets settled as lost", s.bets_lost),
            ("wingo_settlement_failures_total", "Bets whose settlement write failed", s.settlement_failures),
            ("wingo_tick_failures_total", "Engine ticks that failed to open a round", s.tick_failures),
            ("wingo_uptime_seconds", "Seconds since startup", s.uptime_secs),
        ];
        for (name, help, value) in counters {
            let kind = if name.ends_with("_total") { "counter" } else { "gauge" };
            output.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} {kind}\n{name} {value}\n\n"
            ));
        }

        output.push_str(&format!(
            "# HELP wingo_wagered_amount_total Total amount wagered\n\
             # TYPE wingo_wagered_amount_total counter\n\
             wingo_wagered_amount_total {}\n\n",
            s.wagered
        ));
        output.push_str(&format!(
            "# HELP wingo_paid_out_amount_total Total amount paid to winners\n\
             # TYPE wingo_paid_out_amount_total counter\n\
             wingo_paid_out_amount_total {}\n",
            s.paid_out
        ));

        output
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub rounds_opened: u64,
    pub rounds_settled: u64,
    pub bets_placed: u64,
    pub bets_rejected: u64,
    pub bets_won: u64,
    pub bets_lost: u64,
    pub settlement_failures: u64,
    pub tick_failures: u64,
    pub wagered: Amount,
    pub paid_out: Amount,
}
