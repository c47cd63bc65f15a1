//! Round lifecycle engine
//!
//! One tick opens a new round with its outcome already drawn, then settles
//! the round that was current before it. A round's bets are therefore
//! resolved one interval after it opens. The engine is the only writer of
//! rounds and of settlement results.

use crate::{
    config::EngineConfig,
    errors::WingoResult,
    games::{
        outcome::{OutcomeGenerator, OutcomeSource},
        sequencer::PeriodSequencer,
        settlement::{self, SettlementSummary},
        types::{BetStatus, NewRound, Round},
    },
    notifier::GameEvent,
    services::GameContext,
};
use chrono::Utc;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use tokio::sync::{Mutex, Notify, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Orders bet placement against round opening. Placements hold the shared
/// side while they validate and persist; the engine takes the exclusive side
/// to swap the current round, so no bet lands on a round that is closing.
#[derive(Default)]
pub struct RoundGate {
    lock: RwLock<()>,
}

impl RoundGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enter_placement(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().await
    }

    pub async fn begin_opening(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().await
    }
}

/// Single-writer state advanced once per tick
struct EngineState {
    sequencer: PeriodSequencer,
    outcomes: Box<dyn OutcomeSource>,
}

/// What one tick did
#[derive(Debug, Clone)]
pub struct TickReport {
    pub opened: Round,
    pub settled: Option<SettledRound>,
}

#[derive(Debug, Clone)]
pub struct SettledRound {
    pub round: Round,
    pub summary: SettlementSummary,
    /// Bets whose result could not be persisted this tick
    pub failed: usize,
}

pub struct RoundEngine {
    ctx: GameContext,
    config: EngineConfig,
    state: Mutex<EngineState>,
    running: AtomicBool,
    shutdown: Notify,
    ticks: AtomicU64,
}

impl RoundEngine {
    /// Build an engine, resuming the period sequence from the newest
    /// persisted round.
    pub async fn bootstrap(ctx: GameContext, config: EngineConfig) -> WingoResult<Self> {
        let outcomes: Box<dyn OutcomeSource> = match config.outcome_seed {
            Some(seed) => Box::new(OutcomeGenerator::seeded(seed)),
            None => Box::new(OutcomeGenerator::from_entropy()),
        };
        Self::with_outcomes(ctx, config, outcomes).await
    }

    pub async fn with_outcomes(
        ctx: GameContext,
        config: EngineConfig,
        outcomes: Box<dyn OutcomeSource>,
    ) -> WingoResult<Self> {
        let latest = ctx.store.get_current_round().await?;
        let sequencer = PeriodSequencer::resume(
            config.period_prefix.clone(),
            latest.as_ref().map(|round| round.period.as_str()),
            config.default_counter,
        );

        match &latest {
            Some(round) => info!(
                last_period = %round.period,
                next_suffix = sequencer.upcoming(),
                "Resuming period sequence"
            ),
            None => info!(prefix = %sequencer.prefix(), "No persisted rounds, starting fresh sequence"),
        }

        Ok(Self {
            ctx,
            config,
            state: Mutex::new(EngineState { sequencer, outcomes }),
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
            ticks: AtomicU64::new(0),
        })
    }

    /// Run ticks until `stop` is called. The first tick fires immediately.
    pub async fn start(self: Arc<Self>) {
        self.running.store(true, Ordering::SeqCst);

        info!(
            interval_ms = self.config.round_interval_ms,
            grace_ms = self.config.betting_grace_ms,
            prefix = %self.config.period_prefix,
            "Round engine started"
        );

        let mut ticker = interval(self.config.round_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.running.load(Ordering::SeqCst) {
                        break;
                    }
                    if let Err(e) = self.run_tick().await {
                        self.ctx.metrics.record_tick_failure();
                        error!("Round tick failed: {}", e);
                    }
                }
                _ = self.shutdown.notified() => break,
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!(ticks = self.ticks.load(Ordering::SeqCst), "Round engine stopped");
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Open the next round and settle the previous one
    pub async fn run_tick(&self) -> WingoResult<TickReport> {
        // Held for the whole tick so opening and settling never overlap
        let mut state = self.state.lock().await;

        let opened = self.open_round(&mut state).await?;
        self.ticks.fetch_add(1, Ordering::SeqCst);
        self.ctx.metrics.record_round_opened();
        self.ctx
            .notifier
            .publish(GameEvent::round_opened(&opened, self.config.betting_window()));

        let settled = self.settle_previous(&opened).await?;
        if let Some(settled) = &settled {
            self.ctx.notifier.publish(GameEvent::RoundSettled {
                round_id: settled.round.id,
                period: settled.round.period.clone(),
                color: settled.round.color,
                number: settled.round.number,
                bets_settled: settled.summary.bets_settled,
                winners: settled.summary.winners,
                total_payout: settled.summary.total_payout,
            });
        }

        Ok(TickReport { opened, settled })
    }

    async fn open_round(&self, state: &mut EngineState) -> WingoResult<Round> {
        let _gate = self.ctx.gate.begin_opening().await;

        // Advance a copy so a failed write does not burn the label
        let mut sequencer = state.sequencer.clone();
        let period = sequencer.next();
        let outcome = state.outcomes.next_outcome();

        let round = self
            .ctx
            .store
            .create_round(NewRound {
                period,
                outcome,
                created_at: Utc::now(),
            })
            .await?;
        state.sequencer = sequencer;

        info!(round_id = round.id, period = %round.period, "Round opened");
        Ok(round)
    }

    async fn settle_previous(&self, opened: &Round) -> WingoResult<Option<SettledRound>> {
        let recent = self.ctx.store.get_recent_rounds(2).await?;
        let Some(previous) = recent.into_iter().find(|round| round.id != opened.id) else {
            debug!("No previous round to settle");
            return Ok(None);
        };

        let bets = self.ctx.store.get_bets_by_round_id(previous.id).await?;
        let results = settlement::settle(&previous, &bets);

        let mut applied = Vec::with_capacity(results.len());
        let mut failed = 0;
        for result in results {
            match self.ctx.ledger.settle(&result).await {
                Ok(()) => {
                    match result.status {
                        BetStatus::Won => self.ctx.metrics.record_bet_won(result.payout),
                        _ => self.ctx.metrics.record_bet_lost(),
                    }
                    applied.push(result);
                }
                Err(e) => {
                    failed += 1;
                    self.ctx.metrics.record_settlement_failure();
                    warn!(bet_id = %result.bet_id, round_id = previous.id, "Failed to settle bet: {}", e);
                }
            }
        }

        let summary = settlement::summarize(&bets, &applied);
        self.ctx.metrics.record_round_settled();
        info!(
            round_id = previous.id,
            period = %previous.period,
            color = %previous.color,
            number = previous.number,
            bets = summary.bets_settled,
            winners = summary.winners,
            payout = %summary.total_payout,
            failed,
            "Round settled"
        );

        Ok(Some(SettledRound {
            round: previous,
            summary,
            failed,
        }))
    }
}
