//! Service wiring
//!
//! `ServiceContainer` builds the store for the configured backend and hands
//! the same shared handles to the engine, the betting service and the query
//! service.

use crate::{
    betting::BettingService,
    common::traits::GameStore,
    config::{StorageBackend, WingoConfig},
    engine::{RoundEngine, RoundGate},
    errors::{StorageError, WingoResult},
    game_store::RocksGameStore,
    games::outcome::OutcomeSource,
    ledger::Ledger,
    memory_store::MemoryStore,
    metrics::GameMetrics,
    notifier::RoundNotifier,
    query::RoundQueryService,
    storage::OptimizedStorage,
};
use std::sync::Arc;
use tracing::info;

/// Handles shared by everything that touches rounds or balances
#[derive(Clone)]
pub struct GameContext {
    pub store: Arc<dyn GameStore>,
    pub ledger: Arc<Ledger>,
    pub gate: Arc<RoundGate>,
    pub notifier: RoundNotifier,
    pub metrics: Arc<GameMetrics>,
}

impl GameContext {
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self {
            ledger: Arc::new(Ledger::new(store.clone())),
            store,
            gate: Arc::new(RoundGate::new()),
            notifier: RoundNotifier::default(),
            metrics: Arc::new(GameMetrics::new()),
        }
    }
}

pub struct ServiceContainer {
    config: WingoConfig,
    context: GameContext,
    engine: Arc<RoundEngine>,
    betting: Arc<BettingService>,
    query: Arc<RoundQueryService>,
}

impl ServiceContainer {
    pub fn config(&self) -> &WingoConfig {
        &self.config
    }

    pub fn context(&self) -> &GameContext {
        &self.context
    }

    pub fn engine(&self) -> Arc<RoundEngine> {
        Arc::clone(&self.engine)
    }

    pub fn betting(&self) -> Arc<BettingService> {
        Arc::clone(&self.betting)
    }

    pub fn query(&self) -> Arc<RoundQueryService> {
        Arc::clone(&self.query)
    }

    fn create_store(config: &WingoConfig) -> WingoResult<Arc<dyn GameStore>> {
        match config.storage.backend {
            StorageBackend::Rocksdb => {
                let storage = OptimizedStorage::new_with_config(&config.storage).map_err(|e| {
                    StorageError::DatabaseOpenFailed(format!(
                        "{}: {}",
                        config.storage.data_directory, e
                    ))
                })?;
                info!(path = %config.storage.data_directory, "Opened RocksDB game store");
                Ok(Arc::new(RocksGameStore::new(Arc::new(storage))))
            }
            StorageBackend::Memory => {
                info!("Using in-memory game store; state is lost on exit");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }
}

/// Builds a `ServiceContainer`, with overrides for tests
#[derive(Default)]
pub struct ServiceBuilder {
    config: WingoConfig,
    store_override: Option<Arc<dyn GameStore>>,
    outcomes_override: Option<Box<dyn OutcomeSource>>,
}

impl ServiceBuilder {
    pub fn new(config: WingoConfig) -> Self {
        Self {
            config,
            store_override: None,
            outcomes_override: None,
        }
    }

    /// Use this store instead of opening the configured backend
    pub fn with_store(mut self, store: Arc<dyn GameStore>) -> Self {
        self.store_override = Some(store);
        self
    }

    /// Draw outcomes from this source instead of the configured generator
    pub fn with_outcomes(mut self, outcomes: Box<dyn OutcomeSource>) -> Self {
        self.outcomes_override = Some(outcomes);
        self
    }

    pub async fn build(self) -> WingoResult<ServiceContainer> {
        let store = match self.store_override {
            Some(store) => store,
            None => ServiceContainer::create_store(&self.config)?,
        };
        let context = GameContext::new(store);

        let engine_config = self.config.engine.clone();
        let engine = match self.outcomes_override {
            Some(outcomes) => RoundEngine::with_outcomes(context.clone(), engine_config, outcomes).await?,
            None => RoundEngine::bootstrap(context.clone(), engine_config).await?,
        };

        let betting = BettingService::new(
            context.ledger.clone(),
            context.gate.clone(),
            context.metrics.clone(),
            self.config.engine.clone(),
            self.config.wallet.clone(),
        );
        let query = RoundQueryService::new(context.store.clone(), self.config.engine.clone());

        Ok(ServiceContainer {
            config: self.config,
            context,
            engine: Arc::new(engine),
            betting: Arc::new(betting),
            query: Arc::new(query),
        })
    }
}
