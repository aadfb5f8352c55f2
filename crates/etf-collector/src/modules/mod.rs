//! 동기화 파이프라인 모듈.

pub mod enrich;
pub mod orchestrator;
pub mod pacing;
pub mod reconcile;
pub mod returns;
pub mod ticker_resolve;

pub use enrich::{derive_patch, Enricher};
pub use orchestrator::{SyncOrchestrator, DEFAULT_BATCH_SIZE, MSG_ALREADY_RUNNING, MSG_NO_TICKERS};
pub use pacing::{pacer_from_config, BatchPacer, FixedDelayPacer, JitteredDelayPacer};
pub use reconcile::{sparse_merge, Reconciler, UpsertOutcome};
pub use returns::{trailing_returns, ReturnCalculator, HISTORY_LOOKBACK_DAYS};
pub use ticker_resolve::TickerResolver;
