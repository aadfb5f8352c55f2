//! 설정에서 동기화 파이프라인 구성.

use std::sync::Arc;

use etf_data::{
    AlphaVantageListingProvider, CsvSnapshotProvider, EtfStore, NasdaqEtfListProvider,
    YahooFinanceProvider,
};

use crate::config::{CollectorConfig, SourceConfig};
use crate::modules::{pacer_from_config, SyncOrchestrator, TickerResolver};
use crate::Result;

/// 티커 소스 구성 (NASDAQ → Alpha Vantage → CSV 스냅샷).
pub fn build_resolver(sources: &SourceConfig) -> Result<TickerResolver> {
    let timeout = sources.http_timeout();

    Ok(TickerResolver::new(vec![
        Box::new(NasdaqEtfListProvider::new(timeout)?),
        Box::new(AlphaVantageListingProvider::new(
            sources.alpha_vantage_api_key.clone(),
            timeout,
        )?),
        Box::new(CsvSnapshotProvider::new(sources.fallback_csv.clone())),
    ]))
}

/// 오케스트레이터 구성.
pub fn build_orchestrator(
    config: &CollectorConfig,
    store: Arc<dyn EtfStore>,
) -> Result<SyncOrchestrator> {
    let yahoo = Arc::new(YahooFinanceProvider::new(
        config.sources.http_timeout(),
        config.sources.history_concurrency,
    )?);

    let orchestrator = SyncOrchestrator::new(
        build_resolver(&config.sources)?,
        yahoo.clone(),
        yahoo,
        store,
    )
    .with_batch_size(config.sync.batch_size)
    .with_pacer(pacer_from_config(
        config.sync.batch_delay(),
        config.sync.batch_jitter(),
    ));

    tracing::debug!(
        batch_size = orchestrator.batch_size(),
        delay_secs = config.sync.batch_delay_secs,
        jitter_ms = config.sync.batch_jitter_ms,
        "동기화 파이프라인 구성 완료"
    );
    Ok(orchestrator)
}
