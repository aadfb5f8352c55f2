//! ETF 동기화 오케스트레이터.
//!
//! 티커 조회 → (배치별) 종목 정보 수집 + 수익률 계산 → upsert/커밋 → 대기 순으로
//! 실행합니다. 인스턴스당 한 번에 하나의 동기화만 실행됩니다.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use etf_data::{EtfStore, FundDataProvider, PriceHistoryProvider};

use super::enrich::Enricher;
use super::pacing::{BatchPacer, FixedDelayPacer};
use super::reconcile::Reconciler;
use super::returns::ReturnCalculator;
use super::ticker_resolve::TickerResolver;
use crate::SyncRun;

/// 기본 배치 크기
pub const DEFAULT_BATCH_SIZE: usize = 100;

pub const MSG_ALREADY_RUNNING: &str = "Sync already in progress";
pub const MSG_NO_TICKERS: &str = "No tickers found";

/// 실행 중 플래그 해제용 guard.
///
/// 정상 종료, 에러, panic, future 취소 모두에서 drop 시 플래그를 내립니다.
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// ETF 동기화 오케스트레이터
pub struct SyncOrchestrator {
    resolver: TickerResolver,
    enricher: Enricher,
    calculator: ReturnCalculator,
    store: Arc<dyn EtfStore>,
    pacer: Box<dyn BatchPacer>,
    batch_size: usize,
    running: AtomicBool,
}

impl SyncOrchestrator {
    pub fn new(
        resolver: TickerResolver,
        fund_provider: Arc<dyn FundDataProvider>,
        history_provider: Arc<dyn PriceHistoryProvider>,
        store: Arc<dyn EtfStore>,
    ) -> Self {
        Self {
            resolver,
            enricher: Enricher::new(fund_provider),
            calculator: ReturnCalculator::new(history_provider),
            store,
            pacer: Box::new(FixedDelayPacer::new(Duration::from_secs(1))),
            batch_size: DEFAULT_BATCH_SIZE,
            running: AtomicBool::new(false),
        }
    }

    /// 배치 크기 설정 (최소 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// 배치 간 대기 전략 설정
    pub fn with_pacer(mut self, pacer: Box<dyn BatchPacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// 동기화 실행 여부
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// 동기화 실행 후 요약 메시지 반환.
    ///
    /// 이미 실행 중이면 아무 작업 없이 `"Sync already in progress"`를 반환합니다.
    pub async fn trigger_sync(&self) -> String {
        match self.run_sync().await {
            Some(run) => run.message,
            None => MSG_ALREADY_RUNNING.to_string(),
        }
    }

    /// 동기화 실행 후 실행 통계 반환. 이미 실행 중이면 `None`.
    pub async fn run_sync(&self) -> Option<SyncRun> {
        let Some(_guard) = RunningGuard::try_acquire(&self.running) else {
            tracing::info!("동기화가 이미 실행 중, 요청 무시");
            return None;
        };

        Some(self.run_locked().await)
    }

    async fn run_locked(&self) -> SyncRun {
        let clock = Instant::now();
        let mut run = SyncRun::new(Utc::now());

        tracing::info!("ETF 동기화 시작");

        let tickers = self.resolver.resolve().await;
        if tickers.is_empty() {
            tracing::warn!("동기화할 티커 없음");
            run.message = MSG_NO_TICKERS.to_string();
            run.elapsed = clock.elapsed();
            return run;
        }

        run.tickers = tickers;
        let batch_count = run.tickers.len().div_ceil(self.batch_size);

        for (index, batch) in run.tickers.chunks(self.batch_size).enumerate() {
            tracing::info!(
                batch = index + 1,
                batches = batch_count,
                size = batch.len(),
                "배치 처리 시작"
            );

            match self.process_batch(batch).await {
                Ok(written) => {
                    run.updated += written;
                    run.committed_batches += 1;
                    tracing::info!(
                        batch = index + 1,
                        written,
                        updated = run.updated,
                        total = run.tickers.len(),
                        "배치 커밋 완료"
                    );
                }
                Err(e) => {
                    run.failed_batches += 1;
                    tracing::error!(batch = index + 1, error = %e, "배치 처리 실패, 롤백");
                }
            }

            if index + 1 < batch_count {
                self.pacer.pause().await;
            }
        }

        run.message = format!("Sync complete: {}/{} ETFs updated", run.updated, run.total());
        run.elapsed = clock.elapsed();
        run.log_summary("ETF 동기화");
        run
    }

    /// 배치 하나를 수집/계산 후 한 작업 단위로 저장. 저장된 레코드 수 반환.
    async fn process_batch(&self, batch: &[String]) -> etf_data::Result<usize> {
        let (mut patches, returns) = tokio::join!(
            self.enricher.enrich(batch),
            self.calculator.compute(batch)
        );

        for patch in &mut patches {
            if let Some(r) = returns.get(&patch.ticker) {
                patch.apply_returns(r);
            }
        }

        if patches.is_empty() {
            tracing::warn!(size = batch.len(), "배치에서 수집된 ETF 없음");
            return Ok(0);
        }

        let now = Utc::now();
        let mut uow = self.store.begin().await?;

        for patch in &patches {
            if let Err(e) = Reconciler::upsert(&mut *uow, patch, now).await {
                tracing::error!(ticker = %patch.ticker, error = %e, "ETF 저장 실패");
                if let Err(rollback_err) = uow.rollback().await {
                    tracing::warn!(error = %rollback_err, "롤백 실패");
                }
                return Err(e);
            }
        }

        uow.commit().await?;
        Ok(patches.len())
    }
}
