//! 동기화 파이프라인 통합 테스트 (가짜 Provider + 메모리 저장소).

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use etf_collector::modules::{BatchPacer, FixedDelayPacer, SyncOrchestrator, TickerResolver};
use etf_data::{
    ClosePoint, CsvSnapshotProvider, DataError, DividendYield, EtfStore, FundDataProvider,
    FundInfo, MemoryEtfStore, PriceHistoryProvider, Result as DataResult, TickerListProvider,
};
use rust_decimal_macros::dec;

// ==================== 가짜 Provider ====================

struct StaticTickers {
    tickers: Vec<String>,
}

#[async_trait]
impl TickerListProvider for StaticTickers {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_tickers(&self) -> DataResult<Vec<String>> {
        // 동시 요청 테스트를 위해 한 번 양보
        tokio::task::yield_now().await;
        Ok(self.tickers.clone())
    }
}

struct FailingTickers;

#[async_trait]
impl TickerListProvider for FailingTickers {
    fn name(&self) -> &str {
        "failing"
    }

    async fn fetch_tickers(&self) -> DataResult<Vec<String>> {
        Err(DataError::FetchError("HTTP 503 Service Unavailable".to_string()))
    }
}

#[derive(Default)]
struct FakeFunds {
    infos: HashMap<String, FundInfo>,
    calls: AtomicUsize,
}

impl FakeFunds {
    fn with(mut self, ticker: &str, info: FundInfo) -> Self {
        self.infos.insert(ticker.to_string(), info);
        self
    }
}

#[async_trait]
impl FundDataProvider for FakeFunds {
    fn name(&self) -> &str {
        "fake funds"
    }

    async fn fetch_fund_info(&self, ticker: &str) -> DataResult<FundInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.infos
            .get(ticker)
            .cloned()
            .ok_or_else(|| DataError::EmptyResult(ticker.to_string()))
    }
}

#[derive(Default)]
struct FakeHistory {
    closes: HashMap<String, Vec<ClosePoint>>,
    fail: bool,
}

#[async_trait]
impl PriceHistoryProvider for FakeHistory {
    fn name(&self) -> &str {
        "fake history"
    }

    async fn fetch_daily_closes(
        &self,
        tickers: &[String],
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> DataResult<HashMap<String, Vec<ClosePoint>>> {
        if self.fail {
            return Err(DataError::FetchError("bulk download failed".to_string()));
        }
        Ok(tickers
            .iter()
            .filter_map(|t| self.closes.get(t).map(|c| (t.clone(), c.clone())))
            .collect())
    }
}

// ==================== 헬퍼 ====================

fn tickers(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn etf(name: &str) -> FundInfo {
    FundInfo {
        quote_type: Some("ETF".to_string()),
        long_name: Some(name.to_string()),
        regular_market_price: Some(100.0),
        ..Default::default()
    }
}

fn orchestrator(
    universe: &[&str],
    funds: Arc<FakeFunds>,
    history: Arc<FakeHistory>,
    store: &MemoryEtfStore,
    batch_size: usize,
) -> SyncOrchestrator {
    let resolver = TickerResolver::new(vec![Box::new(StaticTickers {
        tickers: tickers(universe),
    })]);

    SyncOrchestrator::new(resolver, funds, history, Arc::new(store.clone()))
        .with_batch_size(batch_size)
        .with_pacer(Box::new(FixedDelayPacer::new(Duration::ZERO)))
}

// ==================== 테스트 ====================

#[tokio::test]
async fn test_each_batch_commits_separately() {
    let store = MemoryEtfStore::new();
    let funds = Arc::new(
        FakeFunds::default()
            .with("AAA", etf("Alpha ETF"))
            .with("BBB", etf("Beta ETF")),
    );
    let orch = orchestrator(&["AAA", "BBB"], funds, Arc::default(), &store, 1);

    let message = orch.trigger_sync().await;

    assert_eq!(message, "Sync complete: 2/2 ETFs updated");
    assert_eq!(store.commit_count(), 2);
    assert_eq!(store.count().await.unwrap(), 2);
    assert!(!orch.is_running());
}

#[tokio::test]
async fn test_failed_enrichment_creates_no_record() {
    let store = MemoryEtfStore::new();
    let orch = orchestrator(&["ZZZ"], Arc::default(), Arc::default(), &store, 100);

    let message = orch.trigger_sync().await;

    assert_eq!(message, "Sync complete: 0/1 ETFs updated");
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_non_fund_quote_type_is_skipped() {
    let store = MemoryEtfStore::new();
    let mut equity = etf("Apple Inc.");
    equity.quote_type = Some("EQUITY".to_string());
    let funds = Arc::new(
        FakeFunds::default()
            .with("AAPL", equity)
            .with("SPY", etf("SPDR S&P 500 ETF Trust")),
    );
    let orch = orchestrator(&["AAPL", "SPY"], funds, Arc::default(), &store, 100);

    assert_eq!(orch.trigger_sync().await, "Sync complete: 1/2 ETFs updated");
    assert!(store.get("AAPL").is_none());
    assert!(store.get("SPY").is_some());
}

#[tokio::test]
async fn test_no_tickers_found() {
    let store = MemoryEtfStore::new();
    let orch = orchestrator(&[], Arc::default(), Arc::default(), &store, 100);

    assert_eq!(orch.trigger_sync().await, "No tickers found");
    assert_eq!(store.commit_count(), 0);
}

#[tokio::test]
async fn test_concurrent_trigger_runs_once() {
    let store = MemoryEtfStore::new();
    let funds = Arc::new(
        FakeFunds::default()
            .with("AAA", etf("Alpha ETF"))
            .with("BBB", etf("Beta ETF")),
    );
    let orch = orchestrator(&["AAA", "BBB"], funds.clone(), Arc::default(), &store, 1);

    let (first, second) = tokio::join!(orch.trigger_sync(), orch.trigger_sync());

    let mut messages = vec![first, second];
    messages.sort();
    assert_eq!(
        messages,
        vec![
            "Sync already in progress".to_string(),
            "Sync complete: 2/2 ETFs updated".to_string(),
        ]
    );
    // 한 번의 실행분만 조회/저장
    assert_eq!(funds.calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.commit_count(), 2);

    // 실행 종료 후에는 다시 실행 가능
    assert_eq!(orch.trigger_sync().await, "Sync complete: 2/2 ETFs updated");
}

#[tokio::test]
async fn test_failed_batch_rolls_back_and_run_continues() {
    let store = MemoryEtfStore::new();
    store.fail_writes_for("BAD");
    let funds = Arc::new(
        FakeFunds::default()
            .with("AAA", etf("Alpha ETF"))
            .with("BAD", etf("Broken ETF"))
            .with("CCC", etf("Gamma ETF")),
    );
    let orch = orchestrator(&["AAA", "BAD", "CCC"], funds, Arc::default(), &store, 1);

    let message = orch.trigger_sync().await;

    assert_eq!(message, "Sync complete: 2/3 ETFs updated");
    assert_eq!(store.commit_count(), 2);
    assert_eq!(store.rollback_count(), 1);
    assert!(store.get("BAD").is_none());
    assert!(store.get("CCC").is_some());
}

#[tokio::test]
async fn test_failure_discards_whole_batch() {
    let store = MemoryEtfStore::new();
    store.fail_writes_for("BAD");
    let funds = Arc::new(
        FakeFunds::default()
            .with("AAA", etf("Alpha ETF"))
            .with("BAD", etf("Broken ETF")),
    );
    let orch = orchestrator(&["AAA", "BAD"], funds, Arc::default(), &store, 2);

    assert_eq!(orch.trigger_sync().await, "Sync complete: 0/2 ETFs updated");
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_returns_are_merged_into_records() {
    let now = Utc::now();
    let day = chrono::Duration::days(1);
    let history = FakeHistory {
        closes: HashMap::from([(
            "AAA".to_string(),
            vec![
                ClosePoint::new(now - day * 400, 100.0),
                ClosePoint::new(now - day * 40, 110.0),
                ClosePoint::new(now, 120.0),
            ],
        )]),
        fail: false,
    };
    let store = MemoryEtfStore::new();
    let funds = Arc::new(FakeFunds::default().with("AAA", etf("Alpha ETF")));
    let orch = orchestrator(&["AAA"], funds, Arc::new(history), &store, 100);

    orch.trigger_sync().await;

    let record = store.get("AAA").unwrap();
    assert_eq!(record.return_1y, Some(dec!(20.00)));
    assert_eq!(record.return_1m, Some(dec!(9.09)));
}

#[tokio::test]
async fn test_bulk_history_failure_still_saves_metadata() {
    let store = MemoryEtfStore::new();
    let funds = Arc::new(FakeFunds::default().with("AAA", etf("Alpha ETF")));
    let history = Arc::new(FakeHistory {
        fail: true,
        ..Default::default()
    });
    let orch = orchestrator(&["AAA"], funds, history, &store, 100);

    assert_eq!(orch.trigger_sync().await, "Sync complete: 1/1 ETFs updated");

    let record = store.get("AAA").unwrap();
    assert_eq!(record.name.as_deref(), Some("Alpha ETF"));
    assert_eq!(record.return_1y, None);
}

#[tokio::test]
async fn test_dividend_yield_representations_normalize() {
    let mut fraction = etf("Fraction ETF");
    fraction.dividend_yield = Some(DividendYield::Fraction(0.0105));
    let mut percent = etf("Percent ETF");
    percent.dividend_yield = Some(DividendYield::Percent(1.05));

    let store = MemoryEtfStore::new();
    let funds = Arc::new(
        FakeFunds::default()
            .with("FRAC", fraction)
            .with("PCT", percent),
    );
    let orch = orchestrator(&["FRAC", "PCT"], funds, Arc::default(), &store, 100);
    orch.trigger_sync().await;

    assert_eq!(store.get("FRAC").unwrap().dividend_yield, Some(dec!(1.05)));
    assert_eq!(store.get("PCT").unwrap().dividend_yield, Some(dec!(1.05)));
}

#[tokio::test]
async fn test_resync_never_clears_existing_fields() {
    let store = MemoryEtfStore::new();

    let mut full = etf("Alpha ETF");
    full.fund_family = Some("Alpha Advisors".to_string());
    full.net_expense_ratio = Some(0.2);
    let orch = orchestrator(
        &["AAA"],
        Arc::new(FakeFunds::default().with("AAA", full)),
        Arc::default(),
        &store,
        100,
    );
    orch.trigger_sync().await;
    let first = store.get("AAA").unwrap();

    // 두 번째 수집에서는 가격만 확보
    let sparse = FundInfo {
        quote_type: Some("ETF".to_string()),
        regular_market_price: Some(101.5),
        ..Default::default()
    };
    let orch = orchestrator(
        &["AAA"],
        Arc::new(FakeFunds::default().with("AAA", sparse)),
        Arc::default(),
        &store,
        100,
    );
    orch.trigger_sync().await;
    let second = store.get("AAA").unwrap();

    assert_eq!(store.count().await.unwrap(), 1);
    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.name.as_deref(), Some("Alpha ETF"));
    assert_eq!(second.issuer.as_deref(), Some("Alpha Advisors"));
    assert_eq!(second.expense_ratio, Some(dec!(0.2)));
    assert_eq!(second.price, Some(dec!(101.5)));
    assert!(second.data_updated_at >= first.data_updated_at);
}

#[tokio::test]
async fn test_fallback_to_snapshot() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "ticker").unwrap();
    writeln!(file, "SPY").unwrap();
    writeln!(file, "QQQ").unwrap();

    let resolver = TickerResolver::new(vec![
        Box::new(FailingTickers),
        Box::new(FailingTickers),
        Box::new(CsvSnapshotProvider::new(file.path())),
    ]);

    assert_eq!(resolver.resolve().await, tickers(&["SPY", "QQQ"]));
}

#[tokio::test]
async fn test_missing_snapshot_yields_empty_universe() {
    let resolver = TickerResolver::new(vec![
        Box::new(FailingTickers),
        Box::new(CsvSnapshotProvider::new("/nonexistent/etf_master_list.csv")),
    ]);

    assert!(resolver.resolve().await.is_empty());
}

/// 대기 횟수만 세는 Pacer
struct CountingPacer {
    pauses: Arc<AtomicUsize>,
}

#[async_trait]
impl BatchPacer for CountingPacer {
    fn next_delay(&self) -> Duration {
        Duration::ZERO
    }

    async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_pacer_runs_between_batches_only() {
    let funds = Arc::new(
        FakeFunds::default()
            .with("AAA", etf("Alpha ETF"))
            .with("BBB", etf("Beta ETF"))
            .with("CCC", etf("Gamma ETF")),
    );

    for (batch_size, expected) in [(1, 2), (100, 0)] {
        let store = MemoryEtfStore::new();
        let pauses = Arc::new(AtomicUsize::new(0));
        let orch = orchestrator(
            &["AAA", "BBB", "CCC"],
            funds.clone(),
            Arc::default(),
            &store,
            batch_size,
        )
        .with_pacer(Box::new(CountingPacer {
            pauses: pauses.clone(),
        }));

        assert_eq!(orch.trigger_sync().await, "Sync complete: 3/3 ETFs updated");
        assert_eq!(pauses.load(Ordering::SeqCst), expected, "batch_size={batch_size}");
    }
}

#[tokio::test]
async fn test_sync_run_keeps_processed_tickers() {
    let store = MemoryEtfStore::new();
    let funds = Arc::new(FakeFunds::default().with("SPY", etf("SPDR S&P 500 ETF Trust")));
    let orch = orchestrator(&["SPY", "ZZZ"], funds, Arc::default(), &store, 100);

    let run = orch.run_sync().await.unwrap();

    assert_eq!(run.tickers, tickers(&["SPY", "ZZZ"]));
    assert_eq!(run.total(), 2);
    assert_eq!(run.updated, 1);
    assert_eq!(run.committed_batches, 1);
    assert_eq!(run.message, "Sync complete: 1/2 ETFs updated");
}
