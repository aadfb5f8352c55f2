//! ETF master collector CLI.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use etf_collector::modules::SyncOrchestrator;
use etf_collector::{pipeline, schedule, CollectorConfig};
use etf_core::logging::{init_logging, LogConfig};
use etf_data::{Database, DatabaseConfig, EtfStore, MemoryEtfStore, PgEtfStore};

#[derive(Parser)]
#[command(name = "etf-collector")]
#[command(about = "ETF master list synchronizer", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 전체 동기화 1회 실행
    Sync {
        /// DB 대신 메모리 저장소 사용 (결과를 저장하지 않음)
        #[arg(long)]
        dry_run: bool,
    },

    /// 티커 목록 조회 (소스 폴백 확인용)
    Tickers {
        /// 출력할 티커 수
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// 저장된 ETF 조회 (대소문자 무시)
    Show {
        /// 티커 (예: spy)
        ticker: String,
    },

    /// 데이터베이스 마이그레이션 실행
    Migrate,

    /// 데몬 모드: 매일 정해진 시각 + 주기적으로 동기화
    Daemon,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 로깅 초기화
    init_logging(
        LogConfig::new(format!("etf_collector={0},etf_data={0}", cli.log_level))
            .with_format_from_env(),
    )
    .map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    tracing::info!("ETF Master Collector 시작");

    // 설정 로드
    let config = CollectorConfig::from_env();

    match cli.command {
        Commands::Sync { dry_run } => {
            let db = if dry_run {
                tracing::warn!("dry-run: 메모리 저장소 사용");
                None
            } else {
                Some(connect(&config).await?)
            };
            let store: Arc<dyn EtfStore> = match &db {
                Some(db) => Arc::new(PgEtfStore::new(db.clone())),
                None => Arc::new(MemoryEtfStore::new()),
            };

            let orchestrator = pipeline::build_orchestrator(&config, store)?;
            let message = orchestrator.trigger_sync().await;
            println!("{}", message);

            if let Some(db) = db {
                db.close().await;
            }
        }
        Commands::Tickers { limit } => {
            let resolver = pipeline::build_resolver(&config.sources)?;
            let tickers = resolver.resolve().await;

            println!("{} tickers", tickers.len());
            for ticker in tickers.iter().take(limit) {
                println!("  {}", ticker);
            }
        }
        Commands::Show { ticker } => {
            let db = connect(&config).await?;
            let store = PgEtfStore::new(db.clone());

            match store.find_by_ticker_ci(&ticker).await? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("ETF not found: {}", ticker),
            }
            db.close().await;
        }
        Commands::Migrate => {
            let db = connect(&config).await?;
            db.migrate().await?;
            db.close().await;
        }
        Commands::Daemon => {
            let db = connect(&config).await?;
            let store: Arc<dyn EtfStore> = Arc::new(PgEtfStore::new(db.clone()));
            let orchestrator = Arc::new(pipeline::build_orchestrator(&config, store.clone())?);

            run_daemon(&config, orchestrator, store).await;
            db.close().await;
        }
    }

    tracing::info!("ETF Master Collector 종료");
    Ok(())
}

async fn connect(config: &CollectorConfig) -> anyhow::Result<Database> {
    let mut db_config = DatabaseConfig::new(config.require_database_url()?);
    db_config.max_connections = config.database_max_connections;

    let db = Database::connect(&db_config)
        .await
        .context("데이터베이스 연결 실패")?;
    Ok(db)
}

/// 동기화를 백그라운드로 실행. 실행 중 여부는 오케스트레이터가 판단합니다.
fn spawn_sync(orchestrator: Arc<SyncOrchestrator>, trigger: &'static str) {
    tokio::spawn(async move {
        tracing::info!(trigger, "동기화 트리거");
        let message = orchestrator.trigger_sync().await;
        tracing::info!(trigger, result = %message, "동기화 종료");
    });
}

async fn run_daemon(
    config: &CollectorConfig,
    orchestrator: Arc<SyncOrchestrator>,
    store: Arc<dyn EtfStore>,
) {
    let daemon = &config.daemon;

    // 저장된 ETF가 부족하면 즉시 동기화
    match store.count().await {
        Ok(count) if count < daemon.initial_sync_min_count => {
            tracing::info!(
                count,
                min = daemon.initial_sync_min_count,
                "저장된 ETF 부족, 초기 동기화 시작"
            );
            spawn_sync(orchestrator.clone(), "initial");
        }
        Ok(count) => {
            tracing::info!(count, "저장된 ETF 수 확인");
        }
        Err(e) => {
            tracing::error!(error = %e, "ETF 수 조회 실패");
        }
    }

    let next_daily = schedule::next_daily_run(
        Utc::now(),
        daemon.timezone,
        daemon.sync_hour,
        daemon.sync_minute,
    );
    tracing::info!(
        next = %next_daily.with_timezone(&daemon.timezone),
        interval_hours = daemon.price_update_interval_hours,
        "=== 데몬 모드 시작 ==="
    );

    let daily = tokio::time::sleep(schedule::until(next_daily, Utc::now()));
    tokio::pin!(daily);

    let period = daemon.price_update_interval();
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("종료 신호 수신, 데몬 종료 중...");
                break;
            }
            _ = &mut daily => {
                spawn_sync(orchestrator.clone(), "daily");

                let next = schedule::next_daily_run(
                    Utc::now(),
                    daemon.timezone,
                    daemon.sync_hour,
                    daemon.sync_minute,
                );
                tracing::info!(next = %next.with_timezone(&daemon.timezone), "다음 일일 동기화 예약");
                daily
                    .as_mut()
                    .reset(tokio::time::Instant::now() + schedule::until(next, Utc::now()));
            }
            _ = interval.tick() => {
                spawn_sync(orchestrator.clone(), "interval");
            }
        }
    }
}
