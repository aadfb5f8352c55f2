//! 환경변수 기반 설정 모듈.

use crate::error::CollectorError;
use crate::Result;
use chrono_tz::Tz;
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL (DB를 쓰는 명령에서만 필수)
    pub database_url: Option<String>,
    /// 풀의 최대 연결 수
    pub database_max_connections: u32,
    /// 동기화 설정
    pub sync: SyncConfig,
    /// 데이터 소스 설정
    pub sources: SourceConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
}

/// 동기화 설정
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// 배치당 티커 수 (최소 1)
    pub batch_size: usize,
    /// 배치 간 딜레이 (초)
    pub batch_delay_secs: u64,
    /// 배치 간 딜레이에 더할 무작위 지연 상한 (밀리초, 0이면 고정 딜레이)
    pub batch_jitter_ms: u64,
}

/// 데이터 소스 설정
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Alpha Vantage API 키
    pub alpha_vantage_api_key: SecretString,
    /// 로컬 CSV 스냅샷 경로
    pub fallback_csv: PathBuf,
    /// HTTP 요청 타임아웃 (초)
    pub http_timeout_secs: u64,
    /// 가격 이력 동시 요청 수
    pub history_concurrency: usize,
}

/// 데몬 모드 설정
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// 일일 전체 동기화 시각 (시)
    pub sync_hour: u32,
    /// 일일 전체 동기화 시각 (분)
    pub sync_minute: u32,
    /// 일일 동기화 기준 시간대
    pub timezone: Tz,
    /// 주기 동기화 간격 (시간)
    pub price_update_interval_hours: u64,
    /// 시작 시 저장된 ETF 수가 이보다 적으면 즉시 동기화
    pub initial_sync_min_count: i64,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            database_max_connections: env_var_parse("DATABASE_MAX_CONNECTIONS", 10),
            sync: SyncConfig {
                batch_size: env_var_parse("SYNC_BATCH_SIZE", 100usize).max(1),
                batch_delay_secs: env_var_parse("SYNC_BATCH_DELAY_SECS", 1),
                batch_jitter_ms: env_var_parse("SYNC_BATCH_JITTER_MS", 0),
            },
            sources: SourceConfig {
                alpha_vantage_api_key: SecretString::from(
                    std::env::var("ALPHA_VANTAGE_API_KEY")
                        .ok()
                        .filter(|v| !v.is_empty())
                        .unwrap_or_else(|| "demo".to_string()),
                ),
                fallback_csv: std::env::var("ETF_FALLBACK_CSV")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("data/etf_master_list.csv")),
                http_timeout_secs: env_var_parse("HTTP_TIMEOUT_SECS", 30),
                history_concurrency: env_var_parse("HISTORY_CONCURRENCY", 8usize).max(1),
            },
            daemon: DaemonConfig {
                sync_hour: env_var_parse("SYNC_HOUR", 6u32).min(23),
                sync_minute: env_var_parse("SYNC_MINUTE", 0u32).min(59),
                timezone: env_var_parse("SYNC_TIMEZONE", chrono_tz::Asia::Seoul),
                price_update_interval_hours: env_var_parse("PRICE_UPDATE_INTERVAL_HOURS", 2u64)
                    .max(1),
                initial_sync_min_count: env_var_parse("INITIAL_SYNC_MIN_COUNT", 10),
            },
        }
    }

    /// DB 명령에 필요한 데이터베이스 URL
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            CollectorError::Config("DATABASE_URL 환경변수가 설정되지 않았습니다".to_string())
        })
    }
}

impl SyncConfig {
    /// 배치 간 고정 딜레이를 Duration으로 반환
    pub fn batch_delay(&self) -> Duration {
        Duration::from_secs(self.batch_delay_secs)
    }

    /// 무작위 지연 상한을 Duration으로 반환
    pub fn batch_jitter(&self) -> Duration {
        Duration::from_millis(self.batch_jitter_ms)
    }
}

impl SourceConfig {
    /// HTTP 타임아웃을 Duration으로 반환
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl DaemonConfig {
    /// 주기 동기화 간격을 Duration으로 반환
    pub fn price_update_interval(&self) -> Duration {
        Duration::from_secs(self.price_update_interval_hours * 3600)
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
