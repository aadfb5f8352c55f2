//! ETF 마스터 동기화 파이프라인.
//!
//! 이 crate는 다음을 제공합니다:
//! - 티커 목록 조회 (소스 폴백)
//! - 배치 단위 종목 정보 수집과 기간 수익률 계산
//! - 저장소 upsert 및 단일 실행 보장 오케스트레이터
//! - CLI / 데몬 바이너리

pub mod config;
pub mod error;
pub mod modules;
pub mod pipeline;
pub mod schedule;
pub mod stats;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use stats::SyncRun;
