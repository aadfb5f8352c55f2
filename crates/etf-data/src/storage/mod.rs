//! ETF 저장소.
//!
//! 동기화 파이프라인은 배치마다 하나의 작업 단위(`EtfUnitOfWork`)를 열어
//! 조회/삽입/갱신 후 커밋합니다. 커밋하지 않고 drop된 작업 단위는 롤백됩니다.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use etf_core::EtfRecord;

use crate::error::Result;

pub use memory::MemoryEtfStore;
pub use postgres::{Database, DatabaseConfig, PgEtfStore};

/// ETF 저장소.
#[async_trait]
pub trait EtfStore: Send + Sync {
    /// 새 작업 단위(트랜잭션) 시작.
    async fn begin(&self) -> Result<Box<dyn EtfUnitOfWork>>;

    /// 대소문자 구분 없이 티커 조회 (읽기 경로).
    async fn find_by_ticker_ci(&self, ticker: &str) -> Result<Option<EtfRecord>>;

    /// 저장된 ETF 수.
    async fn count(&self) -> Result<i64>;
}

/// 배치 단위 작업.
#[async_trait]
pub trait EtfUnitOfWork: Send {
    /// 정확히 일치하는 티커 조회.
    async fn find_by_ticker(&mut self, ticker: &str) -> Result<Option<EtfRecord>>;

    async fn insert(&mut self, record: &EtfRecord) -> Result<()>;

    /// 기존 레코드 갱신 (`id` 기준).
    async fn update(&mut self, record: &EtfRecord) -> Result<()>;

    /// 변경사항 확정. 이후 작업 단위는 닫힙니다.
    async fn commit(&mut self) -> Result<()>;

    /// 변경사항 폐기. 이후 작업 단위는 닫힙니다.
    async fn rollback(&mut self) -> Result<()>;
}
