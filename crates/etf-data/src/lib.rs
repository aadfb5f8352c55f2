//! ETF 데이터 수집 및 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - 티커 목록 Provider (NASDAQ 스크리너, Alpha Vantage, CSV 스냅샷)
//! - Yahoo Finance 펀드 정보 및 일별 종가 Provider
//! - PostgreSQL / 메모리 ETF 저장소

pub mod error;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};

pub use provider::{
    AlphaVantageListingProvider, ClosePoint, CsvSnapshotProvider, DividendYield,
    FundDataProvider, FundInfo, NasdaqEtfListProvider, PriceHistoryProvider, TickerListProvider,
    YahooFinanceProvider,
};
pub use storage::{
    Database, DatabaseConfig, EtfStore, EtfUnitOfWork, MemoryEtfStore, PgEtfStore,
};
