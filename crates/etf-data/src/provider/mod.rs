//! 데이터 Provider 모듈.
//!
//! ## 티커 목록
//! - `NasdaqEtfListProvider`: NASDAQ ETF 스크리너 (인증 불필요)
//! - `AlphaVantageListingProvider`: Alpha Vantage LISTING_STATUS (API 키 필요)
//! - `CsvSnapshotProvider`: 로컬 CSV 스냅샷
//!
//! ## 종목 정보 / 가격 이력
//! - `YahooFinanceProvider`: quoteSummary 메타데이터 + 일봉 종가

pub mod alpha_vantage;
pub mod nasdaq;
pub mod snapshot;
pub mod yahoo;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use alpha_vantage::AlphaVantageListingProvider;
pub use nasdaq::NasdaqEtfListProvider;
pub use snapshot::CsvSnapshotProvider;
pub use yahoo::YahooFinanceProvider;

/// 브라우저 User-Agent (일부 공개 API는 기본 UA를 차단함).
pub(crate) const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// ETF 티커 목록 Provider trait.
#[async_trait]
pub trait TickerListProvider: Send + Sync {
    /// Provider 이름 (로그용).
    fn name(&self) -> &str;

    /// 전체 티커 목록 조회.
    async fn fetch_tickers(&self) -> Result<Vec<String>>;
}

/// 종목 메타데이터 Provider trait.
#[async_trait]
pub trait FundDataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// 단일 종목의 메타데이터 조회.
    async fn fetch_fund_info(&self, ticker: &str) -> Result<FundInfo>;
}

/// 가격 이력 Provider trait.
#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    fn name(&self) -> &str;

    /// 여러 종목의 일봉 종가를 한 번에 조회.
    ///
    /// 결과에 없는 티커는 데이터가 없는 것으로 취급합니다.
    async fn fetch_daily_closes(
        &self,
        tickers: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<HashMap<String, Vec<ClosePoint>>>;
}

/// 일봉 종가 관측치.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosePoint {
    pub date: DateTime<Utc>,
    pub close: f64,
}

impl ClosePoint {
    pub fn new(date: DateTime<Utc>, close: f64) -> Self {
        Self { date, close }
    }
}

/// 배당수익률 원본 표현.
///
/// Provider마다 소수(0.0105)와 퍼센트(1.05)를 섞어서 제공하므로
/// 값을 채운 원본 필드에 따라 구분합니다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DividendYield {
    /// 소수 표현 (0.0105 = 1.05%)
    Fraction(f64),
    /// 이미 퍼센트로 환산된 값
    Percent(f64),
}

impl DividendYield {
    /// 퍼센트 단위 값.
    pub fn as_percent(&self) -> f64 {
        match self {
            Self::Fraction(v) => v * 100.0,
            Self::Percent(v) => *v,
        }
    }
}

/// Provider가 반환하는 종목 메타데이터.
///
/// 모든 필드는 선택적이며, 원본 응답에 없으면 `None`입니다.
/// 여러 후보 필드(예: 현재가/전일 종가)는 그대로 보존하고
/// 어떤 값을 쓸지는 수집 단계에서 결정합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundInfo {
    /// 상품 유형 (ETF, MUTUALFUND, EQUITY ...)
    pub quote_type: Option<String>,
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub description: Option<String>,
    pub exchange: Option<String>,
    pub category: Option<String>,
    pub fund_family: Option<String>,
    pub benchmark: Option<String>,
    pub index_name: Option<String>,

    pub regular_market_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub volume: Option<f64>,
    pub average_volume: Option<f64>,

    pub total_assets: Option<f64>,
    pub market_cap: Option<f64>,
    pub net_assets: Option<f64>,

    /// 퍼센트 (0.09 = 0.09%)
    pub net_expense_ratio: Option<f64>,
    pub annual_report_expense_ratio: Option<f64>,
    pub dividend_yield: Option<DividendYield>,

    /// 소수 표현 연평균 수익률
    pub three_year_average_return: Option<f64>,
    pub five_year_average_return: Option<f64>,

    /// Unix timestamp (초)
    pub first_trade_date: Option<i64>,
    /// Unix timestamp (초)
    pub ex_dividend_date: Option<i64>,
}
