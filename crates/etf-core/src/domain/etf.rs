//! ETF 레코드 및 부분 업데이트(patch) 타입.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::returns::TrailingReturns;

/// 저장된 ETF 레코드.
///
/// 티커(`ticker`)가 고유 식별자입니다. 원본 대소문자를 그대로 저장합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct EtfRecord {
    pub id: Uuid,
    pub ticker: String,

    // 기본 정보
    pub name: Option<String>,
    pub description: Option<String>,
    pub issuer: Option<String>,
    pub category: Option<String>,
    pub underlying_index: Option<String>,
    pub exchange: Option<String>,

    // 시세 및 규모
    pub price: Option<Decimal>,
    pub volume: Option<i64>,
    /// 총자산 (없으면 시가총액)
    pub market_cap: Option<i64>,
    pub net_assets: Option<i64>,
    pub inception_date: Option<DateTime<Utc>>,

    // 비용 및 배당 (퍼센트)
    pub expense_ratio: Option<Decimal>,
    pub dividend_yield: Option<Decimal>,
    pub ex_dividend_date: Option<DateTime<Utc>>,

    // 기간 수익률 (퍼센트)
    pub return_1m: Option<Decimal>,
    pub return_1y: Option<Decimal>,
    pub return_3y: Option<Decimal>,
    pub return_5y: Option<Decimal>,
    /// Provider 제공 3년 연평균 수익률
    pub return_3y_avg: Option<Decimal>,
    /// Provider 제공 5년 연평균 수익률
    pub return_5y_avg: Option<Decimal>,

    /// 마지막 동기화 시각
    pub data_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl EtfRecord {
    /// patch로부터 새 레코드 생성.
    ///
    /// `created_at`과 `data_updated_at`은 모두 `now`로 설정됩니다.
    pub fn from_patch(patch: &EtfPatch, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticker: patch.ticker.clone(),
            name: patch.name.clone(),
            description: patch.description.clone(),
            issuer: patch.issuer.clone(),
            category: patch.category.clone(),
            underlying_index: patch.underlying_index.clone(),
            exchange: patch.exchange.clone(),
            price: patch.price,
            volume: patch.volume,
            market_cap: patch.market_cap,
            net_assets: patch.net_assets,
            inception_date: patch.inception_date,
            expense_ratio: patch.expense_ratio,
            dividend_yield: patch.dividend_yield,
            ex_dividend_date: patch.ex_dividend_date,
            return_1m: patch.return_1m,
            return_1y: patch.return_1y,
            return_3y: patch.return_3y,
            return_5y: patch.return_5y,
            return_3y_avg: patch.return_3y_avg,
            return_5y_avg: patch.return_5y_avg,
            data_updated_at: Some(now),
            created_at: now,
        }
    }
}

/// 한 번의 동기화에서 수집된 부분 ETF 데이터.
///
/// `None` 필드는 "이번 수집에서 값을 얻지 못함"을 뜻하며, 삭제를 의미하지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtfPatch {
    pub ticker: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub issuer: Option<String>,
    pub category: Option<String>,
    pub underlying_index: Option<String>,
    pub exchange: Option<String>,
    pub price: Option<Decimal>,
    pub volume: Option<i64>,
    pub market_cap: Option<i64>,
    pub net_assets: Option<i64>,
    pub inception_date: Option<DateTime<Utc>>,
    pub expense_ratio: Option<Decimal>,
    pub dividend_yield: Option<Decimal>,
    pub ex_dividend_date: Option<DateTime<Utc>>,
    pub return_1m: Option<Decimal>,
    pub return_1y: Option<Decimal>,
    pub return_3y: Option<Decimal>,
    pub return_5y: Option<Decimal>,
    pub return_3y_avg: Option<Decimal>,
    pub return_5y_avg: Option<Decimal>,
    /// 수집 시각 (UTC)
    pub fetched_at: DateTime<Utc>,
}

impl EtfPatch {
    /// 모든 필드가 비어있는 patch 생성.
    pub fn empty(ticker: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            ticker: ticker.into(),
            name: None,
            description: None,
            issuer: None,
            category: None,
            underlying_index: None,
            exchange: None,
            price: None,
            volume: None,
            market_cap: None,
            net_assets: None,
            inception_date: None,
            expense_ratio: None,
            dividend_yield: None,
            ex_dividend_date: None,
            return_1m: None,
            return_1y: None,
            return_3y: None,
            return_5y: None,
            return_3y_avg: None,
            return_5y_avg: None,
            fetched_at,
        }
    }

    /// 기간 수익률 병합. 계산된 값만 덮어씁니다.
    pub fn apply_returns(&mut self, returns: &TrailingReturns) {
        if returns.return_1m.is_some() {
            self.return_1m = returns.return_1m;
        }
        if returns.return_1y.is_some() {
            self.return_1y = returns.return_1y;
        }
        if returns.return_3y.is_some() {
            self.return_3y = returns.return_3y;
        }
        if returns.return_5y.is_some() {
            self.return_5y = returns.return_5y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_patch_sets_timestamps() {
        let now = Utc::now();
        let mut patch = EtfPatch::empty("SPY", now - chrono::Duration::minutes(3));
        patch.name = Some("SPDR S&P 500 ETF Trust".to_string());
        patch.price = Some(dec!(512.34));

        let record = EtfRecord::from_patch(&patch, now);

        assert_eq!(record.ticker, "SPY");
        assert_eq!(record.price, Some(dec!(512.34)));
        assert_eq!(record.created_at, now);
        assert_eq!(record.data_updated_at, Some(now));
    }

    #[test]
    fn test_apply_returns_keeps_missing_horizons() {
        let mut patch = EtfPatch::empty("QQQ", Utc::now());
        patch.return_5y = Some(dec!(120.5));

        let returns = TrailingReturns {
            return_1m: Some(dec!(2.1)),
            return_1y: Some(dec!(15.0)),
            ..Default::default()
        };
        patch.apply_returns(&returns);

        assert_eq!(patch.return_1m, Some(dec!(2.1)));
        assert_eq!(patch.return_1y, Some(dec!(15.0)));
        assert_eq!(patch.return_3y, None);
        assert_eq!(patch.return_5y, Some(dec!(120.5)));
    }
}
