//! 기간 수익률 계산 모듈.
//!
//! 배치당 한 번 일봉 종가를 일괄 조회하고, 매번 원본 종가에서 1개월/1년/3년/5년
//! 수익률을 새로 계산합니다.

use chrono::{Duration, Utc};
use etf_core::numeric::round_dp;
use etf_core::{ReturnHorizon, TrailingReturns};
use etf_data::{ClosePoint, PriceHistoryProvider};
use std::collections::HashMap;
use std::sync::Arc;

/// 가격 이력 조회 기간 (5년 + 30일)
pub const HISTORY_LOOKBACK_DAYS: i64 = 5 * 365 + 30;

/// 배치 단위 수익률 계산기
#[derive(Clone)]
pub struct ReturnCalculator {
    provider: Arc<dyn PriceHistoryProvider>,
}

impl ReturnCalculator {
    pub fn new(provider: Arc<dyn PriceHistoryProvider>) -> Self {
        Self { provider }
    }

    /// 배치의 티커별 기간 수익률 계산.
    ///
    /// 계산 가능한 기간이 하나도 없는 티커는 결과에서 빠집니다.
    /// 일괄 조회가 실패하면 빈 결과를 반환합니다.
    pub async fn compute(&self, tickers: &[String]) -> HashMap<String, TrailingReturns> {
        if tickers.is_empty() {
            return HashMap::new();
        }

        let end = Utc::now();
        let start = end - Duration::days(HISTORY_LOOKBACK_DAYS);

        let history = match self.provider.fetch_daily_closes(tickers, start, end).await {
            Ok(history) => history,
            Err(e) => {
                tracing::error!(
                    source = self.provider.name(),
                    tickers = tickers.len(),
                    error = %e,
                    "가격 이력 일괄 조회 실패"
                );
                return HashMap::new();
            }
        };

        let mut results = HashMap::new();
        for ticker in tickers {
            let Some(closes) = history.get(ticker) else {
                continue;
            };
            if let Some(returns) = trailing_returns(closes) {
                results.insert(ticker.clone(), returns);
            }
        }

        tracing::debug!(
            requested = tickers.len(),
            computed = results.len(),
            "배치 수익률 계산 완료"
        );
        results
    }
}

/// 종가 시계열에서 기간 수익률 계산.
///
/// 유효한 종가(유한한 양수)가 2개 미만이거나 계산된 기간이 없으면 `None`.
///
/// 기준가는 `최신일 - 기간` 시점 이전(포함)의 마지막 종가이며, 이력이 그보다 짧으면
/// 해당 시점 이후의 첫 종가를 사용합니다. 최신 종가 자신은 기준가가 될 수 없습니다.
pub fn trailing_returns(closes: &[ClosePoint]) -> Option<TrailingReturns> {
    let mut series: Vec<ClosePoint> = closes
        .iter()
        .copied()
        .filter(|p| p.close.is_finite() && p.close > 0.0)
        .collect();
    if series.len() < 2 {
        return None;
    }
    series.sort_by_key(|p| p.date);

    let (history, latest) = series.split_at(series.len() - 1);
    let current = latest[0];

    let mut returns = TrailingReturns::default();
    for horizon in ReturnHorizon::ALL {
        let cutoff = current.date - horizon.window();

        let anchor = history
            .iter()
            .rev()
            .find(|p| p.date <= cutoff)
            .or_else(|| history.iter().find(|p| p.date >= cutoff));

        if let Some(anchor) = anchor {
            let pct = (current.close - anchor.close) / anchor.close * 100.0;
            if let Some(value) = round_dp(pct, 2) {
                returns.set(horizon, value);
            }
        }
    }

    if returns.is_empty() {
        None
    } else {
        Some(returns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn point(days_ago: i64, close: f64) -> ClosePoint {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap();
        ClosePoint::new(t0 - Duration::days(days_ago), close)
    }

    #[test]
    fn test_anchor_selection() {
        let closes = vec![point(400, 100.0), point(40, 110.0), point(0, 120.0)];
        let returns = trailing_returns(&closes).unwrap();

        assert_eq!(returns.return_1m, Some(dec!(9.09)));
        assert_eq!(returns.return_1y, Some(dec!(20.00)));
    }

    #[test]
    fn test_short_history_uses_first_observation() {
        // 3년/5년 기준일 이전 데이터가 없으면 가장 오래된 종가 사용
        let closes = vec![point(400, 100.0), point(40, 110.0), point(0, 120.0)];
        let returns = trailing_returns(&closes).unwrap();

        assert_eq!(returns.return_3y, Some(dec!(20.00)));
        assert_eq!(returns.return_5y, Some(dec!(20.00)));
    }

    #[test]
    fn test_unsorted_input() {
        let closes = vec![point(0, 120.0), point(400, 100.0), point(40, 110.0)];
        let returns = trailing_returns(&closes).unwrap();
        assert_eq!(returns.return_1y, Some(dec!(20.00)));
    }

    #[test]
    fn test_fewer_than_two_observations() {
        assert!(trailing_returns(&[]).is_none());
        assert!(trailing_returns(&[point(0, 120.0)]).is_none());
        // 무효 종가는 제외 후 판단
        assert!(trailing_returns(&[point(10, f64::NAN), point(5, 0.0), point(0, 120.0)]).is_none());
    }

    #[test]
    fn test_negative_return() {
        let closes = vec![point(36, 50.0), point(0, 40.0)];
        let returns = trailing_returns(&closes).unwrap();
        assert_eq!(returns.return_1m, Some(dec!(-20.00)));
    }
}
