//! 종목 정보 수집 모듈.
//!
//! Provider가 반환한 `FundInfo`를 저장용 `EtfPatch`로 변환합니다.
//! 후보 필드 우선순위와 단위 정규화는 `derive_patch`에 모여 있습니다.

use chrono::{DateTime, TimeZone, Utc};
use etf_core::numeric::{fraction_to_percent, round_dp, whole_number};
use etf_core::EtfPatch;
use etf_data::{FundDataProvider, FundInfo};
use std::sync::Arc;

/// 수집 대상 상품 유형
const ACCEPTED_QUOTE_TYPES: [&str; 2] = ["ETF", "MUTUALFUND"];

/// 배치 단위 종목 정보 수집기
#[derive(Clone)]
pub struct Enricher {
    provider: Arc<dyn FundDataProvider>,
}

impl Enricher {
    pub fn new(provider: Arc<dyn FundDataProvider>) -> Self {
        Self { provider }
    }

    /// 배치의 각 티커 정보를 조회해 patch 목록 생성.
    ///
    /// 조회 실패나 대상이 아닌 상품 유형은 경고 로그 후 건너뜁니다.
    pub async fn enrich(&self, tickers: &[String]) -> Vec<EtfPatch> {
        let mut patches = Vec::with_capacity(tickers.len());

        for ticker in tickers {
            match self.provider.fetch_fund_info(ticker).await {
                Ok(info) => match derive_patch(ticker, &info, Utc::now()) {
                    Some(patch) => patches.push(patch),
                    None => {
                        tracing::warn!(
                            ticker = %ticker,
                            quote_type = info.quote_type.as_deref().unwrap_or("-"),
                            "ETF/펀드가 아님, 건너뜀"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        ticker = %ticker,
                        source = self.provider.name(),
                        error = %e,
                        "종목 정보 조회 실패"
                    );
                }
            }
        }

        tracing::debug!(
            requested = tickers.len(),
            enriched = patches.len(),
            "배치 종목 정보 수집 완료"
        );
        patches
    }
}

/// `FundInfo`에서 저장용 patch 생성.
///
/// ETF/MUTUALFUND가 아니면 `None`.
pub fn derive_patch(ticker: &str, info: &FundInfo, fetched_at: DateTime<Utc>) -> Option<EtfPatch> {
    let quote_type = info.quote_type.as_deref()?;
    if !ACCEPTED_QUOTE_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(quote_type))
    {
        return None;
    }

    let mut patch = EtfPatch::empty(ticker, fetched_at);

    patch.name = non_blank(info.long_name.as_deref()).or_else(|| non_blank(info.short_name.as_deref()));
    patch.description = non_blank(info.description.as_deref());
    patch.issuer = non_blank(info.fund_family.as_deref());
    patch.category = non_blank(info.category.as_deref());
    patch.underlying_index =
        non_blank(info.benchmark.as_deref()).or_else(|| non_blank(info.index_name.as_deref()));
    patch.exchange = non_blank(info.exchange.as_deref());

    patch.price = [info.regular_market_price, info.previous_close]
        .into_iter()
        .flatten()
        .find(|p| p.is_finite() && *p > 0.0)
        .and_then(|p| round_dp(p, 4));
    patch.volume = first_whole(&[info.volume, info.average_volume]);
    patch.market_cap = first_whole(&[info.total_assets, info.market_cap]);
    patch.net_assets = info.net_assets.and_then(whole_number);

    // 순비용 0은 미제공으로 보고 연차보고서 값 사용
    patch.expense_ratio = info
        .net_expense_ratio
        .filter(|r| *r != 0.0)
        .or(info.annual_report_expense_ratio)
        .and_then(|r| round_dp(r, 4));
    patch.dividend_yield = info
        .dividend_yield
        .and_then(|y| round_dp(y.as_percent(), 4));

    patch.return_3y_avg = info
        .three_year_average_return
        .and_then(|r| fraction_to_percent(r, 2));
    patch.return_5y_avg = info
        .five_year_average_return
        .and_then(|r| fraction_to_percent(r, 2));

    patch.inception_date = info.first_trade_date.and_then(epoch_to_utc);
    patch.ex_dividend_date = info.ex_dividend_date.and_then(epoch_to_utc);

    Some(patch)
}

/// 앞뒤 공백 제거 후 비어있으면 `None`.
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// 후보 중 처음으로 0보다 큰 값을 정수로.
fn first_whole(candidates: &[Option<f64>]) -> Option<i64> {
    candidates.iter().flatten().find_map(|v| whole_number(*v))
}

fn epoch_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}
