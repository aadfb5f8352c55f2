//! Yahoo Finance Provider.
//!
//! - 종목 메타데이터: `v10/finance/quoteSummary` + `v7/finance/quote` (crumb 인증)
//! - 가격 이력: `yahoo_finance_api` 크레이트의 일봉 조회
//!
//! quoteSummary는 숫자를 `{"raw": 0.0105, "fmt": "1.05%"}` 형태로 감싸서 내려주고,
//! v7 quote는 일부 값(`dividendYield`, `netExpenseRatio`)을 이미 퍼센트로 환산해서
//! 내려줍니다. 이 차이는 모두 이 모듈 안에서 `FundInfo`로 정리합니다.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{
    ClosePoint, DividendYield, FundDataProvider, FundInfo, PriceHistoryProvider,
    BROWSER_USER_AGENT,
};
use crate::error::{DataError, Result};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
/// 세션 쿠키 발급용 URL
const COOKIE_URL: &str = "https://fc.yahoo.com";
const SUMMARY_MODULES: &str =
    "price,summaryDetail,defaultKeyStatistics,fundProfile,assetProfile,quoteType";

/// Yahoo Finance 메타데이터/가격 이력 Provider.
pub struct YahooFinanceProvider {
    client: reqwest::Client,
    connector: yahoo_finance_api::YahooConnector,
    base_url: String,
    /// quoteSummary 호출용 crumb 토큰 (쿠키와 짝을 이룸)
    crumb: RwLock<Option<String>>,
    /// 가격 이력 동시 요청 수
    history_concurrency: usize,
}

impl YahooFinanceProvider {
    pub fn new(timeout: Duration, history_concurrency: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(|e| DataError::ConnectionError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        let connector = yahoo_finance_api::YahooConnector::new()
            .map_err(|e| DataError::ConnectionError(format!("Yahoo Finance 연결 실패: {}", e)))?;

        Ok(Self {
            client,
            connector,
            base_url: DEFAULT_BASE_URL.to_string(),
            crumb: RwLock::new(None),
            history_concurrency: history_concurrency.max(1),
        })
    }

    /// crumb 토큰 조회 (캐시 사용, `refresh`면 재발급).
    async fn crumb(&self, refresh: bool) -> Result<String> {
        if !refresh {
            if let Some(crumb) = self.crumb.read().await.as_ref() {
                return Ok(crumb.clone());
            }
        }

        let mut guard = self.crumb.write().await;
        if !refresh {
            if let Some(crumb) = guard.as_ref() {
                return Ok(crumb.clone());
            }
        }

        // 쿠키만 필요하므로 응답 상태는 무시
        if let Err(e) = self.client.get(COOKIE_URL).send().await {
            debug!(error = %e, "Yahoo 쿠키 요청 실패");
        }

        let crumb = self
            .client
            .get(format!("{}/v1/test/getcrumb", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?
            .trim()
            .to_string();

        if crumb.is_empty() || crumb.contains('<') {
            return Err(DataError::FetchError("Yahoo crumb 발급 실패".to_string()));
        }

        debug!("Yahoo crumb 발급 완료");
        *guard = Some(crumb.clone());
        Ok(crumb)
    }

    /// crumb이 필요한 GET 요청. 인증 실패 시 crumb을 재발급해 한 번 재시도합니다.
    async fn get_with_crumb(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        let mut refresh = false;
        loop {
            let crumb = self.crumb(refresh).await?;
            let response = self
                .client
                .get(url)
                .query(query)
                .query(&[("crumb", crumb.as_str())])
                .send()
                .await?;

            let status = response.status();
            if !refresh
                && (status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN)
            {
                refresh = true;
                continue;
            }

            return Ok(response.error_for_status()?.text().await?);
        }
    }

    /// 단일 종목 일봉 종가 조회.
    async fn fetch_closes(
        &self,
        ticker: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<ClosePoint>> {
        let response = self
            .connector
            .get_quote_history_interval(ticker, start, end, "1d")
            .await
            .map_err(|e| DataError::FetchError(format!("Yahoo Finance API 오류 ({}): {}", ticker, e)))?;

        let quotes = response
            .quotes()
            .map_err(|e| DataError::ParseError(format!("Quote 파싱 오류: {}", e)))?;

        let mut closes: Vec<ClosePoint> = quotes
            .iter()
            .filter_map(|q| {
                let date = Utc.timestamp_opt(q.timestamp as i64, 0).single()?;
                // 수정 종가 우선, 없으면 종가
                let close = if q.adjclose.is_finite() && q.adjclose > 0.0 {
                    q.adjclose
                } else {
                    q.close
                };
                Some(ClosePoint::new(date, close))
            })
            .collect();

        closes.sort_by_key(|p| p.date);
        Ok(closes)
    }
}

#[async_trait]
impl FundDataProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    async fn fetch_fund_info(&self, ticker: &str) -> Result<FundInfo> {
        let summary_url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, ticker);
        let summary = self
            .get_with_crumb(&summary_url, &[("modules", SUMMARY_MODULES)])
            .await?;

        // v7 quote는 보조 데이터이므로 실패해도 계속 진행
        let quote_url = format!("{}/v7/finance/quote", self.base_url);
        let quote = match self.get_with_crumb(&quote_url, &[("symbols", ticker)]).await {
            Ok(body) => Some(body),
            Err(e) => {
                debug!(ticker = ticker, error = %e, "Yahoo quote 조회 실패, quoteSummary만 사용");
                None
            }
        };

        parse_fund_info(&summary, quote.as_deref())
    }
}

#[async_trait]
impl PriceHistoryProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    async fn fetch_daily_closes(
        &self,
        tickers: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<HashMap<String, Vec<ClosePoint>>> {
        if tickers.is_empty() {
            return Ok(HashMap::new());
        }

        let start = to_offset_datetime(start)?;
        let end = to_offset_datetime(end)?;

        let this = self;
        let results: Vec<(String, Result<Vec<ClosePoint>>)> = stream::iter(tickers.iter().cloned())
            .map(|ticker| async move {
                let closes = this.fetch_closes(&ticker, start, end).await;
                (ticker, closes)
            })
            .buffer_unordered(self.history_concurrency)
            .collect()
            .await;

        let mut failed = 0usize;
        let mut history = HashMap::with_capacity(results.len());
        for (ticker, result) in results {
            match result {
                Ok(closes) if !closes.is_empty() => {
                    history.insert(ticker, closes);
                }
                Ok(_) => {}
                Err(e) => {
                    failed += 1;
                    debug!(ticker = %ticker, error = %e, "가격 이력 조회 실패");
                }
            }
        }

        if failed == tickers.len() {
            return Err(DataError::FetchError(format!(
                "가격 이력 일괄 조회 실패 ({}개 전체)",
                failed
            )));
        }
        if failed > 0 {
            warn!(failed, total = tickers.len(), "일부 종목 가격 이력 조회 실패");
        }

        Ok(history)
    }
}

fn to_offset_datetime(dt: DateTime<Utc>) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(dt.timestamp())
        .map_err(|e| DataError::ParseError(format!("시각 변환 실패 ({}): {}", dt, e)))
}

// ==================== 응답 파싱 ====================

/// `{"raw": 1.23, "fmt": "1.23"}` 형태의 숫자.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
struct RawNumber {
    #[serde(default)]
    raw: Option<f64>,
}

fn raw(value: &Option<RawNumber>) -> Option<f64> {
    (*value).and_then(|v| v.raw).filter(|v| v.is_finite())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryEnvelope {
    quote_summary: SummaryBody,
}

#[derive(Deserialize)]
struct SummaryBody {
    #[serde(default)]
    result: Option<Vec<SummaryModules>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct YahooApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SummaryModules {
    price: Option<PriceModule>,
    summary_detail: Option<SummaryDetail>,
    default_key_statistics: Option<KeyStatistics>,
    fund_profile: Option<FundProfile>,
    asset_profile: Option<AssetProfile>,
    quote_type: Option<QuoteTypeModule>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PriceModule {
    long_name: Option<String>,
    short_name: Option<String>,
    regular_market_price: Option<RawNumber>,
    regular_market_previous_close: Option<RawNumber>,
    regular_market_volume: Option<RawNumber>,
    market_cap: Option<RawNumber>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SummaryDetail {
    previous_close: Option<RawNumber>,
    volume: Option<RawNumber>,
    average_volume: Option<RawNumber>,
    total_assets: Option<RawNumber>,
    market_cap: Option<RawNumber>,
    /// ETF 분배수익률 (소수)
    #[serde(rename = "yield")]
    yield_: Option<RawNumber>,
    ex_dividend_date: Option<RawNumber>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct KeyStatistics {
    category: Option<String>,
    fund_family: Option<String>,
    total_assets: Option<RawNumber>,
    annual_report_expense_ratio: Option<RawNumber>,
    three_year_average_return: Option<RawNumber>,
    five_year_average_return: Option<RawNumber>,
    fund_inception_date: Option<RawNumber>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FundProfile {
    family: Option<String>,
    category_name: Option<String>,
    benchmark: Option<String>,
    fees_expenses_investment: Option<FeesExpenses>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FeesExpenses {
    annual_report_expense_ratio: Option<RawNumber>,
    net_exp_ratio: Option<RawNumber>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AssetProfile {
    long_business_summary: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct QuoteTypeModule {
    quote_type: Option<String>,
    exchange: Option<String>,
    long_name: Option<String>,
    short_name: Option<String>,
    first_trade_date_epoch_utc: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEnvelope {
    quote_response: QuoteBody,
}

#[derive(Deserialize)]
struct QuoteBody {
    #[serde(default)]
    result: Vec<QuoteResult>,
}

/// v7 quote 결과 (숫자는 평문, `dividendYield`/`netExpenseRatio`는 퍼센트).
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct QuoteResult {
    regular_market_price: Option<f64>,
    regular_market_volume: Option<f64>,
    average_daily_volume3_month: Option<f64>,
    net_assets: Option<f64>,
    net_expense_ratio: Option<f64>,
    dividend_yield: Option<f64>,
    first_trade_date_milliseconds: Option<i64>,
    index_name: Option<String>,
}

/// quoteSummary(필수)와 v7 quote(선택) 응답을 `FundInfo`로 변환.
fn parse_fund_info(summary_body: &str, quote_body: Option<&str>) -> Result<FundInfo> {
    let envelope: SummaryEnvelope = serde_json::from_str(summary_body)?;

    if let Some(err) = envelope.quote_summary.error {
        return Err(DataError::FetchError(format!(
            "Yahoo quoteSummary 오류: {} {}",
            err.code.unwrap_or_default(),
            err.description.unwrap_or_default()
        )));
    }

    let modules = envelope
        .quote_summary
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| DataError::EmptyResult("Yahoo quoteSummary 결과 비어있음".to_string()))?;

    let quote = match quote_body {
        Some(body) => serde_json::from_str::<QuoteEnvelope>(body)
            .ok()
            .and_then(|q| q.quote_response.result.into_iter().next())
            .unwrap_or_default(),
        None => QuoteResult::default(),
    };

    let price = modules.price.unwrap_or_default();
    let detail = modules.summary_detail.unwrap_or_default();
    let stats = modules.default_key_statistics.unwrap_or_default();
    let profile = modules.fund_profile.unwrap_or_default();
    let fees = profile.fees_expenses_investment.unwrap_or_default();
    let asset = modules.asset_profile.unwrap_or_default();
    let quote_type = modules.quote_type.unwrap_or_default();

    // 분배수익률: summaryDetail.yield(소수) 우선, 없으면 v7 dividendYield(퍼센트)
    let summary_yield = raw(&detail.yield_);
    let dividend_yield = match (summary_yield, quote.dividend_yield) {
        (Some(v), _) if v != 0.0 => Some(DividendYield::Fraction(v)),
        (_, Some(p)) if p.is_finite() => Some(DividendYield::Percent(p)),
        (Some(v), _) => Some(DividendYield::Fraction(v)),
        _ => None,
    };

    let net_expense_ratio = quote
        .net_expense_ratio
        .filter(|v| v.is_finite())
        .or_else(|| raw(&fees.net_exp_ratio).map(|v| v * 100.0));
    let annual_report_expense_ratio = raw(&stats.annual_report_expense_ratio)
        .or_else(|| raw(&fees.annual_report_expense_ratio))
        .map(|v| v * 100.0);

    let first_trade_date = quote
        .first_trade_date_milliseconds
        .map(|ms| ms / 1000)
        .or(quote_type.first_trade_date_epoch_utc)
        .or_else(|| raw(&stats.fund_inception_date).map(|v| v as i64));

    Ok(FundInfo {
        quote_type: quote_type.quote_type,
        long_name: price.long_name.or(quote_type.long_name),
        short_name: price.short_name.or(quote_type.short_name),
        description: asset.long_business_summary,
        exchange: quote_type.exchange,
        category: stats.category.or(profile.category_name),
        fund_family: stats.fund_family.or(profile.family),
        benchmark: profile.benchmark,
        index_name: quote.index_name,
        regular_market_price: quote
            .regular_market_price
            .or_else(|| raw(&price.regular_market_price)),
        previous_close: raw(&detail.previous_close)
            .or_else(|| raw(&price.regular_market_previous_close)),
        volume: raw(&detail.volume)
            .or(quote.regular_market_volume)
            .or_else(|| raw(&price.regular_market_volume)),
        average_volume: raw(&detail.average_volume).or(quote.average_daily_volume3_month),
        total_assets: raw(&detail.total_assets).or_else(|| raw(&stats.total_assets)),
        market_cap: raw(&detail.market_cap).or_else(|| raw(&price.market_cap)),
        net_assets: quote.net_assets,
        net_expense_ratio,
        annual_report_expense_ratio,
        dividend_yield,
        three_year_average_return: raw(&stats.three_year_average_return),
        five_year_average_return: raw(&stats.five_year_average_return),
        first_trade_date,
        ex_dividend_date: raw(&detail.ex_dividend_date).map(|v| v as i64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPY_SUMMARY: &str = r#"{
        "quoteSummary": {
            "result": [{
                "price": {
                    "longName": "SPDR S&P 500 ETF Trust",
                    "shortName": "SPDR S&P 500",
                    "regularMarketPrice": {"raw": 512.34, "fmt": "512.34"},
                    "marketCap": {}
                },
                "summaryDetail": {
                    "previousClose": {"raw": 510.0, "fmt": "510.00"},
                    "volume": {"raw": 61234567, "fmt": "61.23M"},
                    "averageVolume": {"raw": 70000000, "fmt": "70M"},
                    "totalAssets": {"raw": 505000000000, "fmt": "505B"},
                    "yield": {"raw": 0.0123, "fmt": "1.23%"},
                    "exDividendDate": {"raw": 1710460800, "fmt": "2024-03-15"}
                },
                "defaultKeyStatistics": {
                    "category": "Large Blend",
                    "fundFamily": " SPDR State Street Global Advisors ",
                    "threeYearAverageReturn": {"raw": 0.1012, "fmt": "10.12%"},
                    "fiveYearAverageReturn": {"raw": 0.1451, "fmt": "14.51%"},
                    "annualReportExpenseRatio": {"raw": 0.000945, "fmt": "0.09%"}
                },
                "fundProfile": {
                    "family": "SPDR State Street Global Advisors",
                    "categoryName": "Large Blend",
                    "feesExpensesInvestment": {"netExpRatio": {"raw": 0.000945}}
                },
                "assetProfile": {"longBusinessSummary": "The trust seeks to track the S&P 500."},
                "quoteType": {
                    "quoteType": "ETF",
                    "exchange": "PCX",
                    "firstTradeDateEpochUtc": 728317800
                }
            }],
            "error": null
        }
    }"#;

    const SPY_QUOTE: &str = r#"{
        "quoteResponse": {
            "result": [{
                "symbol": "SPY",
                "regularMarketPrice": 513.1,
                "netAssets": 498000000000.0,
                "netExpenseRatio": 0.0945,
                "dividendYield": 1.23,
                "firstTradeDateMilliseconds": 728317800000
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_summary_and_quote() {
        let info = parse_fund_info(SPY_SUMMARY, Some(SPY_QUOTE)).unwrap();

        assert_eq!(info.quote_type.as_deref(), Some("ETF"));
        assert_eq!(info.long_name.as_deref(), Some("SPDR S&P 500 ETF Trust"));
        assert_eq!(info.exchange.as_deref(), Some("PCX"));
        assert_eq!(info.category.as_deref(), Some("Large Blend"));
        // 공백 정리는 수집 단계 담당
        assert_eq!(
            info.fund_family.as_deref(),
            Some(" SPDR State Street Global Advisors ")
        );
        assert_eq!(info.regular_market_price, Some(513.1));
        assert_eq!(info.previous_close, Some(510.0));
        assert_eq!(info.total_assets, Some(505_000_000_000.0));
        assert_eq!(info.market_cap, None);
        assert_eq!(info.net_assets, Some(498_000_000_000.0));
        assert_eq!(info.net_expense_ratio, Some(0.0945));
        assert_eq!(info.dividend_yield, Some(DividendYield::Fraction(0.0123)));
        assert_eq!(info.first_trade_date, Some(728_317_800));
        assert_eq!(info.ex_dividend_date, Some(1_710_460_800));
    }

    #[test]
    fn test_parse_summary_only_uses_fallbacks() {
        let summary = r#"{
            "quoteSummary": {
                "result": [{
                    "price": {"regularMarketPrice": {"raw": 25.5}},
                    "summaryDetail": {"yield": {"raw": 0}},
                    "fundProfile": {"feesExpensesInvestment": {"netExpRatio": {"raw": 0.0035}}},
                    "quoteType": {"quoteType": "MUTUALFUND", "firstTradeDateEpochUtc": 946684800}
                }],
                "error": null
            }
        }"#;

        let info = parse_fund_info(summary, None).unwrap();

        assert_eq!(info.quote_type.as_deref(), Some("MUTUALFUND"));
        assert_eq!(info.regular_market_price, Some(25.5));
        assert!((info.net_expense_ratio.unwrap() - 0.35).abs() < 1e-9);
        assert_eq!(info.dividend_yield, Some(DividendYield::Fraction(0.0)));
        assert_eq!(info.first_trade_date, Some(946_684_800));
    }

    #[test]
    fn test_percent_yield_from_quote_when_summary_missing() {
        let summary = r#"{"quoteSummary": {"result": [{"quoteType": {"quoteType": "ETF"}}], "error": null}}"#;
        let quote = r#"{"quoteResponse": {"result": [{"dividendYield": 1.05}], "error": null}}"#;

        let info = parse_fund_info(summary, Some(quote)).unwrap();
        assert_eq!(info.dividend_yield, Some(DividendYield::Percent(1.05)));
    }

    #[test]
    fn test_parse_error_payload() {
        let body = r#"{"quoteSummary": {"result": null, "error": {"code": "Not Found", "description": "Quote not found for symbol: ZZZZ"}}}"#;
        assert!(matches!(
            parse_fund_info(body, None),
            Err(DataError::FetchError(_))
        ));
    }

    #[test]
    fn test_parse_empty_result() {
        let body = r#"{"quoteSummary": {"result": [], "error": null}}"#;
        assert!(matches!(
            parse_fund_info(body, None),
            Err(DataError::EmptyResult(_))
        ));
    }
}
