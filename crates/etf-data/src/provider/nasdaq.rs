//! NASDAQ ETF 스크리너 Provider.
//!
//! `api.nasdaq.com/api/screener/etf?download=true` 응답에서 전체 ETF 티커를 추출합니다.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{TickerListProvider, BROWSER_USER_AGENT};
use crate::error::{DataError, Result};

const DEFAULT_BASE_URL: &str = "https://api.nasdaq.com";

/// NASDAQ ETF 목록 Provider.
pub struct NasdaqEtfListProvider {
    client: reqwest::Client,
    base_url: String,
}

impl NasdaqEtfListProvider {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    /// 기본 URL 지정 (테스트 서버 등).
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(|e| DataError::ConnectionError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Deserialize)]
struct ScreenerResponse {
    data: Option<ScreenerData>,
}

#[derive(Deserialize)]
struct ScreenerData {
    data: Option<ScreenerTable>,
}

#[derive(Deserialize)]
struct ScreenerTable {
    #[serde(default)]
    rows: Vec<ScreenerRow>,
}

#[derive(Deserialize)]
struct ScreenerRow {
    #[serde(default)]
    symbol: Option<String>,
}

/// 스크리너 JSON 본문에서 티커 추출.
///
/// `data.data` 블록이 없으면 빈 목록을 반환합니다.
fn parse_screener(body: &str) -> Result<Vec<String>> {
    let response: ScreenerResponse = serde_json::from_str(body)?;

    let tickers = response
        .data
        .and_then(|d| d.data)
        .map(|t| t.rows)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|row| row.symbol)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    Ok(tickers)
}

#[async_trait]
impl TickerListProvider for NasdaqEtfListProvider {
    fn name(&self) -> &str {
        "NASDAQ"
    }

    async fn fetch_tickers(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/screener/etf", self.base_url);

        let body = self
            .client
            .get(&url)
            .query(&[("download", "true")])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let tickers = parse_screener(&body)?;
        debug!(count = tickers.len(), "NASDAQ ETF 스크리너 응답 파싱 완료");
        Ok(tickers)
    }
}
