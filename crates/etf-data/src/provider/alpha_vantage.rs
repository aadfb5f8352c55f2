//! Alpha Vantage LISTING_STATUS Provider.
//!
//! CSV 형식의 상장 종목 목록에서 `assetType=ETF`, `status=Active`만 추출합니다.
//! API 키가 없으면 `demo` 키를 사용합니다.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use super::TickerListProvider;
use crate::error::{DataError, Result};

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

/// Alpha Vantage 상장 목록 Provider.
pub struct AlphaVantageListingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl AlphaVantageListingProvider {
    pub fn new(api_key: SecretString, timeout: Duration) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, timeout)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::ConnectionError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingRow {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    asset_type: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// LISTING_STATUS CSV 본문에서 활성 ETF 티커 추출.
fn parse_listing_csv(body: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut tickers = Vec::new();
    for row in reader.deserialize::<ListingRow>() {
        let row = row?;
        if row.asset_type.as_deref() != Some("ETF") || row.status.as_deref() != Some("Active") {
            continue;
        }

        if let Some(symbol) = row.symbol.as_deref().map(str::trim) {
            if !symbol.is_empty() {
                tickers.push(symbol.to_string());
            }
        }
    }

    Ok(tickers)
}

#[async_trait]
impl TickerListProvider for AlphaVantageListingProvider {
    fn name(&self) -> &str {
        "Alpha Vantage"
    }

    async fn fetch_tickers(&self) -> Result<Vec<String>> {
        let url = format!("{}/query", self.base_url);

        let body = self
            .client
            .get(&url)
            .query(&[
                ("function", "LISTING_STATUS"),
                ("apikey", self.api_key.expose_secret()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let tickers = parse_listing_csv(&body)?;
        debug!(count = tickers.len(), "Alpha Vantage 상장 목록 파싱 완료");
        Ok(tickers)
    }
}
