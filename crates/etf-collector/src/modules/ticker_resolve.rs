//! 티커 목록 조회 모듈.
//!
//! 등록된 순서대로 Provider를 시도하고, 처음으로 비어있지 않은 목록을 반환한
//! Provider의 결과를 사용합니다.

use etf_data::TickerListProvider;

/// 소스 폴백 티커 조회기
pub struct TickerResolver {
    providers: Vec<Box<dyn TickerListProvider>>,
}

impl TickerResolver {
    pub fn new(providers: Vec<Box<dyn TickerListProvider>>) -> Self {
        Self { providers }
    }

    /// 티커 목록 조회.
    ///
    /// 모든 소스가 실패하면 빈 목록을 반환합니다.
    pub async fn resolve(&self) -> Vec<String> {
        for provider in &self.providers {
            match provider.fetch_tickers().await {
                Ok(tickers) if !tickers.is_empty() => {
                    tracing::info!(
                        source = provider.name(),
                        count = tickers.len(),
                        "티커 목록 조회 완료"
                    );
                    return tickers;
                }
                Ok(_) => {
                    tracing::warn!(source = provider.name(), "빈 티커 목록, 다음 소스로 폴백");
                }
                Err(e) => {
                    tracing::warn!(
                        source = provider.name(),
                        error = %e,
                        "티커 목록 조회 실패, 다음 소스로 폴백"
                    );
                }
            }
        }

        tracing::warn!("모든 티커 소스 실패");
        Vec::new()
    }
}
