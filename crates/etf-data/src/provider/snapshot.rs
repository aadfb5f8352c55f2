//! 로컬 CSV 스냅샷 Provider.
//!
//! 외부 소스가 모두 실패했을 때 사용하는 정적 티커 목록입니다.
//! CSV 헤더에 `ticker` 컬럼이 있어야 합니다.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use super::TickerListProvider;
use crate::error::{DataError, Result};

/// CSV 스냅샷 Provider.
pub struct CsvSnapshotProvider {
    path: PathBuf,
}

impl CsvSnapshotProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Deserialize)]
struct SnapshotRow {
    #[serde(default)]
    ticker: Option<String>,
}

fn read_snapshot(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)?;

    let mut tickers = Vec::new();
    for row in reader.deserialize::<SnapshotRow>() {
        if let Some(ticker) = row?.ticker {
            let ticker = ticker.trim();
            if !ticker.is_empty() {
                tickers.push(ticker.to_string());
            }
        }
    }
    Ok(tickers)
}

#[async_trait]
impl TickerListProvider for CsvSnapshotProvider {
    fn name(&self) -> &str {
        "CSV snapshot"
    }

    async fn fetch_tickers(&self) -> Result<Vec<String>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Err(DataError::NotFound(format!(
                "스냅샷 파일 없음: {}",
                self.path.display()
            )));
        }

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_snapshot(&path))
            .await
            .map_err(|e| DataError::FetchError(format!("스냅샷 읽기 작업 실패: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_reads_ticker_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ticker,name").unwrap();
        writeln!(file, "SPY,SPDR S&P 500 ETF Trust").unwrap();
        writeln!(file, "VOO,Vanguard S&P 500 ETF").unwrap();
        writeln!(file, ",blank row").unwrap();
        writeln!(file, "BRK.B,not an etf but still listed").unwrap();

        let provider = CsvSnapshotProvider::new(file.path());
        let tickers = provider.fetch_tickers().await.unwrap();

        assert_eq!(tickers, vec!["SPY", "VOO", "BRK.B"]);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let provider = CsvSnapshotProvider::new("/nonexistent/etf_master_list.csv");
        assert!(matches!(
            provider.fetch_tickers().await,
            Err(DataError::NotFound(_))
        ));
    }
}
