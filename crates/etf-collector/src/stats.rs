//! 동기화 실행 통계.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 한 번의 동기화 실행 통계
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRun {
    /// 실행 시작 시각
    pub started_at: DateTime<Utc>,
    /// 처리 대상 티커 (조회된 순서)
    pub tickers: Vec<String>,
    /// 저장된 ETF 수 (커밋된 배치 기준)
    pub updated: usize,
    /// 커밋된 배치 수
    pub committed_batches: usize,
    /// 롤백된 배치 수
    pub failed_batches: usize,
    /// 종료 메시지
    pub message: String,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl SyncRun {
    /// 새 실행 통계 생성
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            tickers: Vec::new(),
            updated: 0,
            committed_batches: 0,
            failed_batches: 0,
            message: String::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// 처리 대상 티커 수
    pub fn total(&self) -> usize {
        self.tickers.len()
    }

    /// 갱신률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.tickers.is_empty() {
            0.0
        } else {
            (self.updated as f64 / self.total() as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total(),
            updated = self.updated,
            committed_batches = self.committed_batches,
            failed_batches = self.failed_batches,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "{}",
            self.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let mut run = SyncRun::new(Utc::now());
        assert_eq!(run.success_rate(), 0.0);

        run.tickers = ["SPY", "QQQ", "IVV", "VTI"].map(String::from).to_vec();
        run.updated = 3;
        assert!((run.success_rate() - 75.0).abs() < f64::EPSILON);
    }
}
