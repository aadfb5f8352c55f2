//! 배치 간 요청 속도 조절.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

/// 배치 사이 대기 전략
#[async_trait]
pub trait BatchPacer: Send + Sync {
    /// 다음 배치 전 대기 시간
    fn next_delay(&self) -> Duration;

    /// 다음 배치까지 대기
    async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "다음 배치 대기");
            tokio::time::sleep(delay).await;
        }
    }
}

/// 고정 딜레이
#[derive(Debug, Clone, Copy)]
pub struct FixedDelayPacer {
    delay: Duration,
}

impl FixedDelayPacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl BatchPacer for FixedDelayPacer {
    fn next_delay(&self) -> Duration {
        self.delay
    }
}

/// 고정 딜레이 + 무작위 지연 (0 ..= jitter)
#[derive(Debug, Clone, Copy)]
pub struct JitteredDelayPacer {
    base: Duration,
    jitter: Duration,
}

impl JitteredDelayPacer {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self { base, jitter }
    }
}

#[async_trait]
impl BatchPacer for JitteredDelayPacer {
    fn next_delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.base;
        }
        self.base + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

/// 설정값에 맞는 pacer 생성 (jitter가 0이면 고정 딜레이).
pub fn pacer_from_config(base: Duration, jitter: Duration) -> Box<dyn BatchPacer> {
    if jitter.is_zero() {
        Box::new(FixedDelayPacer::new(base))
    } else {
        Box::new(JitteredDelayPacer::new(base, jitter))
    }
}
