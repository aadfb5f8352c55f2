//! 저장소 upsert 모듈.
//!
//! 수집된 patch를 기존 레코드에 병합합니다. 이번 수집에서 얻지 못한 값(`None`)은
//! 기존 값을 지우지 않습니다.

use chrono::{DateTime, Utc};
use etf_core::{EtfPatch, EtfRecord};
use etf_data::{EtfUnitOfWork, Result};

/// upsert 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// 기존 레코드에 patch 병합.
///
/// patch의 `Some` 필드만 덮어쓰고, `data_updated_at`은 `now`로 갱신합니다.
/// `id`, `ticker`, `created_at`은 유지됩니다.
pub fn sparse_merge(existing: &EtfRecord, patch: &EtfPatch, now: DateTime<Utc>) -> EtfRecord {
    fn pick<T: Clone>(incoming: &Option<T>, current: &Option<T>) -> Option<T> {
        incoming.clone().or_else(|| current.clone())
    }

    EtfRecord {
        id: existing.id,
        ticker: existing.ticker.clone(),
        name: pick(&patch.name, &existing.name),
        description: pick(&patch.description, &existing.description),
        issuer: pick(&patch.issuer, &existing.issuer),
        category: pick(&patch.category, &existing.category),
        underlying_index: pick(&patch.underlying_index, &existing.underlying_index),
        exchange: pick(&patch.exchange, &existing.exchange),
        price: pick(&patch.price, &existing.price),
        volume: pick(&patch.volume, &existing.volume),
        market_cap: pick(&patch.market_cap, &existing.market_cap),
        net_assets: pick(&patch.net_assets, &existing.net_assets),
        inception_date: pick(&patch.inception_date, &existing.inception_date),
        expense_ratio: pick(&patch.expense_ratio, &existing.expense_ratio),
        dividend_yield: pick(&patch.dividend_yield, &existing.dividend_yield),
        ex_dividend_date: pick(&patch.ex_dividend_date, &existing.ex_dividend_date),
        return_1m: pick(&patch.return_1m, &existing.return_1m),
        return_1y: pick(&patch.return_1y, &existing.return_1y),
        return_3y: pick(&patch.return_3y, &existing.return_3y),
        return_5y: pick(&patch.return_5y, &existing.return_5y),
        return_3y_avg: pick(&patch.return_3y_avg, &existing.return_3y_avg),
        return_5y_avg: pick(&patch.return_5y_avg, &existing.return_5y_avg),
        data_updated_at: Some(now),
        created_at: existing.created_at,
    }
}

/// 수집 결과를 저장소에 반영하는 upsert 엔진
pub struct Reconciler;

impl Reconciler {
    /// patch 저장 (정확히 일치하는 티커 기준).
    ///
    /// 커밋은 호출자가 배치 단위로 수행합니다.
    pub async fn upsert(
        uow: &mut dyn EtfUnitOfWork,
        patch: &EtfPatch,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome> {
        match uow.find_by_ticker(&patch.ticker).await? {
            Some(existing) => {
                let merged = sparse_merge(&existing, patch, now);
                uow.update(&merged).await?;
                tracing::debug!(ticker = %patch.ticker, "ETF 갱신");
                Ok(UpsertOutcome::Updated)
            }
            None => {
                let record = EtfRecord::from_patch(patch, now);
                uow.insert(&record).await?;
                tracing::debug!(ticker = %patch.ticker, "ETF 신규 생성");
                Ok(UpsertOutcome::Inserted)
            }
        }
    }
}
