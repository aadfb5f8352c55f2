//! 메모리 기반 ETF 저장소.
//!
//! 작업 단위는 변경사항을 버퍼에 모았다가 커밋 시점에 한 번에 반영합니다.
//! 로컬 실행(`--dry-run`)과 파이프라인 테스트에 사용합니다.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use etf_core::EtfRecord;

use super::{EtfStore, EtfUnitOfWork};
use crate::error::{DataError, Result};

#[derive(Default)]
struct MemoryState {
    records: BTreeMap<String, EtfRecord>,
    commits: usize,
    rollbacks: usize,
    /// 쓰기 시 오류를 발생시킬 티커
    failing_tickers: HashSet<String>,
}

/// 메모리 기반 ETF 저장소.
#[derive(Clone, Default)]
pub struct MemoryEtfStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryEtfStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // 잠금 중 panic이 나도 상태 자체는 일관적이므로 그대로 사용
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 지정한 티커에 대한 쓰기를 실패시킴 (제약 조건 위반 재현용).
    pub fn fail_writes_for(&self, ticker: impl Into<String>) {
        self.lock().failing_tickers.insert(ticker.into());
    }

    /// 커밋된 레코드 스냅샷.
    pub fn records(&self) -> Vec<EtfRecord> {
        self.lock().records.values().cloned().collect()
    }

    pub fn get(&self, ticker: &str) -> Option<EtfRecord> {
        self.lock().records.get(ticker).cloned()
    }

    /// 커밋 횟수.
    pub fn commit_count(&self) -> usize {
        self.lock().commits
    }

    /// 롤백 횟수.
    pub fn rollback_count(&self) -> usize {
        self.lock().rollbacks
    }
}

#[async_trait]
impl EtfStore for MemoryEtfStore {
    async fn begin(&self) -> Result<Box<dyn EtfUnitOfWork>> {
        Ok(Box::new(MemoryUnitOfWork {
            store: self.clone(),
            pending: BTreeMap::new(),
            closed: false,
        }))
    }

    async fn find_by_ticker_ci(&self, ticker: &str) -> Result<Option<EtfRecord>> {
        let needle = ticker.trim().to_uppercase();
        Ok(self
            .lock()
            .records
            .values()
            .find(|r| r.ticker.to_uppercase() == needle)
            .cloned())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.lock().records.len() as i64)
    }
}

/// 메모리 저장소 작업 단위.
pub struct MemoryUnitOfWork {
    store: MemoryEtfStore,
    pending: BTreeMap<String, EtfRecord>,
    closed: bool,
}

impl MemoryUnitOfWork {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(DataError::TransactionError("작업 단위가 이미 종료됨".to_string()));
        }
        Ok(())
    }

    fn check_writable(&self, ticker: &str) -> Result<()> {
        if self.store.lock().failing_tickers.contains(ticker) {
            return Err(DataError::QueryError(format!("쓰기 거부: {}", ticker)));
        }
        Ok(())
    }
}

#[async_trait]
impl EtfUnitOfWork for MemoryUnitOfWork {
    async fn find_by_ticker(&mut self, ticker: &str) -> Result<Option<EtfRecord>> {
        self.ensure_open()?;
        if let Some(record) = self.pending.get(ticker) {
            return Ok(Some(record.clone()));
        }
        Ok(self.store.get(ticker))
    }

    async fn insert(&mut self, record: &EtfRecord) -> Result<()> {
        self.ensure_open()?;
        self.check_writable(&record.ticker)?;

        if self.pending.contains_key(&record.ticker) || self.store.get(&record.ticker).is_some() {
            return Err(DataError::DuplicateError(record.ticker.clone()));
        }
        self.pending.insert(record.ticker.clone(), record.clone());
        Ok(())
    }

    async fn update(&mut self, record: &EtfRecord) -> Result<()> {
        self.ensure_open()?;
        self.check_writable(&record.ticker)?;

        if !self.pending.contains_key(&record.ticker) && self.store.get(&record.ticker).is_none() {
            return Err(DataError::NotFound(record.ticker.clone()));
        }
        self.pending.insert(record.ticker.clone(), record.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.closed = true;

        let mut state = self.store.lock();
        state.records.append(&mut self.pending);
        state.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.pending.clear();
        self.store.lock().rollbacks += 1;
        Ok(())
    }
}
