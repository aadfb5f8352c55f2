//! # ETF Core
//!
//! ETF 마스터 수집기의 핵심 도메인 모델을 제공합니다.
//!
//! - ETF 레코드 및 부분 업데이트(patch) 타입
//! - 기간 수익률 타입
//! - 수치 정규화(반올림) 유틸리티
//! - 로깅 인프라

pub mod domain;
pub mod logging;
pub mod numeric;

pub use domain::*;
pub use logging::*;
