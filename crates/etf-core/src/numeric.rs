//! 수치 정규화 유틸리티.
//!
//! 외부 Provider가 반환하는 f64 값을 저장용 Decimal/정수로 변환합니다.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// f64를 Decimal로 변환 후 지정한 소수점 자리로 반올림.
///
/// NaN/무한대는 `None`.
pub fn round_dp(value: f64, dp: u32) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value).map(|d| d.round_dp(dp))
}

/// 소수(fraction) 값을 퍼센트로 변환 후 반올림 (0.0105 → 1.05).
pub fn fraction_to_percent(value: f64, dp: u32) -> Option<Decimal> {
    round_dp(value * 100.0, dp)
}

/// 금액/수량 집계값을 정수로 변환.
///
/// 0 이하 또는 유효하지 않은 값은 "데이터 없음"으로 취급합니다.
pub fn whole_number(value: f64) -> Option<i64> {
    if !value.is_finite() || value <= 0.0 || value > i64::MAX as f64 {
        return None;
    }
    Some(value.trunc() as i64)
}
