//! 기간 수익률 타입.

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 기간 수익률 계산 구간.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnHorizon {
    /// 1개월 (35일)
    OneMonth,
    /// 1년 (370일)
    OneYear,
    /// 3년 (3×365+30일)
    ThreeYears,
    /// 5년 (5×365+30일)
    FiveYears,
}

impl ReturnHorizon {
    /// 모든 구간 (짧은 순).
    pub const ALL: [ReturnHorizon; 4] = [
        ReturnHorizon::OneMonth,
        ReturnHorizon::OneYear,
        ReturnHorizon::ThreeYears,
        ReturnHorizon::FiveYears,
    ];

    /// 구간 길이 (일).
    pub fn days(&self) -> i64 {
        match self {
            Self::OneMonth => 35,
            Self::OneYear => 370,
            Self::ThreeYears => 365 * 3 + 30,
            Self::FiveYears => 365 * 5 + 30,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::days(self.days())
    }
}

/// 심볼별 기간 수익률 (퍼센트, 소수점 2자리).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrailingReturns {
    pub return_1m: Option<Decimal>,
    pub return_1y: Option<Decimal>,
    pub return_3y: Option<Decimal>,
    pub return_5y: Option<Decimal>,
}

impl TrailingReturns {
    pub fn get(&self, horizon: ReturnHorizon) -> Option<Decimal> {
        match horizon {
            ReturnHorizon::OneMonth => self.return_1m,
            ReturnHorizon::OneYear => self.return_1y,
            ReturnHorizon::ThreeYears => self.return_3y,
            ReturnHorizon::FiveYears => self.return_5y,
        }
    }

    pub fn set(&mut self, horizon: ReturnHorizon, value: Decimal) {
        let slot = match horizon {
            ReturnHorizon::OneMonth => &mut self.return_1m,
            ReturnHorizon::OneYear => &mut self.return_1y,
            ReturnHorizon::ThreeYears => &mut self.return_3y,
            ReturnHorizon::FiveYears => &mut self.return_5y,
        };
        *slot = Some(value);
    }

    /// 계산된 구간이 하나도 없는지 여부.
    pub fn is_empty(&self) -> bool {
        ReturnHorizon::ALL.iter().all(|h| self.get(*h).is_none())
    }
}
