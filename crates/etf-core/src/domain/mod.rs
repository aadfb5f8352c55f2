//! ETF 수집을 위한 도메인 모델.

mod etf;
mod returns;

pub use etf::*;
pub use returns::*;
