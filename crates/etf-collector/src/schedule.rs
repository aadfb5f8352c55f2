//! 데몬 모드 실행 시각 계산.

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;

/// `now` 이후 처음 돌아오는 `tz` 기준 `hour:minute` 시각 (UTC).
///
/// DST로 해당 지역 시각이 존재하지 않는 날은 건너뜁니다.
pub fn next_daily_run(now: DateTime<Utc>, tz: Tz, hour: u32, minute: u32) -> DateTime<Utc> {
    let today = now.with_timezone(&tz).date_naive();

    for offset in 0..=2 {
        let day = today + Duration::days(offset);
        let candidate = day
            .and_hms_opt(hour, minute, 0)
            .and_then(|naive| tz.from_local_datetime(&naive).earliest())
            .map(|local| local.with_timezone(&Utc));

        if let Some(candidate) = candidate {
            if candidate > now {
                return candidate;
            }
        }
    }

    now + Duration::days(1)
}

/// 다음 실행까지 남은 시간.
pub fn until(next: DateTime<Utc>, now: DateTime<Utc>) -> std::time::Duration {
    (next - now).to_std().unwrap_or(std::time::Duration::ZERO)
}
