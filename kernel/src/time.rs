//! Conversion between a reserver's wall-clock time and absolute UTC instants.
//!
//! Time zone identifiers coming from callers must go through [`validate_time_zone`]
//! first. The conversions take the resolved [`Tz`], so an unchecked identifier can
//! never reach them and nothing here falls back to UTC.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use shared::error::AppError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown time zone identifier: {0:?}")]
pub struct InvalidTimeZone(pub String);

impl From<InvalidTimeZone> for AppError {
    fn from(value: InvalidTimeZone) -> Self {
        AppError::InvalidTimeZone(value.to_string())
    }
}

/// The wall-clock time has no UTC counterpart inside chrono's representable range.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("local time {0} is outside the supported range")]
pub struct UnrepresentableTime(pub NaiveDateTime);

impl From<UnrepresentableTime> for AppError {
    fn from(value: UnrepresentableTime) -> Self {
        AppError::InvalidInterval(value.to_string())
    }
}

/// Resolves an IANA identifier such as `Europe/Helsinki` against the bundled database.
pub fn validate_time_zone(id: &str) -> Result<Tz, InvalidTimeZone> {
    id.parse::<Tz>().map_err(|_| InvalidTimeZone(id.to_string()))
}

/// Interprets `local` as wall-clock time in `tz`.
///
/// - A time that occurs twice (clocks turned back) resolves to the earlier instant.
/// - A time skipped by a forward jump is read with the offset in force before the
///   jump, so it lands after the transition by the same distance it sat inside the gap.
///
/// chrono-tz also reports no mapping when the shifted instant would leave chrono's
/// range, so the gap arithmetic is checked.
pub fn to_utc(local: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>, UnrepresentableTime> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(a, b) => Ok(a.min(b).with_timezone(&Utc)),
        LocalResult::None => offset_before_gap(local, tz)
            .and_then(|offset| local.checked_sub_signed(Duration::seconds(i64::from(offset))))
            .map(|utc| utc.and_utc())
            .ok_or(UnrepresentableTime(local)),
    }
}

/// Projects an instant onto the wall clock of `tz`.
/// `None` only when the local time would fall outside chrono's range.
pub fn from_utc(instant: DateTime<Utc>, tz: Tz) -> Option<NaiveDateTime> {
    let utc = instant.naive_utc();
    utc.checked_add_offset(tz.offset_from_utc_datetime(&utc).fix())
}

// ギャップ直前の UTC オフセット（秒）。一日前の時点のオフセットを使う
fn offset_before_gap(local: NaiveDateTime, tz: Tz) -> Option<i32> {
    let day_before = local.checked_sub_signed(Duration::days(1))?;
    Some(tz.offset_from_utc_datetime(&day_before).fix().local_minus_utc())
}
