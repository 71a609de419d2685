use std::fmt;

use chrono::{
  Datelike,
  Local,
  NaiveDateTime,
  Timelike,
  Utc
};
use chrono_tz::Tz;

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 =
  24 * MINUTES_PER_HOUR;
// Fixed-length months and years. Not
// calendar accurate; labels depend on
// these exact values.
const MINUTES_PER_MONTH: i64 =
  30 * MINUTES_PER_DAY;
const MINUTES_PER_YEAR: i64 =
  365 * MINUTES_PER_DAY;

/// Relative time left before a task's
/// deadline, bucketed for display.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
)]
pub enum Remaining {
  Expired,
  MoreThanAYear,
  Days(i64),
  Hours(i64),
  Minutes(i64)
}

impl Remaining {
  /// Bands are checked in order; the
  /// first match wins.
  #[must_use]
  pub fn from_minutes(
    minutes: i64
  ) -> Self {
    if minutes < 0 {
      Remaining::Expired
    } else if minutes > MINUTES_PER_YEAR
    {
      Remaining::MoreThanAYear
    } else if minutes > MINUTES_PER_DAY {
      Remaining::Days(
        minutes / MINUTES_PER_DAY
      )
    } else if minutes > MINUTES_PER_HOUR
    {
      Remaining::Hours(
        minutes / MINUTES_PER_HOUR
      )
    } else {
      Remaining::Minutes(minutes)
    }
  }

  #[must_use]
  pub fn is_expired(self) -> bool {
    self == Remaining::Expired
  }
}

impl fmt::Display for Remaining {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | Remaining::Expired => {
        f.write_str("expired")
      }
      | Remaining::MoreThanAYear => {
        f.write_str(
          "more than one year remaining"
        )
      }
      | Remaining::Days(n) => {
        write!(
          f,
          "about {n} days remaining"
        )
      }
      | Remaining::Hours(n) => {
        write!(
          f,
          "about {n} hours remaining"
        )
      }
      | Remaining::Minutes(n) => {
        write!(f, "{n} minutes remaining")
      }
    }
  }
}

/// Display form of a `limit`:
/// `2024-01-10T10:00:00Z` becomes
/// `2024-01-10 10:00:00`. No zone
/// conversion happens.
#[must_use]
pub fn normalize_timestamp(
  limit: Option<&str>
) -> String {
  let Some(limit) = limit else {
    return String::new();
  };
  limit
    .replacen('T', " ", 1)
    .replacen('Z', "", 1)
}

/// Minutes between `now` and the
/// deadline using 365-day years and
/// 30-day months. Seconds are ignored.
/// `None` when the deadline does not
/// have the expected shape.
#[must_use]
pub fn remaining_minutes(
  limit: &str,
  now: NaiveDateTime
) -> Option<i64> {
  let normalized =
    normalize_timestamp(Some(limit));
  let (date, time) =
    normalized.trim().split_once(' ')?;

  let mut date_parts = date
    .split('-')
    .map(|p| p.trim().parse::<i64>());
  let year = date_parts.next()?.ok()?;
  let month = date_parts.next()?.ok()?;
  let day = date_parts.next()?.ok()?;

  let mut time_parts = time
    .split(':')
    .map(|p| p.trim().parse::<i64>());
  let hour = time_parts.next()?.ok()?;
  let minute = time_parts.next()?.ok()?;

  // Fields are unbounded; overflow is
  // treated as malformed.
  [
    (
      year,
      i64::from(now.year()),
      MINUTES_PER_YEAR
    ),
    (
      month,
      i64::from(now.month0()) + 1,
      MINUTES_PER_MONTH
    ),
    (
      day,
      i64::from(now.day()),
      MINUTES_PER_DAY
    ),
    (
      hour,
      i64::from(now.hour()),
      MINUTES_PER_HOUR
    ),
    (minute, i64::from(now.minute()), 1)
  ]
  .into_iter()
  .try_fold(0i64, |acc, (field, current, unit)| {
    let delta = field
      .checked_sub(current)?
      .checked_mul(unit)?;
    acc.checked_add(delta)
  })
}

#[must_use]
pub fn remaining(
  limit: Option<&str>,
  now: NaiveDateTime
) -> Option<Remaining> {
  let limit = limit?;
  let minutes =
    remaining_minutes(limit, now);
  if minutes.is_none() {
    tracing::debug!(
      limit,
      "deadline has unexpected format"
    );
  }
  minutes.map(Remaining::from_minutes)
}

/// Label shown under a task; empty when
/// there is no usable deadline.
#[must_use]
pub fn remaining_label(
  limit: Option<&str>,
  now: NaiveDateTime
) -> String {
  remaining(limit, now)
    .map(|r| r.to_string())
    .unwrap_or_default()
}

/// Current wall-clock time, in `tz`
/// when given, else the machine's local
/// zone.
#[must_use]
pub fn wall_clock_now(
  tz: Option<Tz>
) -> NaiveDateTime {
  match tz {
    | Some(tz) => {
      Utc::now()
        .with_timezone(&tz)
        .naive_local()
    }
    | None => Local::now().naive_local()
  }
}

pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "resolved deadline timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::warn!(
        source,
        timezone = %trimmed,
        error = %err,
        "invalid timezone; using local clock"
      );
      None
    }
  }
}
