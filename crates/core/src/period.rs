//! Calendar buckets used to roll transactions into usage series.
//!
//! Weeks start on Monday 00:00 UTC, months on the 1st 00:00 UTC. A period is
//! half-open: `start <= t < end`.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, AnalyticsResult};

/// Bucket size of a usage series.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PeriodGranularity {
    #[default]
    Week,
    Month,
}

impl PeriodGranularity {
    /// Average length of one period in days (used for per-day rates).
    pub fn nominal_days(self) -> f64 {
        match self {
            PeriodGranularity::Week => 7.0,
            PeriodGranularity::Month => 365.25 / 12.0,
        }
    }

    /// The period that contains `ts`.
    pub fn period_containing(self, ts: DateTime<Utc>) -> AnalyticsResult<Period> {
        let date = ts.date_naive();
        let start_date = match self {
            PeriodGranularity::Week => {
                let back = i64::from(date.weekday().num_days_from_monday());
                date.checked_sub_signed(Duration::days(back))
            }
            PeriodGranularity::Month => date.with_day(1),
        }
        .ok_or_else(|| out_of_range(ts))?;
        self.period_starting(start_date)
    }

    /// The period `offset` steps away from `period` (negative steps go back in time).
    pub fn shift(self, period: &Period, offset: i64) -> AnalyticsResult<Period> {
        let date = period.start.date_naive();
        let shifted = match self {
            PeriodGranularity::Week => offset
                .checked_mul(7)
                .and_then(Duration::try_days)
                .and_then(|delta| date.checked_add_signed(delta)),
            PeriodGranularity::Month => {
                let months = u32::try_from(offset.unsigned_abs()).ok().map(Months::new);
                match months {
                    Some(m) if offset >= 0 => date.checked_add_months(m),
                    Some(m) => date.checked_sub_months(m),
                    None => None,
                }
            }
        }
        .ok_or_else(|| out_of_range(period.start))?;
        self.period_starting(shifted)
    }

    /// `count` consecutive periods, oldest first, the last one containing `as_of`.
    pub fn trailing_window(self, as_of: DateTime<Utc>, count: u32) -> AnalyticsResult<Vec<Period>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let current = self.period_containing(as_of)?;
        let first = self.shift(&current, -(i64::from(count) - 1))?;

        let mut periods = Vec::with_capacity(count as usize);
        let mut period = first;
        for _ in 0..count {
            let next = self.shift(&period, 1)?;
            periods.push(period);
            period = next;
        }
        Ok(periods)
    }

    fn period_starting(self, start_date: NaiveDate) -> AnalyticsResult<Period> {
        let end_date = match self {
            PeriodGranularity::Week => start_date.checked_add_signed(Duration::days(7)),
            PeriodGranularity::Month => start_date.checked_add_months(Months::new(1)),
        }
        .ok_or_else(|| AnalyticsError::computation(format!("period starting {start_date} is out of range")))?;

        Ok(Period {
            start: start_date.and_time(NaiveTime::MIN).and_utc(),
            end: end_date.and_time(NaiveTime::MIN).and_utc(),
        })
    }
}

impl core::fmt::Display for PeriodGranularity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PeriodGranularity::Week => f.write_str("week"),
            PeriodGranularity::Month => f.write_str("month"),
        }
    }
}

impl core::str::FromStr for PeriodGranularity {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" | "weekly" => Ok(PeriodGranularity::Week),
            "month" | "monthly" => Ok(PeriodGranularity::Month),
            other => Err(AnalyticsError::configuration(format!(
                "unknown period granularity '{other}' (expected week or month)"
            ))),
        }
    }
}

/// Half-open time bucket `[start, end)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }

    /// Exact length in days (28–31 for months, 7 for weeks).
    pub fn length_days(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64 / 86_400.0
    }
}

fn out_of_range(ts: DateTime<Utc>) -> AnalyticsError {
    AnalyticsError::computation(format!("timestamp {ts} is outside the supported calendar range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn weeks_start_on_monday() {
        // 2024-03-14 is a Thursday.
        let p = PeriodGranularity::Week.period_containing(ts(2024, 3, 14, 15)).unwrap();
        assert_eq!(p.start, ts(2024, 3, 11, 0));
        assert_eq!(p.end, ts(2024, 3, 18, 0));
        assert_eq!(p.length_days(), 7.0);
    }

    #[test]
    fn months_have_calendar_lengths() {
        let p = PeriodGranularity::Month.period_containing(ts(2024, 2, 20, 8)).unwrap();
        assert_eq!(p.start, ts(2024, 2, 1, 0));
        assert_eq!(p.end, ts(2024, 3, 1, 0));
        assert_eq!(p.length_days(), 29.0);
    }

    #[test]
    fn trailing_window_is_contiguous_and_ends_at_as_of() {
        let as_of = ts(2024, 1, 10, 12);
        let window = PeriodGranularity::Month.trailing_window(as_of, 3).unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].start, ts(2023, 11, 1, 0));
        assert!(window[2].contains(as_of));
        for pair in window.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn shift_moves_forward_and_back() {
        let p = PeriodGranularity::Week.period_containing(ts(2024, 1, 3, 0)).unwrap();
        let next = PeriodGranularity::Week.shift(&p, 1).unwrap();
        assert_eq!(next.start, p.end);
        let back = PeriodGranularity::Week.shift(&next, -1).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn empty_window_is_allowed() {
        assert!(PeriodGranularity::Week.trailing_window(ts(2024, 1, 1, 0), 0).unwrap().is_empty());
    }

    #[test]
    fn granularity_parses_from_config_strings() {
        assert_eq!("Month".parse::<PeriodGranularity>().unwrap(), PeriodGranularity::Month);
        assert!("quarter".parse::<PeriodGranularity>().is_err());
    }
}
