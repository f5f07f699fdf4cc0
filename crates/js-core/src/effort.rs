//! Development effort estimation.
//!
//! We only know the discrete points at which a ticket changed state, not how
//! long someone actually worked, so effort is derived from these rules:
//!
//! - a working day is 8 hours
//! - a span of at most one working day (480 minutes) is rounded up to the
//!   next 2-hour bucket, wherever it falls in the calendar
//! - a longer span counts the first day as 8 hours if it started before
//!   noon (4 otherwise), the last day as 4 hours if it ended before noon
//!   (8 otherwise), and 8 hours for every weekday in between
//! - Saturdays and Sundays count nothing
//!
//! The two rules disagree slightly around the 480-minute boundary. That is
//! part of the rule set and must not be smoothed.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Timelike, Utc,
    Weekday,
};
use serde::Serialize;
use thiserror::Error;

use crate::timeline::StateInterval;

/// State name that counts as active development.
pub const DEFAULT_DEV_STATE: &str = "In Development";

const HOURS_PER_DAY: u32 = 8;
const HALF_DAY_HOURS: u32 = 4;
const NOON_HOUR: u32 = 12;

/// Short spans are rounded up to the first bucket that holds them.
const SHORT_SPAN_BUCKETS: [(i64, u32); 4] = [(120, 2), (240, 4), (360, 6), (480, 8)];

/// Estimated effort, kept in whole hours so the day value is exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EffortEstimate {
    hours: u32,
}

impl EffortEstimate {
    pub const ZERO: Self = Self { hours: 0 };

    pub const fn from_hours(hours: u32) -> Self {
        Self { hours }
    }

    pub const fn hours(self) -> u32 {
        self.hours
    }

    /// Effort in 8-hour days.
    pub fn days(self) -> f64 {
        f64::from(self.hours) / f64::from(HOURS_PER_DAY)
    }

    pub const fn is_zero(self) -> bool {
        self.hours == 0
    }
}

impl Add for EffortEstimate {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::from_hours(self.hours + rhs.hours)
    }
}

impl AddAssign for EffortEstimate {
    fn add_assign(&mut self, rhs: Self) {
        self.hours += rhs.hours;
    }
}

impl Sum for EffortEstimate {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for EffortEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.days())
    }
}

/// Report window errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("report window start {start} is after its end {end}")]
    Inverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("report date {date} is outside the supported range")]
    OutOfRange { date: NaiveDate },
}

/// The reporting window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ReportWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
        if end < start {
            return Err(WindowError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window covering whole calendar days in `offset`: from `start` at
    /// 00:00:00 through `end` at 23:59:59.
    pub fn from_dates(
        start: NaiveDate,
        end: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Self, WindowError> {
        let start =
            day_start_utc(start, offset).ok_or(WindowError::OutOfRange { date: start })?;
        let end = day_start_utc(end, offset)
            .and_then(|midnight| midnight.checked_add_signed(Duration::seconds(86_399)))
            .ok_or(WindowError::OutOfRange { date: end })?;
        Self::new(start, end)
    }

    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    fn strictly_contains(&self, instant: DateTime<Utc>) -> bool {
        instant > self.start && instant < self.end
    }

    /// An interval is relevant if it covers the whole window or one of its
    /// endpoints lies strictly inside it.
    fn is_relevant(&self, interval: &StateInterval) -> bool {
        (interval.start <= self.start && interval.end >= self.end)
            || self.strictly_contains(interval.start)
            || self.strictly_contains(interval.end)
    }
}

fn day_start_utc(date: NaiveDate, offset: FixedOffset) -> Option<DateTime<Utc>> {
    date.and_time(NaiveTime::default())
        .checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
        .map(|local_midnight| local_midnight.and_utc())
}

/// Converts state intervals into development effort.
///
/// Stateless apart from its configuration; one estimator can be shared
/// across threads and tickets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffortEstimator {
    dev_state: String,
    /// Offset in which weekdays and the noon cut-off are evaluated.
    calendar: FixedOffset,
}

impl Default for EffortEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_DEV_STATE)
    }
}

impl EffortEstimator {
    pub fn new(dev_state: impl Into<String>) -> Self {
        Self {
            dev_state: dev_state.into(),
            calendar: Utc.fix(),
        }
    }

    #[must_use]
    pub fn with_calendar(mut self, calendar: FixedOffset) -> Self {
        self.calendar = calendar;
        self
    }

    /// Sums the effort of every development interval inside `window`.
    ///
    /// `now` caps the window: time that has not elapsed yet never counts.
    pub fn estimate(
        &self,
        intervals: &[StateInterval],
        window: &ReportWindow,
        now: DateTime<Utc>,
    ) -> EffortEstimate {
        intervals
            .iter()
            .map(|interval| EffortEstimate::from_hours(self.interval_hours(interval, window, now)))
            .sum()
    }

    /// Hours attributed to a single interval.
    pub fn interval_hours(
        &self,
        interval: &StateInterval,
        window: &ReportWindow,
        now: DateTime<Utc>,
    ) -> u32 {
        if interval.state != self.dev_state || !window.is_relevant(interval) {
            return 0;
        }

        let start = interval.start.max(window.start);
        let end = interval.end.min(window.end.min(now));
        // now precedes the interval
        if end < start {
            return 0;
        }

        let span = end - start;
        SHORT_SPAN_BUCKETS
            .iter()
            .find(|(minutes, _)| span <= Duration::minutes(*minutes))
            .map_or_else(|| self.working_hours(start, end), |(_, hours)| *hours)
    }

    /// Calendar-based hours for spans longer than one working day.
    fn working_hours(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
        let start = start.with_timezone(&self.calendar);
        let end = end.with_timezone(&self.calendar);
        let mut hours = 0;

        if is_working_day(start.weekday()) {
            hours += if start.hour() < NOON_HOUR {
                HOURS_PER_DAY
            } else {
                HALF_DAY_HOURS
            };
        }

        if is_working_day(end.weekday()) {
            hours += if end.hour() < NOON_HOUR {
                HALF_DAY_HOURS
            } else {
                HOURS_PER_DAY
            };
        }

        let last_day = end.date_naive();
        let mut day = start.date_naive().succ_opt();
        while let Some(current) = day.filter(|current| *current < last_day) {
            if is_working_day(current.weekday()) {
                hours += HOURS_PER_DAY;
            }
            day = current.succ_opt();
        }

        hours
    }
}

const fn is_working_day(weekday: Weekday) -> bool {
    !matches!(weekday, Weekday::Sat | Weekday::Sun)
}

/// Development days for `intervals` inside `[window_start, window_end]`,
/// using the default development state and a UTC calendar.
pub fn estimate_days(
    intervals: &[StateInterval],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    let window = ReportWindow {
        start: window_start,
        end: window_end,
    };
    EffortEstimator::default()
        .estimate(intervals, &window, now)
        .days()
}
