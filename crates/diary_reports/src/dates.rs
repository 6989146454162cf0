//! Calendar arithmetic on local dates.
//!
//! Day keys (`YYYY-MM-DD`) are the join key between otherwise unrelated row sets,
//! so every conversion from an instant goes through the configured time zone.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use diary_store::WeekStart;
use regex::Regex;
use std::sync::{Arc, LazyLock};

static DATE_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static regex compiles")
});

static MONTH_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}$").expect("static regex compiles"));

/// Canonical `YYYY-MM-DD` key of a local date.
pub fn to_date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Strict day key parser. Anything other than a real calendar date in
/// `YYYY-MM-DD` form yields `None`.
pub fn parse_date_key(s: &str) -> Option<NaiveDate> {
    if !DATE_KEY_RE.is_match(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Like [`parse_date_key`] for an optional query value.
pub fn parse_opt_date_key(s: Option<&str>) -> Option<NaiveDate> {
    s.and_then(parse_date_key)
}

/// First day of the week containing `date`.
pub fn start_of_week(date: NaiveDate, week_start: WeekStart) -> NaiveDate {
    let offset = match week_start {
        WeekStart::Sun => date.weekday().num_days_from_sunday(),
        WeekStart::Mon => date.weekday().num_days_from_monday(),
    };
    date - Days::new(u64::from(offset))
}

/// `count` consecutive days starting at `start`.
pub fn enumerate_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    start.iter_days().take(count).collect()
}

/// `[first of month, first of next month)` for a `YYYY-MM` key.
pub fn month_range(s: &str) -> Option<(NaiveDate, NaiveDate)> {
    if !MONTH_KEY_RE.is_match(s) {
        return None;
    }
    let (y, m) = s.split_once('-')?;
    let year: i32 = y.parse().ok()?;
    let month: u32 = m.parse().ok()?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next))
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant, for tests and reproducible exports.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// The user's calendar: a clock plus the zone that defines "local".
#[derive(Clone)]
pub struct LocalCalendar {
    clock: Arc<dyn Clock>,
    tz: Tz,
}

impl LocalCalendar {
    pub fn new(clock: Arc<dyn Clock>, tz: Tz) -> Self {
        Self { clock, tz }
    }

    pub fn today(&self) -> NaiveDate {
        self.local_date(self.clock.now())
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// Day key of the local date an instant falls on.
    pub fn date_key_of(&self, instant: DateTime<Utc>) -> String {
        to_date_key(self.local_date(instant))
    }

    /// Wall-clock time in the local zone, `HH:MM`.
    pub fn local_time(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.tz).format("%H:%M").to_string()
    }
}

impl std::fmt::Debug for LocalCalendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCalendar").field("tz", &self.tz).finish()
    }
}
