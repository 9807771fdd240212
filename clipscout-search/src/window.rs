use chrono::{
    DateTime, Days, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc,
};
use clipscout_social::tiktok::VideoItem;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Publish-time filter understood by the upstream search endpoint.
///
/// Unknown strings are kept as [`PublishTime::Other`] and forwarded verbatim;
/// locally they behave like an unbounded lower edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PublishTime {
    Yesterday,
    #[default]
    ThisWeek,
    ThisMonth,
    Last3Months,
    Last6Months,
    AllTime,
    Other(String),
}

impl PublishTime {
    pub fn as_str(&self) -> &str {
        match self {
            PublishTime::Yesterday => "yesterday",
            PublishTime::ThisWeek => "this-week",
            PublishTime::ThisMonth => "this-month",
            PublishTime::Last3Months => "last-3-months",
            PublishTime::Last6Months => "last-6-months",
            PublishTime::AllTime => "all-time",
            PublishTime::Other(raw) => raw,
        }
    }

    /// Whole days subtracted from today to find the window start.
    /// `None` means the window has no lower edge.
    pub fn lookback_days(&self) -> Option<u64> {
        match self {
            PublishTime::Yesterday => Some(1),
            PublishTime::ThisWeek => Some(7),
            PublishTime::ThisMonth => Some(30),
            PublishTime::Last3Months => Some(90),
            PublishTime::Last6Months => Some(180),
            PublishTime::AllTime | PublishTime::Other(_) => None,
        }
    }

    /// `all-time` skips local filtering entirely, including items whose
    /// timestamp cannot be read.
    pub fn is_all_time(&self) -> bool {
        matches!(self, PublishTime::AllTime)
    }
}

impl From<&str> for PublishTime {
    fn from(raw: &str) -> Self {
        match raw.trim() {
            "yesterday" => PublishTime::Yesterday,
            "this-week" => PublishTime::ThisWeek,
            "this-month" => PublishTime::ThisMonth,
            "last-3-months" => PublishTime::Last3Months,
            "last-6-months" => PublishTime::Last6Months,
            "all-time" => PublishTime::AllTime,
            _ => PublishTime::Other(raw.to_string()),
        }
    }
}

impl From<String> for PublishTime {
    fn from(raw: String) -> Self {
        PublishTime::from(raw.as_str())
    }
}

impl From<PublishTime> for String {
    fn from(value: PublishTime) -> Self {
        match value {
            PublishTime::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for PublishTime {
    type Err = Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(PublishTime::from(raw))
    }
}

impl fmt::Display for PublishTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive instant range an item's publication time must fall into.
///
/// Both edges sit on local calendar-day boundaries: the end is the last
/// millisecond of today and the start is midnight `N` days earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    /// Resolve against the system clock in the host's local time zone.
    pub fn resolve(filter: &PublishTime) -> Self {
        Self::resolve_at(filter, &Local::now())
    }

    /// Resolve relative to `now`, using `now`'s time zone for day boundaries.
    ///
    /// ```
    /// use chrono::{FixedOffset, TimeZone};
    /// use clipscout_search::{DateWindow, PublishTime};
    ///
    /// let tz = FixedOffset::east_opt(2 * 3600).unwrap();
    /// let now = tz.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap();
    /// let window = DateWindow::resolve_at(&PublishTime::Yesterday, &now);
    /// assert_eq!(
    ///     window.start,
    ///     tz.with_ymd_and_hms(2024, 3, 14, 0, 0, 0).unwrap()
    /// );
    /// ```
    pub fn resolve_at<Tz: TimeZone>(filter: &PublishTime, now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let end = localize(&tz, end_of_day(today));
        let start = match filter.lookback_days() {
            Some(days) => {
                let first_day = today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
                localize(&tz, first_day.and_time(NaiveTime::MIN))
            }
            None => DateTime::<Utc>::MIN_UTC,
        };
        Self { start, end }
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.start <= *at && *at <= self.end
    }

    /// Whether `item` survives local filtering under `filter`.
    ///
    /// Items without a readable timestamp are only admitted under `all-time`.
    pub fn admits(&self, filter: &PublishTime, item: &VideoItem) -> bool {
        if filter.is_all_time() {
            return true;
        }
        item.created_at().is_some_and(|at| self.contains(&at))
    }
}

fn end_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN) + TimeDelta::days(1) - TimeDelta::milliseconds(1)
}

/// Map a local wall-clock time to an instant. Ambiguous times take the
/// earliest reading; times inside a DST gap move forward past the gap.
fn localize<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(naive + TimeDelta::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}
