//! # Calendar Arithmetic
//!
//! Inclusive date and month ranges, and the [`CalendarKey`] abstraction that
//! lets the daily and monthly pipelines share one implementation.
//!
//! Month ranges are computed by converting each endpoint to a count of months
//! since year zero (`year * 12 + month`), enumerating the integers between
//! them and converting back. The inverse conversion has to map a zero
//! remainder to December of the previous year.
//!
//! ```rust
//! use reanalysis_plots::calendar::{month_range, YearMonth};
//!
//! let months = month_range(YearMonth::new(1981, 11)?, YearMonth::new(1982, 2)?);
//! assert_eq!(months.len(), 4);
//! assert_eq!(months[1], YearMonth::new(1981, 12)?);
//! # Ok::<(), reanalysis_plots::error::PlotError>(())
//! ```

use crate::error::{PlotError, PlotResult};
use chrono::{Datelike, Months, NaiveDate};
use clap::ValueEnum;
use regex::Captures;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar month with the day elided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> PlotResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(PlotError::InvalidRequest(format!(
                "Invalid month {} (must be between 1 and 12)",
                month
            )));
        }
        Ok(YearMonth { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn months_since_epoch(&self) -> i64 {
        months_since_epoch(*self)
    }

    pub fn from_months_since_epoch(months: i64) -> PlotResult<Self> {
        yearmonth_from_months_since_epoch(months)
    }

    /// First day of the month, used when a month has to be compared with a date.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = PlotError;

    /// Accepts `YYYYMM` and `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (year, month) = match s.split_once('-') {
            Some(parts) => parts,
            None if s.len() == 6 && s.is_ascii() => s.split_at(4),
            None => {
                return Err(PlotError::InvalidRequest(format!(
                    "Invalid month '{}': expected format 'YYYY-MM'",
                    s
                )));
            }
        };

        let year = year
            .parse::<i32>()
            .map_err(|_| PlotError::InvalidRequest(format!("Invalid year in '{}'", s)))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| PlotError::InvalidRequest(format!("Invalid month in '{}'", s)))?;

        YearMonth::new(year, month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = PlotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

impl From<NaiveDate> for YearMonth {
    fn from(date: NaiveDate) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }
}

/// Number of months between year zero and `month`.
pub fn months_since_epoch(month: impl Into<YearMonth>) -> i64 {
    let month = month.into();
    12 * i64::from(month.year) + i64::from(month.month)
}

/// Inverse of [`months_since_epoch`].
///
/// Fails when the year does not fit in an `i32`.
pub fn yearmonth_from_months_since_epoch(months: i64) -> PlotResult<YearMonth> {
    let quotient = months.div_euclid(12);
    let remainder = months.rem_euclid(12);

    // A zero remainder is December of the previous year, not month 0.
    let (year, month) = if remainder == 0 {
        (quotient - 1, 12)
    } else {
        (quotient, remainder as u32)
    };

    let year = i32::try_from(year).map_err(|_| {
        PlotError::InvalidRequest(format!("Month offset {} is out of range", months))
    })?;
    Ok(YearMonth { year, month })
}

/// Every date from `start` to `end`, inclusive.
///
/// Callers guarantee `end >= start`; a reversed range is empty.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Every month from `start` to `end`, inclusive. Day-of-month is ignored for dates.
pub fn month_range(start: impl Into<YearMonth>, end: impl Into<YearMonth>) -> Vec<YearMonth> {
    let start = months_since_epoch(start);
    let end = months_since_epoch(end);

    // Both ends are valid months, so every offset in between converts
    (start..=end)
        .filter_map(|m| yearmonth_from_months_since_epoch(m).ok())
        .collect()
}

/// Temporal resolution of a data product
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    /// One file per day
    Daily,
    /// One file per month
    Monthly,
}

impl Cadence {
    /// Name of the calendar dimension in the matching climatology file.
    pub fn climatology_dim(&self) -> &'static str {
        match self {
            Cadence::Daily => "day",
            Cadence::Monthly => "month",
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::Daily => write!(f, "daily"),
            Cadence::Monthly => write!(f, "monthly"),
        }
    }
}

/// A calendar position that identifies one data file.
///
/// Implemented for [`NaiveDate`] (daily files) and [`YearMonth`] (monthly
/// files), so range handling, file naming and climatology lookup are written
/// once for both.
pub trait CalendarKey: Copy + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static {
    const CADENCE: Cadence;

    /// Word used for the key in messages ("date" or "month").
    const UNIT_NAME: &'static str;

    /// Regex fragment matching the stamp in a file name, one group per component.
    const STAMP_PATTERN: &'static str;

    fn range_inclusive(start: Self, end: Self) -> Vec<Self>;

    /// The key containing `date`.
    fn from_date(date: NaiveDate) -> Self;

    /// Stamp used in file names (`YYYYMMDD` or `YYYYMM`).
    fn file_stamp(&self) -> String;

    fn from_stamp_captures(caps: &Captures<'_>) -> Option<Self>;

    /// Calendar position ignoring the year: `MM-DD` for days, the month number for months.
    fn climatology_label(&self) -> String;

    fn title_text(&self) -> String;

    fn one_year_later(&self) -> Self;
}

impl CalendarKey for NaiveDate {
    const CADENCE: Cadence = Cadence::Daily;
    const UNIT_NAME: &'static str = "date";
    const STAMP_PATTERN: &'static str = r"(\d{4})(\d{2})(\d{2})";

    fn range_inclusive(start: Self, end: Self) -> Vec<Self> {
        date_range(start, end)
    }

    fn from_date(date: NaiveDate) -> Self {
        date
    }

    fn file_stamp(&self) -> String {
        self.format("%Y%m%d").to_string()
    }

    fn from_stamp_captures(caps: &Captures<'_>) -> Option<Self> {
        let year = caps.get(1)?.as_str().parse().ok()?;
        let month = caps.get(2)?.as_str().parse().ok()?;
        let day = caps.get(3)?.as_str().parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }

    fn climatology_label(&self) -> String {
        self.format("%m-%d").to_string()
    }

    fn title_text(&self) -> String {
        self.format("%Y-%m-%d").to_string()
    }

    fn one_year_later(&self) -> Self {
        // Feb 29 clamps to Feb 28
        self.checked_add_months(Months::new(12)).unwrap_or(*self)
    }
}

impl CalendarKey for YearMonth {
    const CADENCE: Cadence = Cadence::Monthly;
    const UNIT_NAME: &'static str = "month";
    const STAMP_PATTERN: &'static str = r"(\d{4})(\d{2})";

    fn range_inclusive(start: Self, end: Self) -> Vec<Self> {
        month_range(start, end)
    }

    fn from_date(date: NaiveDate) -> Self {
        YearMonth::from(date)
    }

    fn file_stamp(&self) -> String {
        self.to_string()
    }

    fn from_stamp_captures(caps: &Captures<'_>) -> Option<Self> {
        let year = caps.get(1)?.as_str().parse().ok()?;
        let month = caps.get(2)?.as_str().parse().ok()?;
        YearMonth::new(year, month).ok()
    }

    fn climatology_label(&self) -> String {
        self.month.to_string()
    }

    fn title_text(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }

    fn one_year_later(&self) -> Self {
        YearMonth::from_months_since_epoch(self.months_since_epoch() + 12).unwrap_or(*self)
    }
}

/// A start key and an optional end key.
///
/// With no end the range is the start alone; the end is never consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarRange<K> {
    pub start: K,
    pub end: Option<K>,
}

impl<K: CalendarKey> CalendarRange<K> {
    pub fn new(start: K, end: Option<K>) -> Self {
        CalendarRange { start, end }
    }

    pub fn single(start: K) -> Self {
        CalendarRange { start, end: None }
    }

    pub fn keys(&self) -> Vec<K> {
        match self.end {
            None => vec![self.start],
            Some(end) => K::range_inclusive(self.start, end),
        }
    }

    pub fn last(&self) -> K {
        self.end.unwrap_or(self.start)
    }

    pub fn is_single(&self) -> bool {
        self.end.is_none()
    }
}

impl<K: CalendarKey> fmt::Display for CalendarRange<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            None => write!(f, "{}", self.start.title_text()),
            Some(end) => write!(f, "{} to {}", self.start.title_text(), end.title_text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ym(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m).unwrap()
    }

    #[test]
    fn test_date_range_singleton() {
        for d in [date(1979, 1, 1), date(2000, 2, 29), date(2021, 12, 31)] {
            assert_eq!(date_range(d, d), vec![d]);
        }
    }

    #[test]
    fn test_date_range_length() {
        let range = date_range(date(2000, 1, 1), date(2000, 1, 5));
        assert_eq!(range.len(), 5);
        assert_eq!(range[0], date(2000, 1, 1));
        assert_eq!(range[4], date(2000, 1, 5));

        let start = date(1979, 1, 1);
        let end = date(2020, 1, 1);
        let range = date_range(start, end);
        assert_eq!(range.len(), 14_976);
        assert_eq!(range.len() as i64, (end - start).num_days() + 1);
    }

    #[test]
    fn test_date_range_crosses_year_and_leap_day() {
        let range = date_range(date(1999, 12, 30), date(2000, 3, 1));
        assert!(range.contains(&date(2000, 2, 29)));
        assert!(range.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(range.len(), 63);
    }

    #[test]
    fn test_reversed_date_range_is_empty() {
        assert!(date_range(date(2000, 1, 5), date(2000, 1, 1)).is_empty());
    }

    #[test]
    fn test_month_range_singleton() {
        assert_eq!(month_range(ym(1990, 1), ym(1990, 1)), vec![ym(1990, 1)]);
        assert_eq!(month_range(ym(1990, 12), ym(1990, 12)), vec![ym(1990, 12)]);
    }

    #[test]
    fn test_month_range_across_year_boundary() {
        let months = month_range(ym(1981, 1), ym(1982, 3));
        assert_eq!(months.len(), 15);
        assert_eq!(months[11], ym(1981, 12));
        assert_eq!(months[12], ym(1982, 1));
        assert_eq!(months[14], ym(1982, 3));
        assert!(months.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_month_range_ending_in_december() {
        let months = month_range(ym(2020, 10), ym(2020, 12));
        assert_eq!(months, vec![ym(2020, 10), ym(2020, 11), ym(2020, 12)]);
    }

    #[test]
    fn test_month_range_from_dates_ignores_day() {
        let months = month_range(date(2021, 11, 30), date(2022, 1, 1));
        assert_eq!(months, vec![ym(2021, 11), ym(2021, 12), ym(2022, 1)]);
    }

    #[test]
    fn test_december_from_exact_multiple_of_twelve() {
        assert_eq!(yearmonth_from_months_since_epoch(12).unwrap(), ym(0, 12));
        assert_eq!(yearmonth_from_months_since_epoch(2000 * 12 + 12).unwrap(), ym(2000, 12));
        assert_eq!(yearmonth_from_months_since_epoch(2001 * 12).unwrap(), ym(2000, 12));
        assert_eq!(yearmonth_from_months_since_epoch(2001 * 12 + 1).unwrap(), ym(2001, 1));
    }

    #[test]
    fn test_month_offset_outside_i32_years_rejected() {
        let last = months_since_epoch(ym(i32::MAX, 12));
        assert_eq!(yearmonth_from_months_since_epoch(last).unwrap(), ym(i32::MAX, 12));
        assert!(yearmonth_from_months_since_epoch(last + 1).is_err());

        let first = months_since_epoch(ym(i32::MIN, 1));
        assert_eq!(yearmonth_from_months_since_epoch(first).unwrap(), ym(i32::MIN, 1));
        assert!(yearmonth_from_months_since_epoch(first - 1).is_err());

        assert!(yearmonth_from_months_since_epoch(i64::MAX).is_err());
        assert!(YearMonth::from_months_since_epoch(i64::MIN).is_err());
    }

    #[test]
    fn test_months_since_epoch_round_trip() {
        for m in (-240..30_000).step_by(7) {
            assert_eq!(months_since_epoch(yearmonth_from_months_since_epoch(m).unwrap()), m);
        }
        for m in [0, 1, 11, 12, 13, 24_000, 24_012] {
            assert_eq!(months_since_epoch(yearmonth_from_months_since_epoch(m).unwrap()), m);
        }
    }

    #[test]
    fn test_yearmonth_parsing_and_display() {
        assert_eq!("2000-01".parse::<YearMonth>().unwrap(), ym(2000, 1));
        assert_eq!("198212".parse::<YearMonth>().unwrap(), ym(1982, 12));
        assert_eq!(ym(1982, 3).to_string(), "198203");
        assert!("2000-13".parse::<YearMonth>().is_err());
        assert!("2000-00".parse::<YearMonth>().is_err());
        assert!("March".parse::<YearMonth>().is_err());
        assert!(YearMonth::new(2000, 0).is_err());
    }

    #[test]
    fn test_yearmonth_ordering() {
        assert!(ym(1999, 12) < ym(2000, 1));
        assert!(ym(2000, 2) > ym(2000, 1));
    }

    #[test]
    fn test_calendar_range_without_end_uses_start() {
        let range = CalendarRange::single(date(2001, 3, 4));
        assert_eq!(range.keys(), vec![date(2001, 3, 4)]);
        assert_eq!(range.last(), date(2001, 3, 4));
        assert_eq!(range.to_string(), "2001-03-04");

        let range = CalendarRange::new(ym(2001, 11), Some(ym(2002, 1)));
        assert_eq!(range.keys().len(), 3);
        assert_eq!(range.to_string(), "2001-11 to 2002-01");
    }

    #[test]
    fn test_calendar_key_labels() {
        assert_eq!(date(2000, 1, 3).file_stamp(), "20000103");
        assert_eq!(date(2000, 1, 3).climatology_label(), "01-03");
        assert_eq!(ym(2000, 7).file_stamp(), "200007");
        assert_eq!(ym(2000, 7).climatology_label(), "7");
    }

    #[test]
    fn test_one_year_later() {
        assert_eq!(date(2000, 2, 29).one_year_later(), date(2001, 2, 28));
        assert_eq!(date(2000, 5, 1).one_year_later(), date(2001, 5, 1));
        assert_eq!(ym(2000, 12).one_year_later(), ym(2001, 12));
    }
}
