use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bucket size used to partition the analysis period
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annual,
}

impl Granularity {
    /// Start of the bucket containing `ts`
    ///
    /// Weeks start on Monday, quarters on Jan/Apr/Jul/Oct 1st.
    pub fn floor(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let date = ts.date_naive();
        match self {
            Granularity::Hourly => midnight(date) + Duration::hours(i64::from(ts.hour())),
            Granularity::Daily => midnight(date),
            Granularity::Weekly => {
                let back = i64::from(date.weekday().num_days_from_monday());
                midnight(date - Duration::days(back))
            }
            Granularity::Monthly => midnight(first_of_month(date.year(), date.month())),
            Granularity::Quarterly => {
                let month = (date.month0() / 3) * 3 + 1;
                midnight(first_of_month(date.year(), month))
            }
            Granularity::Annual => midnight(first_of_month(date.year(), 1)),
        }
    }

    /// Start of the bucket following the one starting at `bucket_start`
    pub fn advance(&self, bucket_start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Granularity::Hourly => bucket_start.checked_add_signed(Duration::hours(1)),
            Granularity::Daily => bucket_start.checked_add_signed(Duration::days(1)),
            Granularity::Weekly => bucket_start.checked_add_signed(Duration::days(7)),
            Granularity::Monthly => bucket_start.checked_add_months(Months::new(1)),
            Granularity::Quarterly => bucket_start.checked_add_months(Months::new(3)),
            Granularity::Annual => bucket_start.checked_add_months(Months::new(12)),
        }
    }

    /// Split `range` into contiguous, non-overlapping windows
    ///
    /// Windows are aligned to bucket boundaries; the first and last are
    /// clipped to the range so the union is exactly the range.
    pub fn partition(&self, range: &DateRange) -> Vec<IntervalWindow> {
        let (lo, hi) = (range.start_instant(), range.end_instant());
        let mut windows = Vec::new();

        let mut bucket = self.floor(lo);
        while bucket < hi {
            let Some(next) = self.advance(bucket) else {
                break;
            };
            windows.push(IntervalWindow {
                start: bucket.max(lo),
                end: next.min(hi),
            });
            bucket = next;
        }

        windows
    }

    pub fn label(&self) -> &'static str {
        match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
            Granularity::Quarterly => "quarterly",
            Granularity::Annual => "annual",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Requested analysis period
///
/// Covers `[start 00:00 UTC, end 00:00 UTC)`. `start == end` is an empty range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }

    pub fn start_instant(&self) -> DateTime<Utc> {
        midnight(self.start)
    }

    pub fn end_instant(&self) -> DateTime<Utc> {
        midnight(self.end)
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start_instant() && ts < self.end_instant()
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Half-open time window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntervalWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl IntervalWindow {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

/// Index of the window containing `ts` in a sorted, contiguous partition
pub fn locate(windows: &[IntervalWindow], ts: DateTime<Utc>) -> Option<usize> {
    let idx = windows.partition_point(|w| w.end <= ts);
    windows
        .get(idx)
        .filter(|w| w.contains(ts))
        .map(|_| idx)
}

/// True for Saturday and Sunday
pub fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    // Day 1 exists for every month chrono can represent
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn assert_contiguous(windows: &[IntervalWindow], range: &DateRange) {
        assert_eq!(windows.first().unwrap().start, range.start_instant());
        assert_eq!(windows.last().unwrap().end, range.end_instant());
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].start < pair[0].end);
        }
    }

    #[test]
    fn test_hourly_partition_of_one_day() {
        let range = DateRange::new(date(2016, 6, 1), date(2016, 6, 2));
        let windows = Granularity::Hourly.partition(&range);

        assert_eq!(windows.len(), 24);
        assert_contiguous(&windows, &range);
    }

    #[test]
    fn test_weekly_partition_clips_to_range() {
        // 2016-01-01 is a Friday
        let range = DateRange::new(date(2016, 1, 1), date(2016, 1, 15));
        let windows = Granularity::Weekly.partition(&range);

        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].end, ts(2016, 1, 4, 0, 0));
        assert_eq!(windows[1].end, ts(2016, 1, 11, 0, 0));
        assert_contiguous(&windows, &range);
    }

    #[test]
    fn test_monthly_and_quarterly_boundaries() {
        let range = DateRange::new(date(2016, 1, 15), date(2016, 12, 31));

        let months = Granularity::Monthly.partition(&range);
        assert_eq!(months.len(), 12);
        assert_eq!(months[1].start, ts(2016, 2, 1, 0, 0));
        assert_contiguous(&months, &range);

        let quarters = Granularity::Quarterly.partition(&range);
        assert_eq!(quarters.len(), 4);
        assert_eq!(quarters[2].start, ts(2016, 7, 1, 0, 0));
        assert_contiguous(&quarters, &range);

        let years = Granularity::Annual.partition(&range);
        assert_eq!(years.len(), 1);
    }

    #[test]
    fn test_empty_range_has_no_windows() {
        let range = DateRange::new(date(2016, 5, 5), date(2016, 5, 5));
        assert!(Granularity::Daily.partition(&range).is_empty());
        assert_eq!(range.days(), 0);
    }

    #[test]
    fn test_locate_window() {
        let range = DateRange::new(date(2016, 6, 1), date(2016, 6, 2));
        let windows = Granularity::Hourly.partition(&range);

        assert_eq!(locate(&windows, ts(2016, 6, 1, 0, 0)), Some(0));
        assert_eq!(locate(&windows, ts(2016, 6, 1, 8, 59)), Some(8));
        assert_eq!(locate(&windows, ts(2016, 6, 1, 9, 0)), Some(9));
        assert_eq!(locate(&windows, ts(2016, 6, 2, 0, 0)), None);
        assert_eq!(locate(&windows, ts(2016, 5, 31, 23, 59)), None);
    }

    #[test]
    fn test_floor_weekly_starts_monday() {
        // Sunday evening belongs to the week starting the previous Monday
        assert_eq!(
            Granularity::Weekly.floor(ts(2016, 1, 10, 22, 30)),
            ts(2016, 1, 4, 0, 0)
        );
    }
}
