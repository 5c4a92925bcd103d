use crate::data::{is_weekend, DateRange, HireEvent, StationIndex};
use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};

/// Network arrivals by hour of day, weekdays and weekends apart
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakTimes {
    pub weekday_arrivals: [u64; 24],
    pub weekend_arrivals: [u64; 24],
}

impl PeakTimes {
    /// Count arrivals of every valid hire ending inside `range`
    pub fn from_events(events: &[HireEvent], stations: &StationIndex, range: &DateRange) -> Self {
        let mut peaks = Self::default();

        for event in events {
            if !stations.contains(event.start_station_id)
                || !stations.contains(event.end_station_id)
                || event.is_inverted()
                || !range.contains(event.end_time)
            {
                continue;
            }
            let hour = event.end_time.hour() as usize;
            if is_weekend(event.end_time.weekday()) {
                peaks.weekend_arrivals[hour] += 1;
            } else {
                peaks.weekday_arrivals[hour] += 1;
            }
        }

        peaks
    }

    /// Busiest `n` weekday hours as (hour, arrivals)
    pub fn top_weekday_hours(&self, n: usize) -> Vec<(u32, u64)> {
        top_hours(&self.weekday_arrivals, n)
    }

    /// Busiest `n` weekend hours as (hour, arrivals)
    pub fn top_weekend_hours(&self, n: usize) -> Vec<(u32, u64)> {
        top_hours(&self.weekend_arrivals, n)
    }

    pub fn total(&self) -> u64 {
        self.weekday_arrivals.iter().chain(&self.weekend_arrivals).sum()
    }
}

fn top_hours(arrivals: &[u64; 24], n: usize) -> Vec<(u32, u64)> {
    let mut hours: Vec<(u32, u64)> = arrivals
        .iter()
        .enumerate()
        .filter(|(_, &count)| count > 0)
        .map(|(hour, &count)| (hour as u32, count))
        .collect();
    hours.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    hours.truncate(n);
    hours
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Station;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    #[test]
    fn test_weekday_weekend_split() {
        let stations = StationIndex::build(&[Station::new(1, "A", 20), Station::new(2, "B", 20)]);
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2016, 6, 6).unwrap(),
            NaiveDate::from_ymd_opt(2016, 6, 13).unwrap(),
        );
        let mut events = Vec::new();
        let mut push = |day: u32, hour: u32, count: u64| {
            for _ in 0..count {
                let end = Utc.with_ymd_and_hms(2016, 6, day, hour, 30, 0).unwrap();
                let id = events.len() as u64;
                events.push(HireEvent::new(id, 1, 1, 2, end - Duration::minutes(20), end));
            }
        };
        // Monday commute, Saturday afternoon
        push(6, 8, 5);
        push(7, 17, 4);
        push(8, 8, 2);
        push(11, 14, 6);
        push(12, 15, 1);

        let peaks = PeakTimes::from_events(&events, &stations, &range);

        assert_eq!(peaks.weekday_arrivals[8], 7);
        assert_eq!(peaks.weekend_arrivals[14], 6);
        assert_eq!(peaks.top_weekday_hours(3), vec![(8, 7), (17, 4)]);
        assert_eq!(peaks.top_weekend_hours(1), vec![(14, 6)]);
        assert_eq!(peaks.total(), 18);
    }
}
