use super::{touches_range, HireDataSource, IngestError};
use crate::data::{DateRange, HireEvent, Station};

/// Source over records already held in memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySource {
    events: Vec<HireEvent>,
    stations: Vec<Station>,
}

impl MemorySource {
    pub fn new(events: Vec<HireEvent>, stations: Vec<Station>) -> Self {
        Self { events, stations }
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }
}

impl HireDataSource for MemorySource {
    fn fetch_events(&self, range: &DateRange) -> Result<Vec<HireEvent>, IngestError> {
        Ok(self
            .events
            .iter()
            .filter(|e| touches_range(e, range))
            .cloned()
            .collect())
    }

    fn fetch_stations(&self) -> Result<Vec<Station>, IngestError> {
        Ok(self.stations.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    #[test]
    fn test_events_filtered_by_range() {
        let inside = Utc.with_ymd_and_hms(2016, 6, 1, 8, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2016, 5, 1, 8, 0, 0).unwrap();
        let boundary = Utc.with_ymd_and_hms(2016, 5, 31, 23, 50, 0).unwrap();
        let source = MemorySource::new(
            vec![
                HireEvent::new(1, 1, 1, 2, inside, inside + Duration::minutes(10)),
                HireEvent::new(2, 1, 1, 2, before, before + Duration::minutes(10)),
                HireEvent::new(3, 1, 1, 2, boundary, boundary + Duration::minutes(30)),
            ],
            vec![Station::new(1, "A", 10), Station::new(2, "B", 10)],
        );
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2016, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2016, 6, 2).unwrap(),
        );

        let ids: Vec<u64> = source.fetch_events(&range).unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(source.fetch_stations().unwrap().len(), 2);
    }
}
