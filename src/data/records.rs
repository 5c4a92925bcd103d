use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Station identifier as issued by the hire scheme
pub type StationId = u32;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A single completed hire, as supplied by ingestion
///
/// Source of truth for every derived statistic. Never mutated after ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HireEvent {
    pub id: u64,
    pub bike_id: u32,
    pub start_station_id: StationId,
    pub end_station_id: StationId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: i64,
}

impl HireEvent {
    /// Build an event, deriving duration from the two timestamps
    pub fn new(
        id: u64,
        bike_id: u32,
        start_station_id: StationId,
        end_station_id: StationId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            bike_id,
            start_station_id,
            end_station_id,
            start_time,
            end_time,
            duration_seconds: (end_time - start_time).num_seconds(),
        }
    }

    /// True when the hire ends before it starts
    pub fn is_inverted(&self) -> bool {
        self.end_time < self.start_time
    }
}

/// Docking station reference data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub station_id: StationId,
    pub name: String,
    /// Number of docks
    pub capacity: u32,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Station {
    pub fn new(station_id: StationId, name: impl Into<String>, capacity: u32) -> Self {
        Self {
            station_id,
            name: name.into(),
            capacity,
            latitude: None,
            longitude: None,
        }
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn location(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    /// Great-circle distance to another station in kilometres
    ///
    /// Returns None unless both stations carry coordinates.
    pub fn distance_km(&self, other: &Station) -> Option<f64> {
        haversine_km(self.location()?, other.location()?)
    }
}

/// Haversine distance between two (lat, lon) pairs in degrees
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> Option<f64> {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let d = 2.0 * EARTH_RADIUS_KM * h.sqrt().asin();

    d.is_finite().then_some(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_duration_derived_from_timestamps() {
        let start = Utc.with_ymd_and_hms(2016, 3, 1, 8, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2016, 3, 1, 8, 25, 30).unwrap();
        let event = HireEvent::new(1, 42, 10, 11, start, end);

        assert_eq!(event.duration_seconds, 25 * 60 + 30);
        assert!(!event.is_inverted());
    }

    #[test]
    fn test_distance_requires_both_locations() {
        let a = Station::new(1, "River Street", 19).with_location(51.5291, -0.1099);
        let b = Station::new(2, "Phillimore Gardens", 37).with_location(51.4996, -0.1975);
        let c = Station::new(3, "Unknown", 20);

        let d = a.distance_km(&b).unwrap();
        // Roughly 6.8km across central London
        assert!(d > 6.0 && d < 7.5, "distance was {d}");
        assert!(a.distance_km(&c).is_none());
        assert_eq!(a.distance_km(&a), Some(0.0));
    }

    #[test]
    fn test_station_deserializes_without_coordinates() {
        let json = r#"{"station_id": 7, "name": "Charlbert Street", "capacity": 15}"#;
        let station: Station = serde_json::from_str(json).unwrap();

        assert_eq!(station.capacity, 15);
        assert!(station.location().is_none());
    }
}
