use super::interval::DateRange;
use super::records::{HireEvent, Station, StationId};
use chrono::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Parameters for a synthetic hire data set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticSpec {
    pub station_count: u32,
    pub range: DateRange,
    pub hires_per_day: u32,
    /// Share of events pointing at a station id that does not exist
    pub malformed_ratio: f64,
    pub seed: u64,
}

/// Stations plus the hires generated over them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticDataSet {
    pub stations: Vec<Station>,
    pub events: Vec<HireEvent>,
}

/// Generate a commuter-shaped data set
///
/// The first third of the stations behave as residential (morning departures),
/// the next third as business districts (morning arrivals), the rest are mixed.
pub fn generate(spec: &SyntheticSpec) -> SyntheticDataSet {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let count = spec.station_count.max(2);

    // Central London bounding box
    let stations: Vec<Station> = (1..=count)
        .map(|id| {
            let lat = rng.gen_range(51.48..51.54);
            let lon = rng.gen_range(-0.20..-0.05);
            let capacity = rng.gen_range(10..=40);
            Station::new(id, format!("Station {id}"), capacity).with_location(lat, lon)
        })
        .collect();

    // NaN would survive clamp and panic in gen_bool
    let malformed_ratio = if spec.malformed_ratio.is_finite() {
        spec.malformed_ratio.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let residential = count / 3;
    let business = 2 * count / 3;
    let pick = |rng: &mut StdRng, lo: u32, hi: u32| -> StationId { rng.gen_range(lo..=hi.max(lo)) };

    let mut events = Vec::new();
    let mut next_id = 1u64;
    let mut day = spec.range.start_instant();

    while day < spec.range.end_instant() {
        for _ in 0..spec.hires_per_day {
            let hour: i64 = rng.gen_range(6..23);
            let minute: i64 = rng.gen_range(0..60);
            let start_time = day + Duration::hours(hour) + Duration::minutes(minute);
            let ride = Duration::seconds(rng.gen_range(180..3600));

            let (from, to) = if hour < 11 {
                (pick(&mut rng, 1, residential.max(1)), pick(&mut rng, residential + 1, business))
            } else if hour >= 16 && hour < 20 {
                (pick(&mut rng, residential + 1, business), pick(&mut rng, 1, residential.max(1)))
            } else {
                (pick(&mut rng, 1, count), pick(&mut rng, 1, count))
            };

            let (from, to) = if rng.gen_bool(malformed_ratio) {
                (count + 1000, to)
            } else {
                (from, to)
            };

            events.push(HireEvent::new(
                next_id,
                rng.gen_range(1..20_000),
                from,
                to,
                start_time,
                start_time + ride,
            ));
            next_id += 1;
        }
        day += Duration::days(1);
    }

    SyntheticDataSet { stations, events }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn spec(seed: u64) -> SyntheticSpec {
        SyntheticSpec {
            station_count: 12,
            range: DateRange::new(
                NaiveDate::from_ymd_opt(2016, 3, 7).unwrap(),
                NaiveDate::from_ymd_opt(2016, 3, 9).unwrap(),
            ),
            hires_per_day: 50,
            malformed_ratio: 0.0,
            seed,
        }
    }

    #[test]
    fn test_same_seed_same_data() {
        let a = generate(&spec(7));
        let b = generate(&spec(7));

        assert_eq!(a.events, b.events);
        assert_eq!(a.stations, b.stations);
    }

    #[test]
    fn test_events_reference_generated_stations() {
        let data = generate(&spec(11));

        assert_eq!(data.stations.len(), 12);
        assert_eq!(data.events.len(), 100);
        for event in &data.events {
            assert!((1..=12).contains(&event.start_station_id));
            assert!((1..=12).contains(&event.end_station_id));
            assert!(event.duration_seconds > 0);
        }
    }

    #[test]
    fn test_non_finite_malformed_ratio_generates_clean_data() {
        let mut nan = spec(3);
        nan.malformed_ratio = f64::NAN;
        let data = generate(&nan);

        assert_eq!(data.events.len(), 100);
        assert!(data.events.iter().all(|e| e.start_station_id <= 12));
        assert_eq!(data.events, generate(&spec(3)).events);
    }
}
