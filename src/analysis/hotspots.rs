use crate::data::{DateRange, HireEvent, StationId, StationIndex};
use chrono::{Datelike, NaiveDate, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Utilisation bands and cost assumptions for hotspot detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotspotConfig {
    pub near_capacity_pct: f64,
    pub at_capacity_pct: f64,
    /// Hours at or above this band count towards the peak slot
    pub peak_pct: f64,
    pub lost_rentals_per_full_hour: f64,
    pub rental_fee: f64,
    /// At-capacity hours above which dock expansion is recommended
    pub expansion_threshold: usize,
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            near_capacity_pct: 80.0,
            at_capacity_pct: 100.0,
            peak_pct: 95.0,
            lost_rentals_per_full_hour: 5.0,
            rental_fee: 1.65,
            expansion_threshold: 20,
        }
    }
}

/// Weekday and hour at which a station most often runs hot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakSlot {
    pub weekday: Weekday,
    pub hour: u32,
    pub occurrences: usize,
    pub avg_utilisation_pct: f64,
}

/// Station whose hourly arrivals regularly approach its dock count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityHotspot {
    pub station_id: StationId,
    pub name: String,
    pub capacity: u32,
    /// Hours in the near band but below full
    pub near_capacity_hours: usize,
    pub at_capacity_hours: usize,
    /// Averages and maxima over hours at or above the near band
    pub avg_hourly_arrivals: f64,
    pub avg_utilisation_pct: f64,
    pub max_hourly_arrivals: u32,
    pub max_utilisation_pct: f64,
    pub peak_slot: Option<PeakSlot>,
    pub at_capacity_per_interval: f64,
    pub estimated_lost_revenue: f64,
    pub expansion_recommended: bool,
}

/// Hourly arrival hotspot analyzer
///
/// Arrivals in a single hour are compared with the station's dock count:
/// utilisation = arrivals / docks * 100. Hours in the near band are
/// collected per station and summarised.
pub struct HotspotAnalyzer {
    config: HotspotConfig,
    top_n: usize,
}

impl HotspotAnalyzer {
    pub fn new(config: HotspotConfig, top_n: usize) -> Self {
        Self { config, top_n }
    }

    /// Find the stations most often at capacity
    ///
    /// Ordered by at-capacity hours, then near-capacity hours (both
    /// descending), then station id.
    pub fn analyze(
        &self,
        events: &[HireEvent],
        stations: &StationIndex,
        range: &DateRange,
        interval_count: usize,
    ) -> Vec<CapacityHotspot> {
        let mut hourly: BTreeMap<(StationId, NaiveDate, u32), u32> = BTreeMap::new();
        for event in events {
            if !stations.contains(event.start_station_id)
                || !stations.contains(event.end_station_id)
                || event.is_inverted()
                || !range.contains(event.end_time)
            {
                continue;
            }
            let key = (event.end_station_id, event.end_time.date_naive(), event.end_time.hour());
            *hourly.entry(key).or_insert(0) += 1;
        }

        let mut hot_hours: BTreeMap<StationId, Vec<HotHour>> = BTreeMap::new();
        for ((id, date, hour), arrivals) in hourly {
            let Some(capacity) = stations.capacity(id) else {
                continue;
            };
            let utilisation = f64::from(arrivals) / f64::from(capacity) * 100.0;
            if utilisation >= self.config.near_capacity_pct {
                hot_hours.entry(id).or_default().push(HotHour {
                    weekday: date.weekday(),
                    hour,
                    arrivals,
                    utilisation,
                });
            }
        }

        let mut hotspots: Vec<CapacityHotspot> = hot_hours
            .into_iter()
            .filter_map(|(id, hours)| {
                let station = stations.get(id)?;
                Some(self.summarise(id, &station.name, station.capacity, &hours, interval_count))
            })
            .collect();

        hotspots.sort_by(|a, b| {
            b.at_capacity_hours
                .cmp(&a.at_capacity_hours)
                .then(b.near_capacity_hours.cmp(&a.near_capacity_hours))
                .then(a.station_id.cmp(&b.station_id))
        });
        hotspots.truncate(self.top_n);
        hotspots
    }

    fn summarise(
        &self,
        station_id: StationId,
        name: &str,
        capacity: u32,
        hours: &[HotHour],
        interval_count: usize,
    ) -> CapacityHotspot {
        let at_capacity_hours = hours
            .iter()
            .filter(|h| h.utilisation >= self.config.at_capacity_pct)
            .count();
        let arrivals: Vec<f64> = hours.iter().map(|h| f64::from(h.arrivals)).collect();
        let utilisation: Vec<f64> = hours.iter().map(|h| h.utilisation).collect();

        CapacityHotspot {
            station_id,
            name: name.to_string(),
            capacity,
            near_capacity_hours: hours.len() - at_capacity_hours,
            at_capacity_hours,
            avg_hourly_arrivals: arrivals.iter().mean(),
            avg_utilisation_pct: utilisation.iter().mean(),
            max_hourly_arrivals: hours.iter().map(|h| h.arrivals).fold(0, u32::max),
            max_utilisation_pct: hours.iter().map(|h| h.utilisation).fold(0.0, f64::max),
            peak_slot: self.peak_slot(hours),
            at_capacity_per_interval: at_capacity_hours as f64 / interval_count.max(1) as f64,
            estimated_lost_revenue: at_capacity_hours as f64
                * self.config.lost_rentals_per_full_hour
                * self.config.rental_fee,
            expansion_recommended: at_capacity_hours > self.config.expansion_threshold,
        }
    }

    /// Most frequent weekday/hour above the peak band, ties by higher
    /// average utilisation, then earliest slot
    fn peak_slot(&self, hours: &[HotHour]) -> Option<PeakSlot> {
        let mut slots: BTreeMap<(u32, u32), Vec<f64>> = BTreeMap::new();
        for h in hours.iter().filter(|h| h.utilisation >= self.config.peak_pct) {
            slots
                .entry((h.weekday.num_days_from_monday(), h.hour))
                .or_default()
                .push(h.utilisation);
        }

        let mut best: Option<PeakSlot> = None;
        for ((day, hour), values) in slots {
            let candidate = PeakSlot {
                weekday: weekday_from_monday(day),
                hour,
                occurrences: values.len(),
                avg_utilisation_pct: values.iter().mean(),
            };
            let better = match &best {
                None => true,
                Some(b) => {
                    candidate.occurrences > b.occurrences
                        || (candidate.occurrences == b.occurrences
                            && candidate.avg_utilisation_pct > b.avg_utilisation_pct)
                }
            };
            if better {
                best = Some(candidate);
            }
        }

        best
    }
}

struct HotHour {
    weekday: Weekday,
    hour: u32,
    arrivals: u32,
    utilisation: f64,
}

fn weekday_from_monday(days: u32) -> Weekday {
    [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ][(days % 7) as usize]
}
