use super::records::{Station, StationId};
use std::collections::BTreeMap;

/// Stations usable for analysis, keyed and ordered by id
#[derive(Debug, Clone, Default)]
pub struct StationIndex {
    stations: BTreeMap<StationId, Station>,
    zero_capacity: usize,
    duplicates: usize,
}

impl StationIndex {
    /// Index stations, dropping dockless entries and repeated ids
    ///
    /// The first record seen for an id wins.
    pub fn build(stations: &[Station]) -> Self {
        let mut index = Self::default();

        for station in stations {
            if station.capacity == 0 {
                index.zero_capacity += 1;
                continue;
            }
            if index.stations.contains_key(&station.station_id) {
                index.duplicates += 1;
                continue;
            }
            index.stations.insert(station.station_id, station.clone());
        }

        index
    }

    pub fn get(&self, id: StationId) -> Option<&Station> {
        self.stations.get(&id)
    }

    pub fn contains(&self, id: StationId) -> bool {
        self.stations.contains_key(&id)
    }

    pub fn capacity(&self, id: StationId) -> Option<u32> {
        self.get(id).map(|s| s.capacity)
    }

    pub fn name(&self, id: StationId) -> &str {
        self.get(id).map(|s| s.name.as_str()).unwrap_or("unknown")
    }

    pub fn ids(&self) -> impl Iterator<Item = StationId> + '_ {
        self.stations.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Stations dropped because they have no docks
    pub fn zero_capacity_count(&self) -> usize {
        self.zero_capacity
    }

    /// Records dropped because their id was already indexed
    pub fn duplicate_count(&self) -> usize {
        self.duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_drops_dockless_and_duplicates() {
        let stations = vec![
            Station::new(3, "Hyde Park Corner", 30),
            Station::new(1, "Waterloo", 0),
            Station::new(3, "Hyde Park Corner (old)", 12),
            Station::new(2, "Belgrove Street", 48),
        ];
        let index = StationIndex::build(&stations);

        assert_eq!(index.len(), 2);
        assert_eq!(index.zero_capacity_count(), 1);
        assert_eq!(index.duplicate_count(), 1);
        assert_eq!(index.capacity(3), Some(30));
        assert_eq!(index.ids().collect::<Vec<_>>(), vec![2, 3]);
        assert!(!index.contains(1));
        assert_eq!(index.name(99), "unknown");
    }
}
