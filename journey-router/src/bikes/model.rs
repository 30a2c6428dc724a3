//! The shared-bike network.

use std::collections::HashMap;

use tracing::debug;

use super::{BikeStation, BikeTransfer, BikeTransferKind, StationDistanceMatrix};
use crate::domain::{BikeStationIdx, BikeTransferIdx, Coordinates, DomainError, StopIdx};
use crate::network::TransitModel;

/// Bike stations, riding distances between them and walks to nearby stops.
///
/// Station-to-stop walks hang off each [`BikeStation`]; stop-to-station walks
/// are indexed here by stop, keeping [`TransitModel`] free of bike data so
/// the two can refresh independently.
#[derive(Debug, Clone, Default)]
pub struct BikeModel {
    stations: Vec<BikeStation>,
    stations_by_id: HashMap<String, BikeStationIdx>,
    distances: StationDistanceMatrix,
    /// Per station, every other station with a recorded distance.
    reachable: Vec<Vec<(BikeStationIdx, i32)>>,
    transfers: Vec<BikeTransfer>,
    stop_transfers: HashMap<StopIdx, Vec<BikeTransferIdx>>,
}

impl BikeModel {
    pub fn new(
        stations: Vec<BikeStation>,
        distances: StationDistanceMatrix,
    ) -> Result<Self, DomainError> {
        let mut stations_by_id = HashMap::with_capacity(stations.len());
        for (i, station) in stations.iter().enumerate() {
            if stations_by_id
                .insert(station.id.clone(), BikeStationIdx(i))
                .is_some()
            {
                return Err(DomainError::DuplicateId(station.id.clone()));
            }
        }

        let reachable = stations
            .iter()
            .map(|station| {
                let mut row: Vec<_> = distances
                    .from_station(&station.id)
                    .filter_map(|(other, d)| stations_by_id.get(other).map(|&idx| (idx, d)))
                    .collect();
                row.sort_unstable();
                row
            })
            .collect();

        Ok(Self {
            stations,
            stations_by_id,
            distances,
            reachable,
            transfers: Vec::new(),
            stop_transfers: HashMap::new(),
        })
    }

    /// Link every stop and station at most `max_distance` meters apart with
    /// a pair of walking transfers. Returns the number of pairs added.
    pub fn connect_stops(&mut self, network: &TransitModel, max_distance: u32) -> usize {
        let mut added = 0;
        for (s, stop) in network.stops().iter().enumerate() {
            let stop_idx = StopIdx(s);
            for b in 0..self.stations.len() {
                let coords = self.stations[b].coords;
                if stop.coords.too_far_in_one_direction(&coords, max_distance) {
                    continue;
                }
                let distance = stop.coords.simplified_distance_to(&coords);
                if distance > max_distance {
                    continue;
                }

                let to_station = BikeTransferIdx(self.transfers.len());
                let from_station = BikeTransferIdx(to_station.index() + 1);
                let station = BikeStationIdx(b);
                self.transfers.push(BikeTransfer {
                    stop: stop_idx,
                    station,
                    kind: BikeTransferKind::ToStation,
                    distance,
                    opposite: Some(from_station),
                });
                self.transfers.push(BikeTransfer {
                    stop: stop_idx,
                    station,
                    kind: BikeTransferKind::FromStation,
                    distance,
                    opposite: Some(to_station),
                });
                self.stop_transfers
                    .entry(stop_idx)
                    .or_default()
                    .push(to_station);
                self.stations[b].transfers.push(from_station);
                added += 1;
            }
        }
        debug!(pairs = added, "connected bike stations to stops");
        added
    }

    /// A copy of this model with live bike counts replaced. Stations missing
    /// from `counts` keep their previous count.
    pub fn with_bike_counts(&self, counts: &HashMap<String, u32>) -> Self {
        let mut updated = self.clone();
        for station in &mut updated.stations {
            if let Some(&count) = counts.get(&station.id) {
                station.bike_count = count;
            }
        }
        updated
    }

    pub fn station(&self, idx: BikeStationIdx) -> &BikeStation {
        &self.stations[idx.index()]
    }

    pub fn stations(&self) -> &[BikeStation] {
        &self.stations
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn station_by_id(&self, id: &str) -> Option<BikeStationIdx> {
        self.stations_by_id.get(id).copied()
    }

    pub fn transfer(&self, idx: BikeTransferIdx) -> &BikeTransfer {
        &self.transfers[idx.index()]
    }

    /// Walks from a stop to nearby stations.
    pub fn transfers_from_stop(&self, stop: StopIdx) -> &[BikeTransferIdx] {
        self.stop_transfers
            .get(&stop)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Riding distance between two stations; `-1` when unknown.
    pub fn distance(&self, a: BikeStationIdx, b: BikeStationIdx) -> i32 {
        self.distances
            .get(&self.station(a).id, &self.station(b).id)
    }

    /// Every station with a recorded distance from `from`, unreachable
    /// entries included.
    pub fn distances_from(&self, from: BikeStationIdx) -> &[(BikeStationIdx, i32)] {
        &self.reachable[from.index()]
    }

    /// Stations strictly closer than `radius` meters, with their distances.
    pub fn near_stations(&self, coords: &Coordinates, radius: u32) -> Vec<(BikeStationIdx, u32)> {
        self.stations
            .iter()
            .enumerate()
            .filter(|(_, s)| !coords.too_far_in_one_direction(&s.coords, radius))
            .filter_map(|(i, s)| {
                let distance = coords.simplified_distance_to(&s.coords);
                (distance < radius).then_some((BikeStationIdx(i), distance))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RoutePoint;
    use crate::network::NetworkBuilder;

    fn model() -> BikeModel {
        let stations = vec![
            BikeStation::new("S1", "One", Coordinates::new(50.0, 14.0), 10),
            BikeStation::new("S2", "Two", Coordinates::new(50.01, 14.0), 10),
            BikeStation::new("S3", "Three", Coordinates::new(50.02, 14.0), 10),
        ];
        let mut d = StationDistanceMatrix::new();
        d.add("S1", "S2", 1200);
        d.add("S1", "S3", -1);
        d.add("S1", "ghost", 50);
        BikeModel::new(stations, d).unwrap()
    }

    #[test]
    fn duplicate_station_ids_rejected() {
        let stations = vec![
            BikeStation::new("S1", "One", Coordinates::new(50.0, 14.0), 10),
            BikeStation::new("S1", "Again", Coordinates::new(50.0, 14.0), 10),
        ];
        assert!(matches!(
            BikeModel::new(stations, StationDistanceMatrix::new()),
            Err(DomainError::DuplicateId(_))
        ));
    }

    #[test]
    fn adjacency_skips_unknown_stations() {
        let m = model();
        let s1 = m.station_by_id("S1").unwrap();
        assert_eq!(
            m.distances_from(s1),
            &[(BikeStationIdx(1), 1200), (BikeStationIdx(2), -1)]
        );
        assert_eq!(m.distance(BikeStationIdx(1), s1), 1200);
        assert_eq!(m.distance(BikeStationIdx(1), BikeStationIdx(2)), -1);
    }

    #[test]
    fn bike_counts_publish_a_copy() {
        let m = model();
        let counts = HashMap::from([("S2".to_string(), 4)]);
        let updated = m.with_bike_counts(&counts);
        assert_eq!(updated.station(BikeStationIdx(1)).bike_count, 4);
        assert!(updated.station(BikeStationIdx(1)).has_bikes());
        assert_eq!(m.station(BikeStationIdx(1)).bike_count, 0);
    }

    #[test]
    fn stops_connect_both_ways() {
        let mut b = NetworkBuilder::new();
        b.add_stop("A", "A", Coordinates::new(50.001, 14.0)).unwrap();
        b.add_stop("Far", "Far", Coordinates::new(51.0, 14.0)).unwrap();
        let network = b.build();

        let mut m = model();
        assert_eq!(m.connect_stops(&network, 750), 1);

        let a = network.stop_by_id("A").unwrap();
        let there = m.transfer(m.transfers_from_stop(a)[0]);
        assert_eq!(there.source(), RoutePoint::Stop(a));
        assert_eq!(there.target(), RoutePoint::BikeStation(BikeStationIdx(0)));
        assert_eq!(there.distance, 111);

        let back = m.transfer(there.opposite.unwrap());
        assert_eq!(back.source(), RoutePoint::BikeStation(BikeStationIdx(0)));
        assert_eq!(m.station(BikeStationIdx(0)).transfers.len(), 1);
        assert!(m.transfers_from_stop(network.stop_by_id("Far").unwrap()).is_empty());
    }

    #[test]
    fn near_stations_strict_radius() {
        let m = model();
        let near = m.near_stations(&Coordinates::new(50.0, 14.0), 1112);
        assert_eq!(near, vec![(BikeStationIdx(0), 0), (BikeStationIdx(1), 1111)]);
        let near = m.near_stations(&Coordinates::new(50.0, 14.0), 1111);
        assert_eq!(near, vec![(BikeStationIdx(0), 0)]);
    }
}
