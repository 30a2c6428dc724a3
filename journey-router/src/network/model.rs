//! The immutable transit network.

use std::collections::HashMap;

use super::{Route, Stop, Transfer, Trip};
use crate::domain::{Coordinates, RouteIdx, StopIdx, TransferIdx, TripIdx};

/// Stops, routes, trips and transfers stored as index-addressed arenas.
///
/// Built once per data refresh by [`NetworkBuilder`](super::NetworkBuilder)
/// and shared read-only by every search.
#[derive(Debug, Clone, Default)]
pub struct TransitModel {
    pub(crate) stops: Vec<Stop>,
    pub(crate) routes: Vec<Route>,
    pub(crate) trips: Vec<Trip>,
    pub(crate) transfers: Vec<Transfer>,
    pub(crate) stops_by_id: HashMap<String, StopIdx>,
    pub(crate) stops_by_name: HashMap<String, Vec<StopIdx>>,
}

impl TransitModel {
    pub fn stop(&self, idx: StopIdx) -> &Stop {
        &self.stops[idx.index()]
    }

    pub fn route(&self, idx: RouteIdx) -> &Route {
        &self.routes[idx.index()]
    }

    pub fn trip(&self, idx: TripIdx) -> &Trip {
        &self.trips[idx.index()]
    }

    pub fn transfer(&self, idx: TransferIdx) -> &Transfer {
        &self.transfers[idx.index()]
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn stop_by_id(&self, id: &str) -> Option<StopIdx> {
        self.stops_by_id.get(id).copied()
    }

    /// All stops carrying exactly this name. Empty if the name is unknown.
    pub fn stops_by_name(&self, name: &str) -> &[StopIdx] {
        self.stops_by_name
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Stops strictly closer than `radius` meters, with their distances.
    pub fn stops_near(&self, coords: &Coordinates, radius: u32) -> Vec<(StopIdx, u32)> {
        self.stops
            .iter()
            .enumerate()
            .filter(|(_, stop)| !coords.too_far_in_one_direction(&stop.coords, radius))
            .filter_map(|(i, stop)| {
                let distance = coords.distance_to(&stop.coords);
                (distance < radius).then_some((StopIdx(i), distance))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkBuilder;

    fn model() -> TransitModel {
        let mut b = NetworkBuilder::new();
        b.add_stop("U1", "Main Square", Coordinates::new(50.0, 14.0)).unwrap();
        b.add_stop("U2", "Main Square", Coordinates::new(50.0002, 14.0)).unwrap();
        b.add_stop("U3", "Harbour", Coordinates::new(50.01, 14.0)).unwrap();
        b.build()
    }

    #[test]
    fn lookup_by_id_and_name() {
        let m = model();
        assert_eq!(m.stop_by_id("U3"), Some(StopIdx(2)));
        assert_eq!(m.stop_by_id("nope"), None);
        assert_eq!(m.stops_by_name("Main Square"), &[StopIdx(0), StopIdx(1)]);
        assert!(m.stops_by_name("Nowhere").is_empty());
    }

    #[test]
    fn radius_lookup_is_strict() {
        let m = model();
        let here = Coordinates::new(50.0, 14.0);

        let near = m.stops_near(&here, 100);
        let ids: Vec<_> = near.iter().map(|(s, _)| m.stop(*s).id.as_str()).collect();
        assert_eq!(ids, ["U1", "U2"]);
        assert_eq!(near[0].1, 0);

        let exact = near[1].1;
        assert_eq!(m.stops_near(&here, exact).len(), 1);
        assert_eq!(m.stops_near(&here, exact + 1).len(), 2);
    }
}
