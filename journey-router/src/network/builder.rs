//! Assembling a [`TransitModel`].

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};

use super::{Route, RouteInfo, Stop, Transfer, TransitModel, Trip, VehicleType};
use crate::domain::{
    Coordinates, DomainError, RouteIdx, StopIdx, StopTime, TransferIdx, TripIdx, parse_clock,
    stop_times_from_clock,
};

/// Stops closer than this are connected by generated walking transfers.
pub const MAX_TRANSFER_DISTANCE: u32 = 750;

/// A segment walking transfers may not cross (rivers, motorways, rail
/// corridors).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForbiddenCrossing {
    pub a: Coordinates,
    pub b: Coordinates,
}

impl ForbiddenCrossing {
    /// Whether the straight walk from `p` to `q` intersects this segment.
    pub fn blocks(&self, p: &Coordinates, q: &Coordinates) -> bool {
        let o1 = orientation(&self.a, &self.b, p);
        let o2 = orientation(&self.a, &self.b, q);
        let o3 = orientation(p, q, &self.a);
        let o4 = orientation(p, q, &self.b);
        o1 != o2 && o3 != o4
    }
}

fn orientation(p: &Coordinates, q: &Coordinates, r: &Coordinates) -> i8 {
    let val = (q.lon - p.lon) * (r.lat - q.lat) - (q.lat - p.lat) * (r.lon - q.lon);
    if val == 0.0 {
        0
    } else if val > 0.0 {
        1
    } else {
        2
    }
}

/// Incrementally builds a [`TransitModel`], checking references as it goes.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use journey_router::domain::Coordinates;
/// use journey_router::network::{NetworkBuilder, VehicleType};
///
/// let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
/// let mut b = NetworkBuilder::new();
/// b.add_stop("A", "Alpha", Coordinates::new(50.0, 14.0)).unwrap();
/// b.add_stop("B", "Beta", Coordinates::new(50.01, 14.0)).unwrap();
/// b.add_route("R1", "1", VehicleType::Bus, &["A", "B"]).unwrap();
/// b.add_trip_from_clock("R1", "T1", &[day], &[("08:05", "08:05"), ("08:15", "08:15")])
///     .unwrap();
/// let model = b.build();
///
/// assert_eq!(model.stops().len(), 2);
/// assert_eq!(model.route(model.stop(model.stop_by_id("A").unwrap()).routes[0]).trips_on(day).len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    model: TransitModel,
    routes_by_id: HashMap<String, RouteIdx>,
    trip_ids: HashMap<String, TripIdx>,
    forbidden_crossings: Vec<ForbiddenCrossing>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stop(
        &mut self,
        id: &str,
        name: &str,
        coords: Coordinates,
    ) -> Result<StopIdx, DomainError> {
        if !coords.is_valid() {
            return Err(DomainError::InvalidCoordinates {
                lat: coords.lat,
                lon: coords.lon,
            });
        }
        if self.model.stops_by_id.contains_key(id) {
            return Err(DomainError::DuplicateId(id.to_string()));
        }

        let idx = StopIdx(self.model.stops.len());
        self.model.stops.push(Stop::new(id, name, coords));
        self.model.stops_by_id.insert(id.to_string(), idx);
        self.model
            .stops_by_name
            .entry(name.to_string())
            .or_default()
            .push(idx);
        Ok(idx)
    }

    /// Add a route whose line id equals its own id, with no long name or
    /// color.
    pub fn add_route(
        &mut self,
        id: &str,
        short_name: &str,
        vehicle_type: VehicleType,
        stop_ids: &[&str],
    ) -> Result<RouteIdx, DomainError> {
        let info = RouteInfo {
            line_id: id.to_string(),
            short_name: short_name.to_string(),
            long_name: String::new(),
            vehicle_type,
            color: None,
        };
        self.add_route_with_info(id, info, stop_ids)
    }

    pub fn add_route_with_info(
        &mut self,
        id: &str,
        info: RouteInfo,
        stop_ids: &[&str],
    ) -> Result<RouteIdx, DomainError> {
        if self.routes_by_id.contains_key(id) {
            return Err(DomainError::DuplicateId(id.to_string()));
        }
        if stop_ids.len() < 2 {
            return Err(DomainError::RouteTooShort(id.to_string()));
        }
        let stops = stop_ids
            .iter()
            .map(|s| {
                self.model
                    .stop_by_id(s)
                    .ok_or_else(|| DomainError::UnknownStop(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let idx = RouteIdx(self.model.routes.len());
        for &stop in &stops {
            let routes = &mut self.model.stops[stop.index()].routes;
            if !routes.contains(&idx) {
                routes.push(idx);
            }
        }
        self.model.routes.push(Route::new(id, info, stops));
        self.routes_by_id.insert(id.to_string(), idx);
        Ok(idx)
    }

    /// Add a trip running the route's pattern on each of `service_dates`.
    pub fn add_trip(
        &mut self,
        route_id: &str,
        trip_id: &str,
        service_dates: &[NaiveDate],
        stop_times: Vec<StopTime>,
    ) -> Result<TripIdx, DomainError> {
        let route_idx = *self
            .routes_by_id
            .get(route_id)
            .ok_or_else(|| DomainError::UnknownRoute(route_id.to_string()))?;
        if self.trip_ids.contains_key(trip_id) {
            return Err(DomainError::DuplicateId(trip_id.to_string()));
        }
        let route = &mut self.model.routes[route_idx.index()];
        if route.stops.len() != stop_times.len() {
            return Err(DomainError::StopCountMismatch {
                trip: trip_id.to_string(),
                expected: route.stops.len(),
                actual: stop_times.len(),
            });
        }

        let idx = TripIdx(self.model.trips.len());
        for &date in service_dates {
            route.trips_by_date.entry(date).or_default().push(idx);
        }
        self.model.trips.push(Trip {
            id: trip_id.to_string(),
            route: route_idx,
            stop_times,
        });
        self.trip_ids.insert(trip_id.to_string(), idx);
        Ok(idx)
    }

    /// Like [`add_trip`](Self::add_trip), taking `(arrival, departure)`
    /// clock strings and deriving the day rollovers.
    pub fn add_trip_from_clock(
        &mut self,
        route_id: &str,
        trip_id: &str,
        service_dates: &[NaiveDate],
        times: &[(&str, &str)],
    ) -> Result<TripIdx, DomainError> {
        let clocks = times
            .iter()
            .map(|(arr, dep)| Ok::<_, DomainError>((parse_clock(arr)?, parse_clock(dep)?)))
            .collect::<Result<Vec<(NaiveTime, NaiveTime)>, _>>()?;
        self.add_trip(route_id, trip_id, service_dates, stop_times_from_clock(&clocks))
    }

    /// Add a symmetric pair of walking transfers between two stops.
    pub fn add_transfer_pair(
        &mut self,
        from_id: &str,
        to_id: &str,
        distance: u32,
    ) -> Result<(TransferIdx, TransferIdx), DomainError> {
        let from = self
            .model
            .stop_by_id(from_id)
            .ok_or_else(|| DomainError::UnknownStop(from_id.to_string()))?;
        let to = self
            .model
            .stop_by_id(to_id)
            .ok_or_else(|| DomainError::UnknownStop(to_id.to_string()))?;
        Ok(self.push_transfer_pair(from, to, distance))
    }

    fn push_transfer_pair(&mut self, a: StopIdx, b: StopIdx, distance: u32) -> (TransferIdx, TransferIdx) {
        let there = TransferIdx(self.model.transfers.len());
        let back = TransferIdx(there.index() + 1);
        self.model.transfers.push(Transfer {
            from: a,
            to: b,
            distance,
            opposite: Some(back),
        });
        self.model.transfers.push(Transfer {
            from: b,
            to: a,
            distance,
            opposite: Some(there),
        });
        self.model.stops[a.index()].transfers.push(there);
        self.model.stops[b.index()].transfers.push(back);
        (there, back)
    }

    /// Forbid generated transfers from crossing the segment `a`-`b`.
    pub fn forbid_crossing(&mut self, a: Coordinates, b: Coordinates) {
        self.forbidden_crossings.push(ForbiddenCrossing { a, b });
    }

    /// Generate walking transfer pairs between every two stops closer than
    /// `max_distance`. Stops at the same spot are only connected when they
    /// are the city and regional halves of one split stop (ids `X` and `XP`).
    /// Returns the number of pairs added.
    pub fn connect_nearby_stops(&mut self, max_distance: u32) -> usize {
        let mut pairs = Vec::new();
        let stops = &self.model.stops;
        for (i, a) in stops.iter().enumerate() {
            for (j, b) in stops.iter().enumerate().skip(i + 1) {
                if a.coords.too_far_in_one_direction(&b.coords, max_distance) {
                    continue;
                }
                let distance = a.coords.simplified_distance_to(&b.coords);
                if distance >= max_distance {
                    continue;
                }
                if distance == 0 && !is_split_stop(&a.id, &b.id) {
                    continue;
                }
                if self
                    .forbidden_crossings
                    .iter()
                    .any(|line| line.blocks(&a.coords, &b.coords))
                {
                    continue;
                }
                pairs.push((StopIdx(i), StopIdx(j), distance));
            }
        }

        let added = pairs.len();
        for (a, b, distance) in pairs {
            self.push_transfer_pair(a, b, distance);
        }
        added
    }

    /// Finish: order every date's trips by first departure.
    pub fn build(mut self) -> TransitModel {
        let trips = &self.model.trips;
        for route in &mut self.model.routes {
            for day in route.trips_by_date.values_mut() {
                day.sort_by_key(|t| trips[t.index()].first_departure_secs());
            }
        }
        self.model
    }
}

fn is_split_stop(a: &str, b: &str) -> bool {
    a.strip_suffix('P') == Some(b) || b.strip_suffix('P') == Some(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn builder() -> NetworkBuilder {
        let mut b = NetworkBuilder::new();
        b.add_stop("A", "Alpha", Coordinates::new(50.0, 14.0)).unwrap();
        b.add_stop("B", "Beta", Coordinates::new(50.001, 14.0)).unwrap();
        b.add_stop("C", "Gamma", Coordinates::new(50.1, 14.0)).unwrap();
        b
    }

    #[test]
    fn rejects_duplicates_and_unknown_references() {
        let mut b = builder();
        assert_eq!(
            b.add_stop("A", "Again", Coordinates::new(50.0, 14.0)),
            Err(DomainError::DuplicateId("A".into()))
        );
        assert_eq!(
            b.add_stop("X", "Bad", Coordinates::new(95.0, 14.0)),
            Err(DomainError::InvalidCoordinates { lat: 95.0, lon: 14.0 })
        );
        assert_eq!(
            b.add_route("R", "1", VehicleType::Bus, &["A", "Z"]),
            Err(DomainError::UnknownStop("Z".into()))
        );
        assert_eq!(
            b.add_route("R", "1", VehicleType::Bus, &["A"]),
            Err(DomainError::RouteTooShort("R".into()))
        );
        assert!(matches!(
            b.add_trip_from_clock("nope", "T", &[date()], &[]),
            Err(DomainError::UnknownRoute(_))
        ));
    }

    #[test]
    fn trip_must_match_pattern_length() {
        let mut b = builder();
        b.add_route("R", "1", VehicleType::Bus, &["A", "B"]).unwrap();
        let err = b
            .add_trip_from_clock("R", "T", &[date()], &[("08:00", "08:00")])
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::StopCountMismatch {
                trip: "T".into(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn routes_are_linked_from_stops() {
        let mut b = builder();
        let r = b.add_route("R", "1", VehicleType::Bus, &["A", "B", "A"]).unwrap();
        let model = b.build();
        let a = model.stop_by_id("A").unwrap();
        assert_eq!(model.stop(a).routes, vec![r]);
    }

    #[test]
    fn trips_sorted_by_first_departure() {
        let mut b = builder();
        b.add_route("R", "1", VehicleType::Bus, &["A", "B"]).unwrap();
        b.add_trip_from_clock("R", "late", &[date()], &[("09:00", "09:00"), ("09:05", "09:05")])
            .unwrap();
        b.add_trip_from_clock("R", "early", &[date()], &[("08:00", "08:00"), ("08:05", "08:05")])
            .unwrap();
        let model = b.build();
        let ids: Vec<_> = model.routes()[0]
            .trips_on(date())
            .iter()
            .map(|t| model.trip(*t).id.as_str())
            .collect();
        assert_eq!(ids, ["early", "late"]);
    }

    #[test]
    fn nearby_stops_get_symmetric_transfers() {
        let mut b = builder();
        assert_eq!(b.connect_nearby_stops(MAX_TRANSFER_DISTANCE), 1);
        let model = b.build();

        let a = model.stop_by_id("A").unwrap();
        let there = model.transfer(model.stop(a).transfers[0]);
        assert_eq!(model.stop(there.to).id, "B");
        assert_eq!(there.distance, 111);

        let back = model.transfer(there.opposite.unwrap());
        assert_eq!((back.from, back.to), (there.to, there.from));
        assert_eq!(back.opposite, Some(model.stop(a).transfers[0]));
    }

    #[test]
    fn same_spot_only_for_split_stops() {
        let mut b = NetworkBuilder::new();
        let here = Coordinates::new(50.0, 14.0);
        b.add_stop("U1", "X", here).unwrap();
        b.add_stop("U2", "X", here).unwrap();
        b.add_stop("U1P", "X", here).unwrap();
        assert_eq!(b.connect_nearby_stops(MAX_TRANSFER_DISTANCE), 1);
        let model = b.build();
        let t = &model.transfers()[0];
        assert_eq!((model.stop(t.from).id.as_str(), t.distance), ("U1", 0));
        assert_eq!(model.stop(t.to).id, "U1P");
    }

    #[test]
    fn forbidden_crossing_blocks_transfer() {
        let mut b = builder();
        // east-west line between A and B
        b.forbid_crossing(Coordinates::new(50.0005, 13.99), Coordinates::new(50.0005, 14.01));
        assert_eq!(b.connect_nearby_stops(MAX_TRANSFER_DISTANCE), 0);
    }
}
