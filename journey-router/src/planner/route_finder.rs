//! The round-based search loop.
//!
//! Each round boards the best trip on every route touched by a point marked
//! in the previous round, rides it, rents bikes at marked stations, then
//! relaxes walking transfers from everything the round improved. Round `k`
//! therefore finds journeys with at most `k` vehicle legs.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::trace;

use super::comparator::{IndexComparator, TimeComparator};
use super::endpoint::Endpoint;
use super::search_model::{CustomTransfer, Reach, SearchModel, TransferRef};
use super::settings::Settings;
use crate::bikes::BikeModel;
use crate::delay::{DelayModel, TripStopDelays};
use crate::domain::{BikeStationIdx, RouteIdx, RoutePoint, StopIdx, TripIdx, shift};
use crate::network::TransitModel;
use crate::snapshot::Snapshot;

/// Everything a search reads.
#[derive(Debug, Clone, Copy)]
pub struct SearchContext<'a> {
    pub network: &'a TransitModel,
    pub bikes: &'a BikeModel,
    pub delays: &'a DelayModel,
    pub settings: &'a Settings,
}

impl<'a> SearchContext<'a> {
    pub fn new(snapshot: &'a Snapshot, settings: &'a Settings) -> Self {
        Self {
            network: &snapshot.network,
            bikes: &snapshot.bikes,
            delays: &snapshot.delays,
            settings,
        }
    }

    pub(crate) fn point_name(&self, point: RoutePoint) -> &str {
        match point {
            RoutePoint::Stop(s) => &self.network.stop(s).name,
            RoutePoint::BikeStation(b) => &self.bikes.station(b).name,
            RoutePoint::Custom(c) => c.name(),
        }
    }

    /// Time to walk `distance` meters towards `to_station` or a stop.
    ///
    /// Walks to a bike station are plain buffered walking; walks between
    /// stops respect the stationary minimum.
    pub(crate) fn transfer_seconds(&self, distance: u32, to_station: bool) -> i64 {
        if to_station && distance > 0 {
            self.settings.adjusted_walking_time(distance)
        } else {
            self.settings.stop_transfer_time(distance)
        }
    }
}

/// The trip a route will be ridden on this round.
#[derive(Debug, Clone, Copy)]
struct ReachedTrip {
    trip: TripIdx,
    date: NaiveDate,
    stop: StopIdx,
    stop_index: usize,
}

/// Runs one search over a [`SearchModel`].
pub struct RouteFinder<'a> {
    ctx: SearchContext<'a>,
    forward: bool,
    mpl: i64,
    cmp: TimeComparator,
    index_cmp: IndexComparator,
    use_bikes: bool,
    /// Transfers may not reach end points when the search ends at a
    /// coordinate point; the final walk is added during extraction.
    end_points_closed: bool,
    model: SearchModel,
    round: usize,
    marked_stops: BTreeSet<StopIdx>,
    marked_stations: BTreeSet<BikeStationIdx>,
    marked_routes: BTreeMap<RouteIdx, ReachedTrip>,
    /// Points whose walks improved another point in the current transfer
    /// pass; their entries for this round are frozen.
    transfer_sources: BTreeSet<RoutePoint>,
}

impl<'a> RouteFinder<'a> {
    /// Run a full search and return the converged model.
    ///
    /// `source` and `destination` are in travel order; a backward search
    /// starts from `destination` at `time` and works towards `source`.
    pub fn run(
        ctx: SearchContext<'a>,
        forward: bool,
        time: NaiveDateTime,
        source: &Endpoint,
        destination: &Endpoint,
    ) -> SearchModel {
        let (begin_side, end_side) = if forward {
            (source.clone(), destination.clone())
        } else {
            (destination.clone(), source.clone())
        };
        let end_points_closed = end_side.custom_point().is_some();
        let model = SearchModel::new(
            forward,
            time,
            ctx.settings,
            ctx.network.stop_count(),
            ctx.bikes.station_count(),
            begin_side,
            end_side,
        );

        let mut finder = RouteFinder {
            ctx,
            forward,
            mpl: if forward { 1 } else { -1 },
            cmp: TimeComparator::new(forward),
            index_cmp: IndexComparator::new(forward),
            use_bikes: ctx.settings.use_shared_bikes,
            end_points_closed,
            model,
            round: 0,
            marked_stops: BTreeSet::new(),
            marked_stations: BTreeSet::new(),
            marked_routes: BTreeMap::new(),
            transfer_sources: BTreeSet::new(),
        };

        finder.initiate();
        for round in 1..=ctx.settings.rounds {
            finder.round = round;
            finder.accumulate_routes();
            finder.traverse_marked_routes();
            if finder.use_bikes {
                finder.traverse_bike_routes();
            }
            finder.improve_by_transfers(false);
            trace!(
                round,
                marked_stops = finder.marked_stops.len(),
                marked_stations = finder.marked_stations.len(),
                "round complete"
            );
        }

        finder.marked_stops.clear();
        finder.marked_stations.clear();
        finder.marked_routes.clear();
        finder.model
    }

    fn initiate(&mut self) {
        match self.model.begin_side().clone() {
            Endpoint::Stops(stops) => {
                for stop in stops {
                    self.model.set_begin(RoutePoint::Stop(stop));
                    self.marked_stops.insert(stop);
                }
                self.improve_by_transfers(true);
            }
            Endpoint::Coordinates { point, access, .. } => {
                let max = self.ctx.settings.max_transfer_distance();
                for (other, distance) in access {
                    if distance > max {
                        continue;
                    }
                    if other.as_bike_station().is_some() && !self.use_bikes {
                        continue;
                    }
                    let walk = self.ctx.settings.adjusted_walking_time(distance);
                    let time = shift(self.model.begin_time(), self.mpl * walk);
                    let transfer = TransferRef::Custom(CustomTransfer {
                        point,
                        other,
                        distance,
                    });
                    if self.model.try_improve_by_transfer(other, time, 0, transfer) {
                        match other {
                            RoutePoint::Stop(s) => {
                                self.marked_stops.insert(s);
                            }
                            RoutePoint::BikeStation(b) => {
                                self.marked_stations.insert(b);
                            }
                            RoutePoint::Custom(_) => {}
                        }
                    }
                }
            }
        }
        trace!(
            marked_stops = self.marked_stops.len(),
            marked_stations = self.marked_stations.len(),
            "search initiated"
        );
    }

    /// Reach time at `stop` in the previous round, buffered for a change of
    /// vehicle when the stop was itself reached by a trip.
    fn boarding_time(&self, stop: StopIdx, apply_buffer: bool) -> NaiveDateTime {
        let point = RoutePoint::Stop(stop);
        let previous = self.round - 1;
        let time = self.model.reach_time(point, previous);
        if apply_buffer && self.model.is_reached_by_trip(point, previous) {
            shift(time, self.mpl * self.ctx.settings.stationary_transfer_seconds())
        } else {
            time
        }
    }

    fn find_trip(&self, route: RouteIdx, stop_index: usize, reach: NaiveDateTime) -> Option<(TripIdx, NaiveDate)> {
        self.ctx.network.route(route).first_transferable_trip(
            self.ctx.network.trips(),
            stop_index,
            reach,
            self.forward,
            self.ctx.delays,
            self.ctx.settings.max_trip_days,
        )
    }

    fn accumulate_routes(&mut self) {
        let network = self.ctx.network;
        self.marked_routes.clear();
        let marked = std::mem::take(&mut self.marked_stops);
        for stop in marked {
            if !self.model.is_reached(RoutePoint::Stop(stop), self.round - 1) {
                continue;
            }
            let reach = self.boarding_time(stop, self.round > 1);
            for &route in &network.stop(stop).routes {
                let Ok(stop_index) = network.route(route).stop_index(stop, self.forward) else {
                    continue;
                };
                if let Some(existing) = self.marked_routes.get(&route) {
                    if !self
                        .index_cmp
                        .precedes_in_search_direction(stop_index, existing.stop_index)
                    {
                        continue;
                    }
                }
                if let Some((trip, date)) = self.find_trip(route, stop_index, reach) {
                    self.marked_routes.insert(
                        route,
                        ReachedTrip {
                            trip,
                            date,
                            stop,
                            stop_index,
                        },
                    );
                }
            }
        }
        trace!(
            round = self.round,
            routes = self.marked_routes.len(),
            "routes accumulated"
        );
    }

    fn trip_delays(&self, trip: TripIdx, date: NaiveDate) -> Option<&'a TripStopDelays> {
        let delays: &'a DelayModel = self.ctx.delays;
        delays.trip_delays(date, &self.ctx.network.trip(trip).id)
    }

    fn traverse_marked_routes(&mut self) {
        for (route, reached) in std::mem::take(&mut self.marked_routes) {
            self.traverse_route(route, reached);
        }
    }

    fn traverse_route(&mut self, route_idx: RouteIdx, reached: ReachedTrip) {
        let network = self.ctx.network;
        let route = network.route(route_idx);
        let stop_count = route.stops.len();

        let mut trip_idx = reached.trip;
        let mut date = reached.date;
        let mut traverse_from = reached.stop;
        let mut board_index = reached.stop_index;
        let mut delays = self.trip_delays(trip_idx, date);

        let indices: Box<dyn Iterator<Item = usize>> = if self.forward {
            Box::new(reached.stop_index..stop_count)
        } else {
            Box::new((0..=reached.stop_index).rev())
        };

        for i in indices {
            let stop = route.stops[i];
            let point = RoutePoint::Stop(stop);
            let trip = network.trip(trip_idx);
            let delay = delays.and_then(|d| d.stop_delay(i)).unwrap_or_default();
            let arrival = shift(trip.arrival_at(i, date), delay.arrival);
            let departure = shift(trip.departure_at(i, date), delay.departure);
            let (reach_time, leave_time) = if self.forward {
                (arrival, departure)
            } else {
                (departure, arrival)
            };

            if i != board_index {
                let reach = Reach::ByTrip {
                    trip: trip_idx,
                    date,
                    boarded_at: traverse_from,
                    board_index,
                    reach_index: i,
                };
                if self.model.try_improve_by_vehicle(point, reach_time, self.round, reach) {
                    self.marked_stops.insert(stop);
                }
            }

            // A better trip may be catchable here from the previous round.
            let previous = self.model.reach_time(point, self.round - 1);
            if !self.cmp.improves(previous, leave_time) {
                continue;
            }
            let buffered = self.boarding_time(stop, self.round != 1);
            if !self.cmp.improves(buffered, leave_time) {
                continue;
            }
            let Some((new_trip, new_date)) = self.find_trip(route_idx, i, buffered) else {
                continue;
            };
            let better_boarding = self
                .cmp
                .improves(self.model.best(point), self.model.best(RoutePoint::Stop(traverse_from)));
            if new_trip != trip_idx || new_date != date || better_boarding {
                trip_idx = new_trip;
                date = new_date;
                traverse_from = stop;
                board_index = i;
                delays = self.trip_delays(trip_idx, date);
            }
        }
    }

    fn traverse_bike_routes(&mut self) {
        let bikes = self.ctx.bikes;
        let settings = self.ctx.settings;
        let previous = self.round - 1;
        let mut improved = BTreeSet::new();

        for &marked in &self.marked_stations {
            let marked_point = RoutePoint::BikeStation(marked);
            if self.forward && !bikes.station(marked).has_bikes() {
                continue;
            }
            if self.model.is_reached_by_bike(marked_point, previous)
                || !self.model.is_reached(marked_point, previous)
            {
                continue;
            }
            let start = self.model.reach_time(marked_point, previous);

            for &(target, distance) in bikes.distances_from(marked) {
                let Ok(distance) = u32::try_from(distance) else {
                    continue;
                };
                if settings.bike_trip_exceeds_cap(distance) {
                    continue;
                }
                if !self.forward && !bikes.station(target).has_bikes() {
                    continue;
                }
                let time = shift(start, self.mpl * settings.adjusted_bike_trip_time(distance));
                let reach = Reach::ByBikeTrip { from: marked, to: target };
                if self
                    .model
                    .try_improve_by_vehicle(RoutePoint::BikeStation(target), time, self.round, reach)
                {
                    improved.insert(target);
                }
            }
        }
        trace!(round = self.round, stations = improved.len(), "bike trips relaxed");
        self.marked_stations = improved;
    }

    /// Relax walking transfers from every marked point.
    ///
    /// Stops are processed best-first so that chains of same-place transfers
    /// settle in a single pass.
    fn improve_by_transfers(&mut self, only_from_stops: bool) {
        let network = self.ctx.network;
        let bikes = self.ctx.bikes;
        let round = self.round;
        let close_end = self.end_points_closed && !only_from_stops;
        let mut new_stops = BTreeSet::new();
        let mut new_stations = BTreeSet::new();
        self.transfer_sources.clear();

        let mut ordered: Vec<StopIdx> = self.marked_stops.iter().copied().collect();
        ordered.sort_by_key(|&s| self.model.reach_time(RoutePoint::Stop(s), round));
        if !self.forward {
            ordered.reverse();
        }

        for stop in ordered {
            for &t in &network.stop(stop).transfers {
                let real = if self.forward {
                    Some(t)
                } else {
                    network.transfer(t).opposite
                };
                let Some(real) = real else { continue };
                if self.try_transfer(TransferRef::Stop(real), false, close_end) {
                    new_stops.insert(network.transfer(t).to);
                }
            }
            if self.use_bikes {
                for &t in bikes.transfers_from_stop(stop) {
                    let real = if self.forward { Some(t) } else { bikes.transfer(t).opposite };
                    let Some(real) = real else { continue };
                    if self.try_transfer(TransferRef::Bike(real), true, close_end) {
                        new_stations.insert(bikes.transfer(t).station);
                    }
                }
            }
        }

        if self.use_bikes && !only_from_stops {
            let stations: Vec<BikeStationIdx> = self.marked_stations.iter().copied().collect();
            for station in stations {
                for &t in &bikes.station(station).transfers {
                    let real = if self.forward { Some(t) } else { bikes.transfer(t).opposite };
                    let Some(real) = real else { continue };
                    if self.try_transfer(TransferRef::Bike(real), false, close_end) {
                        new_stops.insert(bikes.transfer(t).stop);
                    }
                }
            }
        }

        self.marked_stops.extend(new_stops);
        if self.use_bikes {
            self.marked_stations.extend(new_stations);
        }
    }

    /// Try to improve the search-direction target of `transfer` in the
    /// current round.
    fn try_transfer(&mut self, transfer: TransferRef, to_station: bool, close_end: bool) -> bool {
        let (source, target) = transfer.ends(self.ctx.network, self.ctx.bikes);
        let (from, to) = if self.forward { (source, target) } else { (target, source) };
        let distance = transfer.distance(self.ctx.network, self.ctx.bikes);

        let usable = distance <= self.ctx.settings.max_transfer_distance()
            || self.ctx.point_name(source) == self.ctx.point_name(target);
        if !usable {
            return false;
        }
        if close_end && self.model.end_side().contains(to) {
            return false;
        }
        if self.model.is_reached_by_transfer(from, self.round) || !self.model.is_reached(from, self.round) {
            return false;
        }
        // Overwriting a point that already fed a walk would orphan that walk.
        if self.transfer_sources.contains(&to) {
            return false;
        }

        let seconds = self.ctx.transfer_seconds(distance, to_station);
        let time = shift(self.model.reach_time(from, self.round), self.mpl * seconds);
        let improved = self.model.try_improve_by_transfer(to, time, self.round, transfer);
        if improved {
            self.transfer_sources.insert(from);
        }
        improved
    }
}
