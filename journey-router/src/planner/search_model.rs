//! Per-search state.
//!
//! A dense table indexed by (route point, round) records the reach time and
//! how the point was reached in that round. A separate row keeps the best
//! reach time over all rounds, which is what improvements are judged
//! against. Stops occupy the first slots, bike stations the next ones, and
//! the two coordinate endpoints the last two.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use super::comparator::TimeComparator;
use super::endpoint::Endpoint;
use super::settings::Settings;
use crate::bikes::BikeModel;
use crate::domain::{
    BikeStationIdx, BikeTransferIdx, CustomPoint, RoutePoint, StopIdx, TransferIdx, TripIdx,
    shift,
};
use crate::network::TransitModel;

/// A walk between a coordinate endpoint and a stop or station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomTransfer {
    pub point: CustomPoint,
    pub other: RoutePoint,
    pub distance: u32,
}

impl CustomTransfer {
    pub fn source(&self) -> RoutePoint {
        match self.point {
            CustomPoint::Source => RoutePoint::Custom(CustomPoint::Source),
            CustomPoint::Destination => self.other,
        }
    }

    pub fn target(&self) -> RoutePoint {
        match self.point {
            CustomPoint::Source => self.other,
            CustomPoint::Destination => RoutePoint::Custom(CustomPoint::Destination),
        }
    }
}

/// Any walking transfer a point can be reached by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferRef {
    Stop(TransferIdx),
    Bike(BikeTransferIdx),
    Custom(CustomTransfer),
}

impl TransferRef {
    /// Source and target in travel order.
    pub fn ends(&self, network: &TransitModel, bikes: &BikeModel) -> (RoutePoint, RoutePoint) {
        match self {
            TransferRef::Stop(idx) => {
                let t = network.transfer(*idx);
                (RoutePoint::Stop(t.from), RoutePoint::Stop(t.to))
            }
            TransferRef::Bike(idx) => {
                let t = bikes.transfer(*idx);
                (t.source(), t.target())
            }
            TransferRef::Custom(t) => (t.source(), t.target()),
        }
    }

    /// The end a search in the given direction came from.
    pub fn search_from(&self, network: &TransitModel, bikes: &BikeModel, forward: bool) -> RoutePoint {
        let (source, target) = self.ends(network, bikes);
        if forward { source } else { target }
    }

    pub fn distance(&self, network: &TransitModel, bikes: &BikeModel) -> u32 {
        match self {
            TransferRef::Stop(idx) => network.transfer(*idx).distance,
            TransferRef::Bike(idx) => bikes.transfer(*idx).distance,
            TransferRef::Custom(t) => t.distance,
        }
    }
}

/// How a route point was reached in one round.
///
/// Stop and station pairs are in search order: `boarded_at`/`from` is where
/// the search came from, which is the alighting side in a backward search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reach {
    #[default]
    Unvisited,
    ImplicitStart,
    ByTrip {
        trip: TripIdx,
        date: NaiveDate,
        boarded_at: StopIdx,
        board_index: usize,
        reach_index: usize,
    },
    ByTransfer(TransferRef),
    ByBikeTrip {
        from: BikeStationIdx,
        to: BikeStationIdx,
    },
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    time: NaiveDateTime,
    reach: Reach,
}

/// Reach times of one search. Created per request, never shared.
#[derive(Debug, Clone)]
pub struct SearchModel {
    cmp: TimeComparator,
    begin: NaiveDateTime,
    /// Nothing later (forward) / earlier (backward) than this is accepted.
    horizon: NaiveDateTime,
    rounds: usize,
    stop_count: usize,
    station_count: usize,
    table: Vec<Entry>,
    best: Vec<NaiveDateTime>,
    begin_side: Endpoint,
    end_side: Endpoint,
    /// Signed walking seconds from each end point to a coordinate end.
    end_walks: HashMap<RoutePoint, i64>,
    best_end: NaiveDateTime,
}

impl SearchModel {
    /// An empty model. `begin_side` and `end_side` are in search order: a
    /// backward search begins at the destination.
    pub fn new(
        forward: bool,
        begin: NaiveDateTime,
        settings: &Settings,
        stop_count: usize,
        station_count: usize,
        begin_side: Endpoint,
        end_side: Endpoint,
    ) -> Self {
        let cmp = TimeComparator::new(forward);
        let days = Duration::days(i64::from(settings.max_trip_days));
        let horizon = if forward {
            begin.checked_add_signed(days).unwrap_or(NaiveDateTime::MAX)
        } else {
            begin.checked_sub_signed(days).unwrap_or(NaiveDateTime::MIN)
        };
        let mpl = if forward { 1 } else { -1 };
        let end_walks = match &end_side {
            Endpoint::Stops(_) => HashMap::new(),
            Endpoint::Coordinates { access, .. } => access
                .iter()
                .map(|&(p, d)| (p, mpl * settings.adjusted_walking_time(d)))
                .collect(),
        };

        let slots = stop_count + station_count + 2;
        let rounds = settings.rounds;
        Self {
            cmp,
            begin,
            horizon,
            rounds,
            stop_count,
            station_count,
            table: vec![
                Entry {
                    time: cmp.worst(),
                    reach: Reach::Unvisited,
                };
                slots * (rounds + 1)
            ],
            best: vec![cmp.worst(); slots],
            begin_side,
            end_side,
            end_walks,
            best_end: cmp.worst(),
        }
    }

    fn slot(&self, point: RoutePoint) -> usize {
        match point {
            RoutePoint::Stop(s) => s.index(),
            RoutePoint::BikeStation(b) => self.stop_count + b.index(),
            RoutePoint::Custom(CustomPoint::Source) => self.stop_count + self.station_count,
            RoutePoint::Custom(CustomPoint::Destination) => {
                self.stop_count + self.station_count + 1
            }
        }
    }

    fn cell(&self, point: RoutePoint, round: usize) -> usize {
        self.slot(point) * (self.rounds + 1) + round
    }

    pub fn forward(&self) -> bool {
        self.cmp == TimeComparator::new(true)
    }

    pub fn comparator(&self) -> TimeComparator {
        self.cmp
    }

    /// Number of rounds after round 0.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn begin_time(&self) -> NaiveDateTime {
        self.begin
    }

    pub fn begin_side(&self) -> &Endpoint {
        &self.begin_side
    }

    pub fn end_side(&self) -> &Endpoint {
        &self.end_side
    }

    /// Best reach time over all rounds; the sentinel when never reached.
    pub fn best(&self, point: RoutePoint) -> NaiveDateTime {
        self.best[self.slot(point)]
    }

    pub fn reach_time(&self, point: RoutePoint, round: usize) -> NaiveDateTime {
        self.table[self.cell(point, round)].time
    }

    pub fn reach(&self, point: RoutePoint, round: usize) -> Reach {
        self.table[self.cell(point, round)].reach
    }

    pub fn is_reached(&self, point: RoutePoint, round: usize) -> bool {
        !matches!(self.reach(point, round), Reach::Unvisited)
    }

    pub fn is_reached_by_trip(&self, point: RoutePoint, round: usize) -> bool {
        matches!(self.reach(point, round), Reach::ByTrip { .. })
    }

    pub fn is_reached_by_bike(&self, point: RoutePoint, round: usize) -> bool {
        matches!(self.reach(point, round), Reach::ByBikeTrip { .. })
    }

    pub fn is_reached_by_transfer(&self, point: RoutePoint, round: usize) -> bool {
        matches!(self.reach(point, round), Reach::ByTransfer(_))
    }

    /// Best reach time of the search end so far, including the final walk
    /// to a coordinate end.
    pub fn best_search_end(&self) -> NaiveDateTime {
        self.best_end
    }

    /// Signed walking seconds from `point` to a coordinate end.
    pub fn end_walk(&self, point: RoutePoint) -> Option<i64> {
        self.end_walks.get(&point).copied()
    }

    /// Reach time at the search end via `point` in `round`: the point's own
    /// reach time, plus the final walk when the end is a coordinate point.
    pub fn end_time_via(&self, point: RoutePoint, round: usize) -> NaiveDateTime {
        let time = self.reach_time(point, round);
        if time == self.cmp.worst() {
            return time;
        }
        match self.end_walk(point) {
            Some(walk) => shift(time, walk),
            None => time,
        }
    }

    /// Seed round 0 with the search begin instant.
    pub fn set_begin(&mut self, point: RoutePoint) {
        let cell = self.cell(point, 0);
        self.table[cell] = Entry {
            time: self.begin,
            reach: Reach::ImplicitStart,
        };
        let slot = self.slot(point);
        self.best[slot] = self.begin;
        self.record_end(point, self.begin);
    }

    /// Record `point` as reached by a vehicle (trip or bike) at `time`.
    ///
    /// The candidate must beat the point's best time and the best search end
    /// so far, and must not lie beyond the trip-length horizon.
    pub fn try_improve_by_vehicle(
        &mut self,
        point: RoutePoint,
        time: NaiveDateTime,
        round: usize,
        reach: Reach,
    ) -> bool {
        let improves = self.cmp.improves(time, self.best(point))
            && self.cmp.improves(time, self.best_end)
            && self.cmp.improves_or_equals(time, self.horizon);
        if improves {
            self.commit(point, time, round, reach);
        }
        improves
    }

    /// Record `point` as reached by a walk at `time` if that beats its best.
    pub fn try_improve_by_transfer(
        &mut self,
        point: RoutePoint,
        time: NaiveDateTime,
        round: usize,
        transfer: TransferRef,
    ) -> bool {
        let improves = self.cmp.improves(time, self.best(point));
        if improves {
            self.commit(point, time, round, Reach::ByTransfer(transfer));
        }
        improves
    }

    fn commit(&mut self, point: RoutePoint, time: NaiveDateTime, round: usize, reach: Reach) {
        let cell = self.cell(point, round);
        self.table[cell] = Entry { time, reach };
        let slot = self.slot(point);
        self.best[slot] = time;
        self.record_end(point, time);
    }

    fn record_end(&mut self, point: RoutePoint, time: NaiveDateTime) {
        let end_time = if self.end_side.custom_point().is_some() {
            match self.end_walk(point) {
                Some(walk) => shift(time, walk),
                None => return,
            }
        } else if self.end_side.contains(point) {
            time
        } else {
            return;
        };
        if self.cmp.improves(end_time, self.best_end) {
            self.best_end = end_time;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Coordinates;

    fn at(hh: u32, mm: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(hh, mm, 0)
            .unwrap()
    }

    fn trip_reach() -> Reach {
        Reach::ByTrip {
            trip: TripIdx(0),
            date: at(0, 0).date(),
            boarded_at: StopIdx(0),
            board_index: 0,
            reach_index: 1,
        }
    }

    fn model(forward: bool) -> SearchModel {
        SearchModel::new(
            forward,
            at(8, 0),
            &Settings::default(),
            3,
            1,
            Endpoint::Stops(vec![StopIdx(0)]),
            Endpoint::Stops(vec![StopIdx(2)]),
        )
    }

    #[test]
    fn unvisited_points_return_sentinel() {
        let m = model(true);
        let p = RoutePoint::Stop(StopIdx(1));
        assert_eq!(m.best(p), NaiveDateTime::MAX);
        assert_eq!(m.reach_time(p, 3), NaiveDateTime::MAX);
        assert!(!m.is_reached(p, 0));
        assert_eq!(model(false).best(p), NaiveDateTime::MIN);
    }

    #[test]
    fn begin_seeds_round_zero() {
        let mut m = model(true);
        let p = RoutePoint::Stop(StopIdx(0));
        m.set_begin(p);
        assert_eq!(m.reach(p, 0), Reach::ImplicitStart);
        assert_eq!(m.best(p), at(8, 0));
        assert!(!m.is_reached(p, 1));
    }

    #[test]
    fn trip_improvement_requires_strict_gain() {
        let mut m = model(true);
        let p = RoutePoint::Stop(StopIdx(1));
        assert!(m.try_improve_by_vehicle(p, at(8, 30), 1, trip_reach()));
        assert!(!m.try_improve_by_vehicle(p, at(8, 30), 2, trip_reach()));
        assert!(m.is_reached_by_trip(p, 1));
        assert!(!m.is_reached(p, 2));
        assert!(m.try_improve_by_vehicle(p, at(8, 20), 2, trip_reach()));
        assert_eq!(m.best(p), at(8, 20));
        // earlier rounds keep their own value
        assert_eq!(m.reach_time(p, 1), at(8, 30));
    }

    #[test]
    fn search_end_prunes_later_reaches() {
        let mut m = model(true);
        let end = RoutePoint::Stop(StopIdx(2));
        assert!(m.try_improve_by_vehicle(end, at(9, 0), 1, trip_reach()));
        assert_eq!(m.best_search_end(), at(9, 0));

        let other = RoutePoint::Stop(StopIdx(1));
        assert!(!m.try_improve_by_vehicle(other, at(9, 5), 1, trip_reach()));
        assert!(m.try_improve_by_vehicle(other, at(8, 55), 1, trip_reach()));
    }

    #[test]
    fn horizon_bounds_reaches() {
        let mut m = model(true);
        let p = RoutePoint::Stop(StopIdx(1));
        let next_day = at(8, 0) + Duration::days(1);
        assert!(!m.try_improve_by_vehicle(p, next_day + Duration::seconds(1), 1, trip_reach()));
        assert!(m.try_improve_by_vehicle(p, next_day, 1, trip_reach()));
    }

    #[test]
    fn backward_prefers_later_times() {
        let mut m = model(false);
        let p = RoutePoint::Stop(StopIdx(1));
        assert!(m.try_improve_by_vehicle(p, at(7, 0), 1, trip_reach()));
        assert!(!m.try_improve_by_vehicle(p, at(6, 0), 2, trip_reach()));
        assert!(m.try_improve_by_vehicle(p, at(7, 30), 2, trip_reach()));
    }

    #[test]
    fn transfers_only_need_to_beat_the_best() {
        let mut m = model(true);
        let end = RoutePoint::Stop(StopIdx(2));
        m.try_improve_by_vehicle(end, at(9, 0), 1, trip_reach());
        let p = RoutePoint::Stop(StopIdx(1));
        assert!(m.try_improve_by_transfer(p, at(9, 10), 1, TransferRef::Stop(TransferIdx(0))));
        assert!(m.is_reached_by_transfer(p, 1));
    }

    #[test]
    fn coordinate_end_adds_final_walk() {
        let end = Endpoint::Coordinates {
            point: CustomPoint::Destination,
            coords: Coordinates::new(50.0, 14.0),
            access: vec![(RoutePoint::Stop(StopIdx(2)), 100)],
        };
        let mut m = SearchModel::new(
            true,
            at(8, 0),
            &Settings::default(),
            3,
            0,
            Endpoint::Stops(vec![StopIdx(0)]),
            end,
        );
        let p = RoutePoint::Stop(StopIdx(2));
        assert!(m.try_improve_by_vehicle(p, at(9, 0), 1, trip_reach()));
        // 100 m at 12 min/km with the normal buffer: 90 s
        assert_eq!(m.best_search_end(), at(9, 1) + Duration::seconds(30));
        assert_eq!(m.end_time_via(p, 1), m.best_search_end());
    }
}
