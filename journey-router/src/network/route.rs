//! Routes: unique stop patterns and the trips that run them.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::Trip;
use crate::delay::DelayModel;
use crate::domain::{DomainError, StopIdx, TripIdx, shift};

/// Delay data is ignored for departures scheduled this long before the
/// reach time; no plausible delay makes them boardable.
const DELAY_LOOKUP_CUTOFF_SECS: i64 = 2 * 3600;

/// Longest window accepted by [`Route::trip_times_within`].
const MAX_TRIP_TIME_WINDOW_HOURS: i64 = 6;

/// Vehicle serving a route, numbered as in GTFS `route_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleType {
    Tram,
    Metro,
    Rail,
    Bus,
    Ferry,
    CableTram,
    AerialLift,
    Funicular,
    Trolleybus,
    Monorail,
}

impl VehicleType {
    /// Map a GTFS `route_type` code.
    ///
    /// # Examples
    ///
    /// ```
    /// use journey_router::network::VehicleType;
    ///
    /// assert_eq!(VehicleType::from_gtfs(3), Some(VehicleType::Bus));
    /// assert_eq!(VehicleType::from_gtfs(11), Some(VehicleType::Trolleybus));
    /// assert_eq!(VehicleType::from_gtfs(8), None);
    /// ```
    pub fn from_gtfs(code: u16) -> Option<Self> {
        Some(match code {
            0 => Self::Tram,
            1 => Self::Metro,
            2 => Self::Rail,
            3 => Self::Bus,
            4 => Self::Ferry,
            5 => Self::CableTram,
            6 => Self::AerialLift,
            7 => Self::Funicular,
            11 => Self::Trolleybus,
            12 => Self::Monorail,
            _ => return None,
        })
    }

    pub fn gtfs_code(self) -> u16 {
        match self {
            Self::Tram => 0,
            Self::Metro => 1,
            Self::Rail => 2,
            Self::Bus => 3,
            Self::Ferry => 4,
            Self::CableTram => 5,
            Self::AerialLift => 6,
            Self::Funicular => 7,
            Self::Trolleybus => 11,
            Self::Monorail => 12,
        }
    }
}

/// Passenger-facing description of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// Id of the line this pattern belongs to; shared by all patterns of
    /// the line (short turns, depot runs, ...).
    pub line_id: String,
    pub short_name: String,
    pub long_name: String,
    pub vehicle_type: VehicleType,
    /// Hex color without the leading `#`.
    pub color: Option<String>,
}

/// One exact ordered stop pattern of a line.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: String,
    pub info: RouteInfo,
    pub stops: Vec<StopIdx>,
    /// Trips operating on each service date, ordered by first departure.
    pub(crate) trips_by_date: BTreeMap<NaiveDate, Vec<TripIdx>>,
}

impl Route {
    pub fn new(id: impl Into<String>, info: RouteInfo, stops: Vec<StopIdx>) -> Self {
        Self {
            id: id.into(),
            info,
            stops,
            trips_by_date: BTreeMap::new(),
        }
    }

    /// Index of the first occurrence of `stop` in the pattern.
    pub fn first_stop_index(&self, stop: StopIdx) -> Result<usize, DomainError> {
        self.stops
            .iter()
            .position(|&s| s == stop)
            .ok_or_else(|| self.not_on_route(stop))
    }

    /// Index of the last occurrence of `stop` in the pattern.
    pub fn last_stop_index(&self, stop: StopIdx) -> Result<usize, DomainError> {
        self.stops
            .iter()
            .rposition(|&s| s == stop)
            .ok_or_else(|| self.not_on_route(stop))
    }

    /// The occurrence of `stop` a search in the given direction boards at.
    pub fn stop_index(&self, stop: StopIdx, forward: bool) -> Result<usize, DomainError> {
        if forward {
            self.first_stop_index(stop)
        } else {
            self.last_stop_index(stop)
        }
    }

    fn not_on_route(&self, stop: StopIdx) -> DomainError {
        DomainError::StopNotOnRoute {
            stop: stop.to_string(),
            route: self.id.clone(),
        }
    }

    /// Trips running on `date`, ordered by first departure.
    pub fn trips_on(&self, date: NaiveDate) -> &[TripIdx] {
        self.trips_by_date
            .get(&date)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn service_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.trips_by_date.keys().copied()
    }

    /// The first trip that can be caught at the `stop_index`-th stop given the
    /// reach time there.
    ///
    /// Forward: the earliest trip whose delay-adjusted departure is at or after
    /// `reach`. Backward: the latest trip whose delay-adjusted arrival is at or
    /// before `reach`. Service dates are scanned outward from the reach date
    /// (forward also looks at the previous date, for trips that roll past
    /// midnight) up to `horizon_days` away.
    pub fn first_transferable_trip(
        &self,
        trips: &[Trip],
        stop_index: usize,
        reach: NaiveDateTime,
        forward: bool,
        delays: &DelayModel,
        horizon_days: u32,
    ) -> Option<(TripIdx, NaiveDate)> {
        let base = reach.date();
        let horizon = i64::from(horizon_days);

        if forward {
            let dates = std::iter::once(-1).chain(0..=horizon);
            for date in dates.filter_map(|offset| add_days(base, offset)) {
                if let Some(trip) = self.earliest_departing(trips, stop_index, reach, date, delays) {
                    return Some((trip, date));
                }
            }
        } else {
            for date in (0..=horizon).filter_map(|offset| add_days(base, -offset)) {
                if let Some(trip) = self.latest_arriving(trips, stop_index, reach, date, delays) {
                    return Some((trip, date));
                }
            }
        }
        None
    }

    fn earliest_departing(
        &self,
        trips: &[Trip],
        stop_index: usize,
        reach: NaiveDateTime,
        date: NaiveDate,
        delays: &DelayModel,
    ) -> Option<TripIdx> {
        self.trips_on(date).iter().copied().find(|&idx| {
            let trip = &trips[idx.index()];
            let scheduled = trip.departure_at(stop_index, date);
            let actual = if shift(scheduled, DELAY_LOOKUP_CUTOFF_SECS) < reach {
                scheduled
            } else {
                let delay = delays
                    .delay(date, &trip.id, stop_index)
                    .map(|d| d.departure)
                    .unwrap_or_default();
                shift(scheduled, delay)
            };
            actual >= reach
        })
    }

    fn latest_arriving(
        &self,
        trips: &[Trip],
        stop_index: usize,
        reach: NaiveDateTime,
        date: NaiveDate,
        delays: &DelayModel,
    ) -> Option<TripIdx> {
        self.trips_on(date).iter().rev().copied().find(|&idx| {
            let trip = &trips[idx.index()];
            let delay = delays
                .delay(date, &trip.id, stop_index)
                .map(|d| d.arrival)
                .unwrap_or_default();
            shift(trip.arrival_at(stop_index, date), delay) <= reach
        })
    }

    /// The next `count` scheduled departures (forward) or previous `count`
    /// arrivals (backward) at the `stop_index`-th stop, strictly after/before
    /// `at`, with the access walk of `walk_secs` already taken off/added on.
    pub fn first_trip_times(
        &self,
        trips: &[Trip],
        stop_index: usize,
        at: NaiveDateTime,
        walk_secs: i64,
        count: usize,
        forward: bool,
    ) -> Vec<NaiveDateTime> {
        let base = at.date();
        let mut times = Vec::with_capacity(count);

        if forward {
            for date in [-1, 0, 1].into_iter().filter_map(|o| add_days(base, o)) {
                for &idx in self.trips_on(date) {
                    if times.len() >= count {
                        return times;
                    }
                    let t = shift(trips[idx.index()].departure_at(stop_index, date), -walk_secs);
                    if t > at {
                        times.push(t);
                    }
                }
            }
        } else {
            for date in [0, -1].into_iter().filter_map(|o| add_days(base, o)) {
                for &idx in self.trips_on(date).iter().rev() {
                    if times.len() >= count {
                        return times;
                    }
                    let t = shift(trips[idx.index()].arrival_at(stop_index, date), walk_secs);
                    if t < at {
                        times.push(t);
                    }
                }
            }
        }
        times
    }

    /// Every scheduled departure (forward) or arrival (backward) at the
    /// `stop_index`-th stop within `[start, end]`.
    ///
    /// The window must be non-empty and at most six hours long.
    pub fn trip_times_within(
        &self,
        trips: &[Trip],
        stop_index: usize,
        start: NaiveDateTime,
        end: NaiveDateTime,
        forward: bool,
    ) -> Result<Vec<NaiveDateTime>, DomainError> {
        if start >= end {
            return Err(DomainError::InvalidTimeWindow("start must be before end"));
        }
        if end - start > Duration::hours(MAX_TRIP_TIME_WINDOW_HOURS) {
            return Err(DomainError::InvalidTimeWindow("window longer than 6 hours"));
        }

        let mut offsets = vec![-1, 0];
        if end.date() > start.date() {
            offsets.push(1);
        }

        let mut times = Vec::new();
        for date in offsets.into_iter().filter_map(|o| add_days(start.date(), o)) {
            for &idx in self.trips_on(date) {
                let trip = &trips[idx.index()];
                let t = if forward {
                    trip.departure_at(stop_index, date)
                } else {
                    trip.arrival_at(stop_index, date)
                };
                if (start..=end).contains(&t) {
                    times.push(t);
                }
            }
        }
        Ok(times)
    }
}

fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::days(days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinates, RouteIdx};
    use crate::network::{NetworkBuilder, TransitModel};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn at(day: NaiveDate, hh: u32, mm: u32) -> NaiveDateTime {
        day.and_hms_opt(hh, mm, 0).unwrap()
    }

    /// A -> B -> C, trips at 08:00, 09:00 and a late one crossing midnight.
    fn network() -> TransitModel {
        let mut b = NetworkBuilder::new();
        b.add_stop("A", "A", Coordinates::new(50.0, 14.0)).unwrap();
        b.add_stop("B", "B", Coordinates::new(50.01, 14.0)).unwrap();
        b.add_stop("C", "C", Coordinates::new(50.02, 14.0)).unwrap();
        b.add_route("R", "1", VehicleType::Tram, &["A", "B", "C"]).unwrap();
        for (id, times) in [
            ("T8", [("08:00", "08:00"), ("08:10", "08:11"), ("08:20", "08:20")]),
            ("T9", [("09:00", "09:00"), ("09:10", "09:11"), ("09:20", "09:20")]),
            ("TL", [("23:50", "23:50"), ("00:05", "00:06"), ("00:20", "00:20")]),
        ] {
            b.add_trip_from_clock("R", id, &[date(), date().succ_opt().unwrap()], &times)
                .unwrap();
        }
        b.build()
    }

    fn trip_id(model: &TransitModel, found: Option<(TripIdx, NaiveDate)>) -> Option<(String, NaiveDate)> {
        found.map(|(t, d)| (model.trip(t).id.clone(), d))
    }

    #[test]
    fn stop_indices() {
        let model = network();
        let route = model.route(RouteIdx(0));
        let b = model.stop_by_id("B").unwrap();
        assert_eq!(route.first_stop_index(b), Ok(1));
        assert_eq!(route.last_stop_index(b), Ok(1));
        assert!(route.first_stop_index(StopIdx(99)).is_err());
    }

    #[test]
    fn forward_lookup_takes_earliest_boardable() {
        let model = network();
        let route = model.route(RouteIdx(0));
        let delays = DelayModel::new();

        let found = route.first_transferable_trip(model.trips(), 1, at(date(), 8, 30), true, &delays, 1);
        assert_eq!(trip_id(&model, found), Some(("T9".into(), date())));

        let found = route.first_transferable_trip(model.trips(), 1, at(date(), 8, 11), true, &delays, 1);
        assert_eq!(trip_id(&model, found), Some(("T8".into(), date())));
    }

    #[test]
    fn forward_lookup_finds_previous_day_run_past_midnight() {
        let model = network();
        let route = model.route(RouteIdx(0));
        let next = date().succ_opt().unwrap();

        // 00:00 on the next day: the late run of the previous service date
        // calls at B at 00:06.
        let found = route.first_transferable_trip(model.trips(), 1, at(next, 0, 0), true, &DelayModel::new(), 1);
        assert_eq!(trip_id(&model, found), Some(("TL".into(), date())));
    }

    #[test]
    fn forward_lookup_applies_departure_delay() {
        let model = network();
        let route = model.route(RouteIdx(0));
        let mut delays = DelayModel::new();
        delays.add_delay(date(), "T8", 0, 0);
        delays.add_delay(date(), "T8", 300, 300);

        // scheduled 08:11, running 5 minutes late
        let found = route.first_transferable_trip(model.trips(), 1, at(date(), 8, 14), true, &delays, 1);
        assert_eq!(trip_id(&model, found), Some(("T8".into(), date())));
    }

    #[test]
    fn backward_lookup_takes_latest_arriving() {
        let model = network();
        let route = model.route(RouteIdx(0));

        let found =
            route.first_transferable_trip(model.trips(), 2, at(date(), 9, 0), false, &DelayModel::new(), 1);
        assert_eq!(trip_id(&model, found), Some(("T8".into(), date())));

        let found =
            route.first_transferable_trip(model.trips(), 2, at(date(), 7, 0), false, &DelayModel::new(), 1);
        assert_eq!(found, None);
    }

    #[test]
    fn horizon_bounds_the_scan() {
        let model = network();
        let route = model.route(RouteIdx(0));
        let far = date().checked_add_signed(Duration::days(5)).unwrap();
        let found = route.first_transferable_trip(model.trips(), 0, at(far, 7, 0), true, &DelayModel::new(), 3);
        assert_eq!(found, None);
    }

    #[test]
    fn first_trip_times_offsets_walk() {
        let model = network();
        let route = model.route(RouteIdx(0));
        let times = route.first_trip_times(model.trips(), 0, at(date(), 7, 0), 120, 2, true);
        assert_eq!(times, vec![at(date(), 7, 58), at(date(), 8, 58)]);

        let times = route.first_trip_times(model.trips(), 2, at(date(), 9, 30), 60, 1, false);
        assert_eq!(times, vec![date().and_hms_opt(9, 21, 0).unwrap()]);
    }

    #[test]
    fn trip_times_within_window() {
        let model = network();
        let route = model.route(RouteIdx(0));
        let times = route
            .trip_times_within(model.trips(), 0, at(date(), 7, 0), at(date(), 10, 0), true)
            .unwrap();
        assert_eq!(times, vec![at(date(), 8, 0), at(date(), 9, 0)]);

        assert!(route
            .trip_times_within(model.trips(), 0, at(date(), 7, 0), at(date(), 14, 0), true)
            .is_err());
        assert!(route
            .trip_times_within(model.trips(), 0, at(date(), 7, 0), at(date(), 7, 0), true)
            .is_err());
    }
}
