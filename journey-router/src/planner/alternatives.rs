//! Interchangeable trips between two stops.
//!
//! Given a stop pair and an instant, list the next (or previous) trips that
//! connect them directly, on any route through the source stop or a stop
//! next to it. Also used to fill per-leg alternatives of an itinerary.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::extract::used_trip;
use super::result::{Itinerary, TripAlternatives, UsedTrip};
use super::route_finder::SearchContext;
use crate::domain::{RouteIdx, StopIdx, TripIdx};

/// Stops this close to the requested one count as the same stop.
const NEARBY_STOP_RADIUS: u32 = 150;

/// How many service days past the first boardable trip are scanned.
const MAX_SPILL_DAYS: i64 = 2;

pub const MAX_ALTERNATIVES: usize = 10;

/// Error from an alternative trips query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlternativesError {
    #[error("date and time of the query are missing")]
    InvalidDateTime,

    #[error("unknown source stop id {0:?}")]
    NonExistentSourceStopId(String),

    #[error("unknown destination stop id {0:?}")]
    NonExistentDestinationStopId(String),

    #[error("unknown source and destination stop ids")]
    NonExistentBothStopIds,

    #[error("count must be 1-{MAX_ALTERNATIVES}, got {0}")]
    InvalidCount(usize),

    #[error("no trips found")]
    NoTripsFound,
}

impl AlternativesError {
    pub fn code(&self) -> &'static str {
        match self {
            AlternativesError::InvalidDateTime => "InvalidDateTime",
            AlternativesError::NonExistentSourceStopId(_) => "NonExistentSourceStopId",
            AlternativesError::NonExistentDestinationStopId(_) => "NonExistentDestinationStopId",
            AlternativesError::NonExistentBothStopIds => "NonExistentBothStopIds",
            AlternativesError::InvalidCount(_) => "InvalidCount",
            AlternativesError::NoTripsFound => "NoTripsFound",
        }
    }
}

/// A query for trips between two stops around an instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativesRequest {
    pub source_stop_id: String,
    pub destination_stop_id: String,
    pub date_time: Option<NaiveDateTime>,
    pub count: usize,
    /// Trips before `date_time` instead of after it.
    #[serde(default)]
    pub previous: bool,
}

/// One way of riding directly from the source side to the destination side.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    route: RouteIdx,
    on: usize,
    off: usize,
}

/// Finds interchangeable trips.
pub struct AlternativesFinder<'a> {
    ctx: SearchContext<'a>,
}

impl<'a> AlternativesFinder<'a> {
    pub fn new(ctx: SearchContext<'a>) -> Self {
        Self { ctx }
    }

    /// Answer an [`AlternativesRequest`].
    pub fn find(&self, request: &AlternativesRequest) -> Result<Vec<UsedTrip>, AlternativesError> {
        let time = request.date_time.ok_or(AlternativesError::InvalidDateTime)?;
        let network = self.ctx.network;
        let source = network.stop_by_id(&request.source_stop_id);
        let destination = network.stop_by_id(&request.destination_stop_id);
        let (source, destination) = match (source, destination) {
            (Some(s), Some(d)) => (s, d),
            (None, None) => return Err(AlternativesError::NonExistentBothStopIds),
            (None, Some(_)) => {
                return Err(AlternativesError::NonExistentSourceStopId(
                    request.source_stop_id.clone(),
                ));
            }
            (Some(_), None) => {
                return Err(AlternativesError::NonExistentDestinationStopId(
                    request.destination_stop_id.clone(),
                ));
            }
        };
        if !(1..=MAX_ALTERNATIVES).contains(&request.count) {
            return Err(AlternativesError::InvalidCount(request.count));
        }

        let trips = self.between(source, destination, time, request.count, request.previous);
        debug!(
            source = %request.source_stop_id,
            destination = %request.destination_stop_id,
            trips = trips.len(),
            "alternatives found"
        );
        if trips.is_empty() {
            Err(AlternativesError::NoTripsFound)
        } else {
            Ok(trips)
        }
    }

    fn between(
        &self,
        source: StopIdx,
        destination: StopIdx,
        time: NaiveDateTime,
        count: usize,
        previous: bool,
    ) -> Vec<UsedTrip> {
        let mut trips = Vec::new();
        for candidate in self.candidates(source, destination) {
            trips.extend(self.trips_around(candidate, time, count, previous));
        }

        trips.sort_by(|a, b| {
            a.actual_arrival()
                .cmp(&b.actual_arrival())
                .then_with(|| a.trip_id.cmp(&b.trip_id))
                .then(a.get_on_index.cmp(&b.get_on_index))
        });
        let trips = remove_dominated(trips);

        if previous {
            let skip = trips.len().saturating_sub(count);
            trips.into_iter().skip(skip).collect()
        } else {
            trips.into_iter().take(count).collect()
        }
    }

    /// The stop, stops sharing its name and stops right next to it.
    fn equivalent_stops(&self, stop: StopIdx) -> BTreeSet<StopIdx> {
        let network = self.ctx.network;
        let s = network.stop(stop);
        let mut stops = BTreeSet::from([stop]);
        stops.extend(network.stops_by_name(&s.name).iter().copied());
        stops.extend(
            network
                .stops_near(&s.coords, NEARBY_STOP_RADIUS)
                .into_iter()
                .map(|(idx, _)| idx),
        );
        stops
    }

    /// Routes that pass a source-side stop and later a destination-side one.
    fn candidates(&self, source: StopIdx, destination: StopIdx) -> Vec<Candidate> {
        let network = self.ctx.network;
        let targets = self.equivalent_stops(destination);
        let mut seen = BTreeSet::new();
        let mut candidates = Vec::new();

        for stop in self.equivalent_stops(source) {
            for &route_idx in &network.stop(stop).routes {
                if seen.contains(&route_idx) {
                    continue;
                }
                let route = network.route(route_idx);
                let Ok(on) = route.first_stop_index(stop) else {
                    continue;
                };
                let off = route
                    .stops
                    .iter()
                    .enumerate()
                    .skip(on + 1)
                    .find(|(_, s)| targets.contains(s))
                    .map(|(i, _)| i);
                if let Some(off) = off {
                    seen.insert(route_idx);
                    candidates.push(Candidate {
                        route: route_idx,
                        on,
                        off,
                    });
                }
            }
        }
        candidates
    }

    /// The first trip boardable at `time` and the `count` trips after it, or
    /// the `count` trips before it.
    fn trips_around(
        &self,
        candidate: Candidate,
        time: NaiveDateTime,
        count: usize,
        previous: bool,
    ) -> Vec<UsedTrip> {
        let network = self.ctx.network;
        let route = network.route(candidate.route);
        let Some((first, date)) = route.first_transferable_trip(
            network.trips(),
            candidate.on,
            time,
            true,
            self.ctx.delays,
            self.ctx.settings.max_trip_days,
        ) else {
            return Vec::new();
        };

        let runs = if previous {
            neighbours_before(self.ctx, candidate.route, first, date, count)
        } else {
            let mut runs = vec![(first, date)];
            runs.extend(neighbours_after(self.ctx, candidate.route, first, date, count - 1));
            runs
        };
        runs.into_iter()
            .map(|(trip, date)| used_trip(self.ctx, trip, date, candidate.on, candidate.off))
            .collect()
    }
}

fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::days(days))
}

/// Up to `count` runs of the route after `trip` on `date`, continuing into
/// the following service days.
fn neighbours_after(
    ctx: SearchContext<'_>,
    route: RouteIdx,
    trip: TripIdx,
    date: NaiveDate,
    count: usize,
) -> Vec<(TripIdx, NaiveDate)> {
    let route = ctx.network.route(route);
    let day = route.trips_on(date);
    let start = day.iter().position(|&t| t == trip).map_or(day.len(), |p| p + 1);
    let mut runs: Vec<_> = day[start..].iter().map(|&t| (t, date)).collect();
    for offset in 1..=MAX_SPILL_DAYS {
        if runs.len() >= count {
            break;
        }
        let Some(next) = add_days(date, offset) else { break };
        runs.extend(route.trips_on(next).iter().map(|&t| (t, next)));
    }
    runs.truncate(count);
    runs
}

/// Up to `count` runs of the route before `trip` on `date`, continuing into
/// the preceding service days. Returned in chronological order.
fn neighbours_before(
    ctx: SearchContext<'_>,
    route: RouteIdx,
    trip: TripIdx,
    date: NaiveDate,
    count: usize,
) -> Vec<(TripIdx, NaiveDate)> {
    let route = ctx.network.route(route);
    let day = route.trips_on(date);
    let end = day.iter().position(|&t| t == trip).unwrap_or(0);
    let mut runs: Vec<_> = day[..end].iter().rev().map(|&t| (t, date)).collect();
    for offset in 1..=MAX_SPILL_DAYS {
        if runs.len() >= count {
            break;
        }
        let Some(prev) = add_days(date, -offset) else { break };
        runs.extend(route.trips_on(prev).iter().rev().map(|&t| (t, prev)));
    }
    runs.truncate(count);
    runs.reverse();
    runs
}

/// Drop every trip that leaves strictly earlier than another but does not
/// arrive earlier. Input is sorted by arrival.
fn remove_dominated(trips: Vec<UsedTrip>) -> Vec<UsedTrip> {
    let keep: Vec<bool> = trips
        .iter()
        .map(|a| {
            !trips.iter().any(|b| {
                a.actual_departure() < b.actual_departure() && a.actual_arrival() >= b.actual_arrival()
            })
        })
        .collect();
    trips
        .into_iter()
        .zip(keep)
        .filter_map(|(t, keep)| keep.then_some(t))
        .collect()
}

/// Attach up to `count` earlier and `count` later runs of the same route
/// between the same stops to every trip leg of `itinerary`.
pub fn fill_trip_alternatives(ctx: SearchContext<'_>, itinerary: &mut Itinerary, count: usize) {
    itinerary.initialize_alternatives();
    if count == 0 {
        return;
    }
    let trips: Vec<&UsedTrip> = itinerary.trips().collect();
    let mut filled = Vec::with_capacity(trips.len());
    for used in trips {
        let Some((route, trip)) = locate(ctx, used) else {
            filled.push(TripAlternatives {
                alternatives: vec![used.clone()],
                current: 0,
            });
            continue;
        };
        let date = used.service_date;
        let ride = |(t, d): (TripIdx, NaiveDate)| {
            used_trip(ctx, t, d, used.get_on_index, used.get_off_index)
        };
        let mut alternatives: Vec<UsedTrip> = neighbours_before(ctx, route, trip, date, count)
            .into_iter()
            .map(ride)
            .collect();
        let current = alternatives.len();
        alternatives.push(used.clone());
        alternatives.extend(neighbours_after(ctx, route, trip, date, count).into_iter().map(ride));
        filled.push(TripAlternatives {
            alternatives,
            current,
        });
    }
    itinerary.trip_alternatives = filled;
}

/// Find the route and trip a used trip was built from.
fn locate(ctx: SearchContext<'_>, used: &UsedTrip) -> Option<(RouteIdx, TripIdx)> {
    let network = ctx.network;
    let stop = network.stop_by_id(&used.boarding().id)?;
    network.stop(stop).routes.iter().find_map(|&route_idx| {
        let route = network.route(route_idx);
        if route.id != used.route_id {
            return None;
        }
        route
            .trips_on(used.service_date)
            .iter()
            .copied()
            .find(|&t| network.trip(t).id == used.trip_id)
            .map(|t| (route_idx, t))
    })
}
