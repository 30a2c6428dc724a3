//! Searches over a span of departure (or arrival) times.
//!
//! Instead of one search at the requested instant, run one search per
//! upcoming vehicle departure at the begin stops and merge the results. The
//! searches are independent; callers may run them in parallel and hand the
//! results back to [`merge`].

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::endpoint::Endpoint;
use super::rank::{deduplicate, rank_itineraries};
use super::request::{ConnectionRequest, SearchError, ValidatedRequest};
use super::result::Itinerary;
use super::route_finder::SearchContext;
use super::search::{Planner, ResultMode};
use crate::domain::{RoutePoint, StopIdx, shift, truncate_to_minute};
use crate::network::Route;
use crate::snapshot::Snapshot;

/// Searches per range query without a window.
pub const RANGE_SEARCHES: usize = 5;

/// Upper bound on searches when a window is given.
pub const MAX_WINDOW_SEARCHES: usize = 30;

/// A range query: the connection request plus an optional window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRequest {
    #[serde(flatten)]
    pub connection: ConnectionRequest,
    /// Search every vehicle time within this many minutes after (or, for an
    /// arrival search, before) the requested instant.
    #[serde(default)]
    pub window_minutes: Option<u32>,
}

/// Search instants resolved for a range query.
#[derive(Debug, Clone)]
pub struct RangePlan {
    pub request: ValidatedRequest,
    pub instants: Vec<NaiveDateTime>,
}

/// Validate `request` and pick the instants to search at.
pub fn plan(snapshot: &Snapshot, request: &RangeRequest) -> Result<RangePlan, SearchError> {
    let validated = request.connection.validate(snapshot)?;
    let settings = &request.connection.settings;
    let ctx = SearchContext::new(snapshot, settings);

    let forward = validated.forward;
    let begin = if forward {
        &validated.source
    } else {
        &validated.destination
    };
    let starts = begin_stops(ctx, begin);

    let mut times = Vec::new();
    match request.window_minutes {
        None => {
            for &(stop, walk) in &starts {
                for_each_route_index(ctx, stop, forward, |route, index| {
                    times.extend(route.first_trip_times(
                        ctx.network.trips(),
                        index,
                        validated.time,
                        walk,
                        RANGE_SEARCHES,
                        forward,
                    ));
                    Ok(())
                })?;
            }
        }
        Some(minutes) => {
            let span = Duration::minutes(i64::from(minutes));
            let (start, end) = if forward {
                (validated.time, validated.time + span)
            } else {
                (validated.time - span, validated.time)
            };
            for &(stop, walk) in &starts {
                for_each_route_index(ctx, stop, forward, |route, index| {
                    let within = route
                        .trip_times_within(ctx.network.trips(), index, start, end, forward)
                        .map_err(|_| SearchError::InvalidTimeWindow)?;
                    times.extend(
                        within
                            .into_iter()
                            .map(|t| shift(t, if forward { -walk } else { walk })),
                    );
                    Ok(())
                })?;
            }
        }
    }

    let limit = match request.window_minutes {
        None => RANGE_SEARCHES,
        Some(_) => MAX_WINDOW_SEARCHES,
    };
    let instants = pick_instants(times, forward, limit, validated.time);
    debug!(instants = instants.len(), forward, "range planned");
    Ok(RangePlan {
        request: validated,
        instants,
    })
}

/// Begin stops with the walking time to reach them from the begin point:
/// the endpoint's own stops, plus stops one walking transfer away.
fn begin_stops(ctx: SearchContext<'_>, begin: &Endpoint) -> Vec<(StopIdx, i64)> {
    let mut stops: Vec<(StopIdx, i64)> = match begin {
        Endpoint::Stops(stops) => stops.iter().map(|&s| (s, 0)).collect(),
        Endpoint::Coordinates { access, .. } => access
            .iter()
            .filter_map(|&(point, d)| match point {
                RoutePoint::Stop(s) => Some((s, ctx.settings.adjusted_walking_time(d))),
                _ => None,
            })
            .collect(),
    };

    let max = ctx.settings.max_transfer_distance();
    let direct: Vec<(StopIdx, i64)> = stops.clone();
    for (stop, walk) in direct {
        for &t in &ctx.network.stop(stop).transfers {
            let transfer = ctx.network.transfer(t);
            if transfer.distance > max {
                continue;
            }
            let seconds = walk + ctx.settings.stop_transfer_time(transfer.distance);
            stops.push((transfer.to, seconds));
        }
    }
    stops
}

fn for_each_route_index(
    ctx: SearchContext<'_>,
    stop: StopIdx,
    forward: bool,
    mut f: impl FnMut(&Route, usize) -> Result<(), SearchError>,
) -> Result<(), SearchError> {
    for &route_idx in &ctx.network.stop(stop).routes {
        let route = ctx.network.route(route_idx);
        if let Ok(index) = route.stop_index(stop, forward) {
            f(route, index)?;
        }
    }
    Ok(())
}

/// Round to whole minutes (down going forward, up going backward) and keep
/// the first `limit` distinct instants in search order.
fn pick_instants(
    times: Vec<NaiveDateTime>,
    forward: bool,
    limit: usize,
    fallback: NaiveDateTime,
) -> Vec<NaiveDateTime> {
    let rounded: BTreeSet<NaiveDateTime> = times
        .into_iter()
        .map(|t| {
            let down = truncate_to_minute(t);
            if forward || down == t {
                down
            } else {
                down + Duration::minutes(1)
            }
        })
        .collect();
    let instants: Vec<NaiveDateTime> = if forward {
        rounded.into_iter().take(limit).collect()
    } else {
        rounded.into_iter().rev().take(limit).collect()
    };
    if instants.is_empty() {
        vec![fallback]
    } else {
        instants
    }
}

/// Merge the results of the individual searches into one ranked list.
pub fn merge(results: impl IntoIterator<Item = Vec<Itinerary>>) -> Vec<Itinerary> {
    let all: Vec<Itinerary> = results.into_iter().flatten().collect();
    rank_itineraries(deduplicate(all))
}

/// Plan and run a range query on the current thread.
pub fn search_range(snapshot: &Snapshot, request: &RangeRequest) -> Result<Vec<Itinerary>, SearchError> {
    let plan = plan(snapshot, request)?;
    let planner = Planner::new(snapshot);
    let settings = &request.connection.settings;
    let merged = merge(
        plan.instants
            .iter()
            .map(|&t| planner.run(settings, &plan.request, t, ResultMode::Viable)),
    );
    if merged.is_empty() {
        Err(SearchError::NoConnectionFound)
    } else {
        Ok(merged)
    }
}
