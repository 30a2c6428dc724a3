//! Turning a converged search into itineraries.
//!
//! Every round may hold a result: the best end point reached in that round.
//! Rounds are compared by their end time plus a comfort penalty per
//! transfer, and the winning round is walked back through the recorded
//! reach tags to produce legs.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use super::result::{Itinerary, Leg, PointInfo, StopPass, UsedBikeTrip, UsedTransfer, UsedTrip};
use super::route_finder::SearchContext;
use super::search_model::{CustomTransfer, Reach, SearchModel, TransferRef};
use crate::domain::{BikeStationIdx, Coordinates, CustomPoint, RoutePoint, TripIdx, shift};

/// Alternatives within this margin of the best adjusted time are kept.
const VIABLE_ALTERNATIVE_MARGIN_SECS: i64 = 5 * 60;

/// The result of one round.
#[derive(Debug, Clone)]
pub struct RoundResult {
    pub round: usize,
    pub end: RoutePoint,
    /// Search-end time including any final walk.
    pub end_time: NaiveDateTime,
    /// `end_time` with the comfort penalty applied.
    pub adjusted_time: NaiveDateTime,
    pub itinerary: Itinerary,
}

/// Builds itineraries from a converged [`SearchModel`].
pub struct ResultBuilder<'a> {
    ctx: SearchContext<'a>,
    model: &'a SearchModel,
    forward: bool,
    mpl: i64,
}

impl<'a> ResultBuilder<'a> {
    pub fn new(ctx: SearchContext<'a>, model: &'a SearchModel) -> Self {
        let forward = model.forward();
        Self {
            ctx,
            model,
            forward,
            mpl: if forward { 1 } else { -1 },
        }
    }

    /// The result with the best comfort-adjusted time; earlier rounds win
    /// ties.
    pub fn best_result(&self) -> Option<Itinerary> {
        let results = self.round_results();
        let best = self.pick_best(&results)?;
        debug!(
            round = results[best].round,
            legs = results[best].itinerary.legs.len(),
            "best result selected"
        );
        results.into_iter().nth(best).map(|r| r.itinerary)
    }

    /// Every round result whose adjusted time is within five minutes of the
    /// best one, in round order.
    pub fn viable_alternatives(&self) -> Vec<Itinerary> {
        let results = self.round_results();
        let Some(best) = self.pick_best(&results) else {
            return Vec::new();
        };
        let cmp = self.model.comparator();
        let limit = shift(
            results[best].adjusted_time,
            self.mpl * VIABLE_ALTERNATIVE_MARGIN_SECS,
        );
        let viable: Vec<Itinerary> = results
            .into_iter()
            .filter(|r| cmp.improves(r.adjusted_time, limit))
            .map(|r| r.itinerary)
            .collect();
        debug!(results = viable.len(), "viable alternatives collected");
        viable
    }

    fn pick_best(&self, results: &[RoundResult]) -> Option<usize> {
        let cmp = self.model.comparator();
        let mut best: Option<usize> = None;
        for (i, r) in results.iter().enumerate() {
            match best {
                Some(b) if !cmp.improves(r.adjusted_time, results[b].adjusted_time) => {}
                _ => best = Some(i),
            }
        }
        best
    }

    /// One result per round that reached the search end better than every
    /// earlier round did at the same point.
    pub fn round_results(&self) -> Vec<RoundResult> {
        let cmp = self.model.comparator();
        let penalty = self.ctx.settings.transfer_penalty_seconds();
        let ends = self.model.end_side().points();
        let mut results = Vec::new();

        for round in 0..=self.model.rounds() {
            let mut chosen: Option<(RoutePoint, NaiveDateTime)> = None;
            for &end in &ends {
                if !self.model.is_reached(end, round) {
                    continue;
                }
                let time = self.model.end_time_via(end, round);
                let beats_earlier = (0..round)
                    .all(|earlier| cmp.improves(time, self.model.end_time_via(end, earlier)));
                if !beats_earlier {
                    continue;
                }
                if chosen.is_none_or(|(_, best)| cmp.improves(time, best)) {
                    chosen = Some((end, time));
                }
            }
            let Some((end, end_time)) = chosen else {
                continue;
            };

            let Some(itinerary) = self.build(end, round) else {
                continue;
            };
            let transfers = round.saturating_sub(1)
                + usize::from(itinerary.starts_with_transfer())
                + usize::from(itinerary.ends_with_transfer());
            let count = i64::try_from(transfers).unwrap_or(i64::MAX);
            let adjusted_time = shift(end_time, self.mpl * count.saturating_mul(penalty));
            results.push(RoundResult {
                round,
                end,
                end_time,
                adjusted_time,
                itinerary,
            });
        }
        results
    }

    /// Walk back from `end` in `final_round` and assemble the itinerary.
    ///
    /// Returns `None` if some round on the way back holds no vehicle leg.
    pub fn build(&self, end: RoutePoint, final_round: usize) -> Option<Itinerary> {
        let network = self.ctx.network;
        let bikes = self.ctx.bikes;
        let mut legs = Vec::new();

        if let Some(custom) = self.model.end_side().custom_point() {
            let distance = self.model.end_side().access_distance(end).unwrap_or_default();
            legs.push(self.transfer_leg(TransferRef::Custom(CustomTransfer {
                point: custom,
                other: end,
                distance,
            })));
        }

        let mut point = end;
        let mut round = final_round;
        while round > 0 {
            let mut reach = self.model.reach(point, round);
            if let Reach::ByTransfer(transfer) = reach {
                legs.push(self.transfer_leg(transfer));
                point = transfer.search_from(network, bikes, self.forward);
                reach = self.model.reach(point, round);
            } else if point.as_stop().is_some() && round != final_round {
                legs.push(self.stationary_leg(point));
            }

            match reach {
                Reach::ByTrip {
                    trip,
                    date,
                    boarded_at,
                    board_index,
                    reach_index,
                } => {
                    let (on, off) = if self.forward {
                        (board_index, reach_index)
                    } else {
                        (reach_index, board_index)
                    };
                    legs.push(Leg::Trip(used_trip(self.ctx, trip, date, on, off)));
                    point = RoutePoint::Stop(boarded_at);
                }
                Reach::ByBikeTrip { from, to } => {
                    let (source, target) = if self.forward { (from, to) } else { (to, from) };
                    legs.push(Leg::Bike(self.bike_leg(source, target)));
                    point = RoutePoint::BikeStation(from);
                }
                other => {
                    warn!(%point, round, reach = ?other, "round has no vehicle leg, result skipped");
                    return None;
                }
            }
            round -= 1;
        }

        if let Reach::ByTransfer(transfer) = self.model.reach(point, 0) {
            legs.push(self.transfer_leg(transfer));
        }

        if self.forward {
            legs.reverse();
        }
        Some(Itinerary::new(legs, self.model.begin_time(), self.forward))
    }

    fn custom_coords(&self, point: CustomPoint) -> Option<Coordinates> {
        [self.model.begin_side(), self.model.end_side()]
            .into_iter()
            .find(|side| side.custom_point() == Some(point))
            .and_then(|side| side.coords())
    }

    fn point_info(&self, point: RoutePoint) -> PointInfo {
        match point {
            RoutePoint::Stop(s) => {
                let stop = self.ctx.network.stop(s);
                PointInfo::new(stop.id.clone(), stop.name.clone(), stop.coords)
            }
            RoutePoint::BikeStation(b) => {
                let station = self.ctx.bikes.station(b);
                PointInfo::new(station.id.clone(), station.name.clone(), station.coords)
            }
            RoutePoint::Custom(c) => {
                let coords = self
                    .custom_coords(c)
                    .unwrap_or_else(|| Coordinates::new(0.0, 0.0));
                PointInfo::new(c.name(), c.name(), coords)
            }
        }
    }

    fn transfer_leg(&self, transfer: TransferRef) -> Leg {
        let network = self.ctx.network;
        let bikes = self.ctx.bikes;
        let (source, target) = transfer.ends(network, bikes);
        let distance = transfer.distance(network, bikes);
        let seconds = match transfer {
            TransferRef::Stop(_) => self.ctx.settings.stop_transfer_time(distance),
            TransferRef::Bike(_) => {
                let search_target = if self.forward { target } else { source };
                let to_station = matches!(search_target, RoutePoint::BikeStation(_));
                self.ctx.transfer_seconds(distance, to_station)
            }
            TransferRef::Custom(_) => self.ctx.settings.adjusted_walking_time(distance),
        };
        Leg::Transfer(UsedTransfer {
            from: self.point_info(source),
            to: self.point_info(target),
            distance,
            seconds,
        })
    }

    /// A change of vehicles without leaving the stop.
    fn stationary_leg(&self, point: RoutePoint) -> Leg {
        let info = self.point_info(point);
        Leg::Transfer(UsedTransfer {
            from: info.clone(),
            to: info,
            distance: 0,
            seconds: self.ctx.settings.stop_transfer_time(0),
        })
    }

    fn bike_leg(&self, from: BikeStationIdx, to: BikeStationIdx) -> UsedBikeTrip {
        let distance = u32::try_from(self.ctx.bikes.distance(from, to)).unwrap_or_default();
        UsedBikeTrip {
            from: self.point_info(RoutePoint::BikeStation(from)),
            to: self.point_info(RoutePoint::BikeStation(to)),
            distance,
            seconds: self.ctx.settings.adjusted_bike_trip_time(distance),
        }
    }
}

/// Describe a ride on `trip_idx` from stop index `on` to `off`, with the
/// live delays known for that run.
pub(crate) fn used_trip(
    ctx: SearchContext<'_>,
    trip_idx: TripIdx,
    date: NaiveDate,
    on: usize,
    off: usize,
) -> UsedTrip {
    let network = ctx.network;
    let trip = network.trip(trip_idx);
    let route = network.route(trip.route);
    let stop_passes = route
        .stops
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let stop = network.stop(s);
            StopPass {
                id: stop.id.clone(),
                name: stop.name.clone(),
                arrival: trip.arrival_at(i, date),
                departure: trip.departure_at(i, date),
            }
        })
        .collect();

    let boarding = ctx.delays.delay(date, &trip.id, on);
    let alighting = ctx.delays.delay(date, &trip.id, off);
    UsedTrip {
        trip_id: trip.id.clone(),
        route_id: route.id.clone(),
        line: route.info.short_name.clone(),
        color: route.info.color.clone(),
        vehicle_type: route.info.vehicle_type,
        service_date: date,
        stop_passes,
        get_on_index: on,
        get_off_index: off,
        has_delay_info: boarding.is_some() && alighting.is_some(),
        delay_when_boarded: boarding.map(|d| d.departure).unwrap_or_default(),
        current_delay: alighting.map(|d| d.arrival).unwrap_or_default(),
    }
}
