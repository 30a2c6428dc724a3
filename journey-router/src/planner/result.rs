//! Journeys returned by a search.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::domain::{Coordinates, shift};
use crate::network::VehicleType;

/// A stop, bike station or coordinate endpoint as shown to the traveller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointInfo {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl PointInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, coords: Coordinates) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lat: coords.lat,
            lon: coords.lon,
        }
    }
}

/// Scheduled call of a trip at one stop of its route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopPass {
    pub id: String,
    pub name: String,
    pub arrival: NaiveDateTime,
    pub departure: NaiveDateTime,
}

/// A ride on one trip.
///
/// `stop_passes` covers the whole route so clients can draw it; the
/// traveller rides from `get_on_index` to `get_off_index`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsedTrip {
    pub trip_id: String,
    pub route_id: String,
    pub line: String,
    pub color: Option<String>,
    pub vehicle_type: VehicleType,
    pub service_date: NaiveDate,
    pub stop_passes: Vec<StopPass>,
    pub get_on_index: usize,
    pub get_off_index: usize,
    /// Whether live delays were known at both ends of the ride.
    pub has_delay_info: bool,
    /// Departure delay at the boarding stop, seconds.
    pub delay_when_boarded: i64,
    /// Arrival delay at the alighting stop, seconds.
    pub current_delay: i64,
}

impl UsedTrip {
    pub fn boarding(&self) -> &StopPass {
        &self.stop_passes[self.get_on_index]
    }

    pub fn alighting(&self) -> &StopPass {
        &self.stop_passes[self.get_off_index]
    }

    /// Departure from the boarding stop, delay included.
    pub fn actual_departure(&self) -> NaiveDateTime {
        shift(self.boarding().departure, self.delay_when_boarded)
    }

    /// Arrival at the alighting stop, delay included.
    pub fn actual_arrival(&self) -> NaiveDateTime {
        shift(self.alighting().arrival, self.current_delay)
    }
}

/// A walk between two points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsedTransfer {
    pub from: PointInfo,
    pub to: PointInfo,
    pub distance: u32,
    pub seconds: i64,
}

/// A ride on a shared bike between two stations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsedBikeTrip {
    pub from: PointInfo,
    pub to: PointInfo,
    pub distance: u32,
    pub seconds: i64,
}

/// One segment of an itinerary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Leg {
    Trip(UsedTrip),
    Transfer(UsedTransfer),
    Bike(UsedBikeTrip),
}

impl Leg {
    pub fn source_id(&self) -> &str {
        match self {
            Leg::Trip(t) => &t.boarding().id,
            Leg::Transfer(t) => &t.from.id,
            Leg::Bike(b) => &b.from.id,
        }
    }

    pub fn destination_id(&self) -> &str {
        match self {
            Leg::Trip(t) => &t.alighting().id,
            Leg::Transfer(t) => &t.to.id,
            Leg::Bike(b) => &b.to.id,
        }
    }

    /// Duration of a walk or bike ride; trips are timed by the timetable.
    fn fixed_seconds(&self) -> Option<i64> {
        match self {
            Leg::Trip(_) => None,
            Leg::Transfer(t) => Some(t.seconds),
            Leg::Bike(b) => Some(b.seconds),
        }
    }
}

/// Interchangeable trips for one trip leg; `current` is the one in use.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripAlternatives {
    pub alternatives: Vec<UsedTrip>,
    pub current: usize,
}

/// A complete journey, legs in travel order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Itinerary {
    pub legs: Vec<Leg>,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    /// One entry per trip leg, in order.
    pub trip_alternatives: Vec<TripAlternatives>,
}

impl Itinerary {
    /// An itinerary from legs in travel order, timed against the search
    /// begin instant.
    pub fn new(legs: Vec<Leg>, begin: NaiveDateTime, forward: bool) -> Self {
        let mut itinerary = Self {
            legs,
            departure: begin,
            arrival: begin,
            trip_alternatives: Vec::new(),
        };
        itinerary.set_times(begin, forward);
        itinerary.initialize_alternatives();
        itinerary
    }

    pub fn trips(&self) -> impl Iterator<Item = &UsedTrip> {
        self.legs.iter().filter_map(|leg| match leg {
            Leg::Trip(t) => Some(t),
            _ => None,
        })
    }

    pub fn trip_count(&self) -> usize {
        self.trips().count()
    }

    pub fn bike_trip_count(&self) -> usize {
        self.legs.iter().filter(|l| matches!(l, Leg::Bike(_))).count()
    }

    pub fn transfer_count(&self) -> usize {
        self.legs.iter().filter(|l| matches!(l, Leg::Transfer(_))).count()
    }

    pub fn starts_with_transfer(&self) -> bool {
        matches!(self.legs.first(), Some(Leg::Transfer(_)))
    }

    pub fn ends_with_transfer(&self) -> bool {
        matches!(self.legs.last(), Some(Leg::Transfer(_)))
    }

    /// Walking and cycling time before the first trip.
    pub fn seconds_before_first_trip(&self) -> i64 {
        self.legs
            .iter()
            .map_while(Leg::fixed_seconds)
            .sum()
    }

    /// Walking and cycling time after the last trip.
    pub fn seconds_after_last_trip(&self) -> i64 {
        self.legs
            .iter()
            .rev()
            .map_while(Leg::fixed_seconds)
            .sum()
    }

    pub fn duration_secs(&self) -> i64 {
        (self.arrival - self.departure).num_seconds()
    }

    /// Derive departure and arrival.
    ///
    /// With trips, both come from the real (delayed) times of the first and
    /// last trip, extended by the walks and rides around them. Without trips
    /// they come from the search begin instant.
    pub fn set_times(&mut self, begin: NaiveDateTime, forward: bool) {
        let first = self.trips().next().map(UsedTrip::actual_departure);
        let last = self.trips().last().map(UsedTrip::actual_arrival);
        match (first, last) {
            (Some(first), Some(last)) => {
                self.departure = shift(first, -self.seconds_before_first_trip());
                self.arrival = shift(last, self.seconds_after_last_trip());
            }
            _ => {
                let total: i64 = self.legs.iter().filter_map(Leg::fixed_seconds).sum();
                if forward {
                    self.departure = begin;
                    self.arrival = shift(begin, total);
                } else {
                    self.departure = shift(begin, -total);
                    self.arrival = begin;
                }
            }
        }
    }

    /// Reset every trip leg's alternatives to just the trip itself.
    pub fn initialize_alternatives(&mut self) {
        self.trip_alternatives = self
            .trips()
            .map(|t| TripAlternatives {
                alternatives: vec![t.clone()],
                current: 0,
            })
            .collect();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn at(hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(hh, mm, ss)
            .unwrap()
    }

    fn point(id: &str) -> PointInfo {
        PointInfo::new(id, id, Coordinates::new(50.0, 14.0))
    }

    pub(crate) fn trip(id: &str, on: (&str, NaiveDateTime), off: (&str, NaiveDateTime)) -> UsedTrip {
        UsedTrip {
            trip_id: id.into(),
            route_id: "R".into(),
            line: "1".into(),
            color: None,
            vehicle_type: VehicleType::Tram,
            service_date: on.1.date(),
            stop_passes: vec![
                StopPass {
                    id: on.0.into(),
                    name: on.0.into(),
                    arrival: on.1,
                    departure: on.1,
                },
                StopPass {
                    id: off.0.into(),
                    name: off.0.into(),
                    arrival: off.1,
                    departure: off.1,
                },
            ],
            get_on_index: 0,
            get_off_index: 1,
            has_delay_info: false,
            delay_when_boarded: 0,
            current_delay: 0,
        }
    }

    fn walk(from: &str, to: &str, seconds: i64) -> Leg {
        Leg::Transfer(UsedTransfer {
            from: point(from),
            to: point(to),
            distance: 100,
            seconds,
        })
    }

    #[test]
    fn times_follow_trips_and_surrounding_walks() {
        let mut t = trip("T1", ("A", at(8, 5, 0)), ("B", at(8, 15, 0)));
        t.has_delay_info = true;
        t.delay_when_boarded = 30;
        t.current_delay = 60;
        let legs = vec![
            walk("S", "A", 90),
            Leg::Trip(t),
            walk("B", "C", 72),
            Leg::Bike(UsedBikeTrip {
                from: point("C"),
                to: point("D"),
                distance: 1000,
                seconds: 420,
            }),
        ];
        let it = Itinerary::new(legs, at(8, 0, 0), true);

        assert_eq!(it.seconds_before_first_trip(), 90);
        assert_eq!(it.seconds_after_last_trip(), 492);
        assert_eq!(it.departure, at(8, 4, 0));
        assert_eq!(it.arrival, at(8, 24, 12));
        assert_eq!(it.trip_alternatives.len(), 1);
        assert_eq!(it.trip_alternatives[0].alternatives[0].trip_id, "T1");
        assert_eq!(it.trip_alternatives[0].current, 0);
        assert!(it.starts_with_transfer());
        assert!(!it.ends_with_transfer());
    }

    #[test]
    fn walk_only_journeys_are_timed_from_begin() {
        let it = Itinerary::new(vec![walk("A", "B", 72)], at(8, 0, 0), true);
        assert_eq!((it.departure, it.arrival), (at(8, 0, 0), at(8, 1, 12)));

        let it = Itinerary::new(vec![walk("A", "B", 72)], at(8, 0, 0), false);
        assert_eq!((it.departure, it.arrival), (at(7, 58, 48), at(8, 0, 0)));
        assert_eq!(it.duration_secs(), 72);
    }

    #[test]
    fn legs_serialize_with_a_type_tag() {
        let json = serde_json::to_value(walk("A", "B", 72)).unwrap();
        assert_eq!(json["type"], "transfer");
        assert_eq!(json["from"]["id"], "A");
    }
}
