//! Ordering and deduplication of merged search results.
//!
//! Range searches run several independent searches whose results overlap;
//! these helpers turn the union into one clean list.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDateTime;

use super::result::{Itinerary, Leg};

/// Rank itineraries.
///
/// Itineraries are ranked by:
/// 1. Departure time (earlier first)
/// 2. Arrival time (earlier first)
/// 3. Number of vehicle legs (fewer first)
pub fn rank_itineraries(mut itineraries: Vec<Itinerary>) -> Vec<Itinerary> {
    itineraries.sort_by(compare);
    itineraries
}

fn compare(a: &Itinerary, b: &Itinerary) -> Ordering {
    a.departure
        .cmp(&b.departure)
        .then(a.arrival.cmp(&b.arrival))
        .then(vehicle_legs(a).cmp(&vehicle_legs(b)))
}

fn vehicle_legs(it: &Itinerary) -> usize {
    it.trip_count() + it.bike_trip_count()
}

/// What makes two itineraries the same journey: the same times and the
/// same sequence of rides and walks.
type Signature = (NaiveDateTime, NaiveDateTime, Vec<String>);

fn signature(it: &Itinerary) -> Signature {
    let legs = it
        .legs
        .iter()
        .map(|leg| match leg {
            Leg::Trip(t) => format!("trip:{}@{}", t.trip_id, t.service_date),
            Leg::Transfer(t) => format!("walk:{}>{}", t.from.id, t.to.id),
            Leg::Bike(b) => format!("bike:{}>{}", b.from.id, b.to.id),
        })
        .collect();
    (it.departure, it.arrival, legs)
}

/// Drop itineraries identical to an earlier one, keeping the first.
pub fn deduplicate(itineraries: Vec<Itinerary>) -> Vec<Itinerary> {
    let mut seen = HashSet::new();
    itineraries
        .into_iter()
        .filter(|it| seen.insert(signature(it)))
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::planner::result::tests::{at, trip};
    use proptest::prelude::*;

    prop_compose! {
        fn itinerary()(id in 0u8..4, dep in 0u32..120, ride in 1u32..60) -> Itinerary {
            let dep_at = at(8 + dep / 60, dep % 60, 0);
            let arr = dep + ride;
            let arr_at = at(8 + arr / 60, arr % 60, 0);
            let t = trip(&format!("T{id}"), ("A", dep_at), ("B", arr_at));
            Itinerary::new(vec![Leg::Trip(t)], dep_at, true)
        }
    }

    proptest! {
        #[test]
        fn ranked_output_is_sorted(its in prop::collection::vec(itinerary(), 0..12)) {
            let len = its.len();
            let ranked = rank_itineraries(its);
            prop_assert_eq!(ranked.len(), len);
            for w in ranked.windows(2) {
                prop_assert!((w[0].departure, w[0].arrival) <= (w[1].departure, w[1].arrival));
            }
        }

        #[test]
        fn deduplicated_output_has_unique_signatures(its in prop::collection::vec(itinerary(), 0..12)) {
            let result = deduplicate(its);
            let unique: HashSet<_> = result.iter().map(signature).collect();
            prop_assert_eq!(unique.len(), result.len());
        }
    }
}
