//! Live delay snapshot.
//!
//! Delays are keyed by the trip's service date and external trip id, and
//! hold one (arrival, departure) sample per stop of the trip. A snapshot is
//! never mutated after it is published; refreshes build a new one.

use std::collections::HashMap;

use chrono::NaiveDate;

/// Samples below this many seconds are treated as feed errors.
const IMPLAUSIBLE_DELAY_SECS: i64 = -600;

/// Delay of one trip at one stop, in seconds (negative when early).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StopDelay {
    pub arrival: i64,
    pub departure: i64,
}

impl StopDelay {
    fn is_plausible(&self) -> bool {
        self.arrival >= IMPLAUSIBLE_DELAY_SECS && self.departure >= IMPLAUSIBLE_DELAY_SECS
    }
}

/// Ordered per-stop delay samples for one run of a trip.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TripStopDelays {
    samples: Vec<StopDelay>,
}

impl TripStopDelays {
    pub fn push(&mut self, arrival: i64, departure: i64) {
        self.samples.push(StopDelay { arrival, departure });
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Delay at the `stop_index`-th stop of the trip.
    ///
    /// Realtime feeds sometimes stop reporting before the end of a trip, so
    /// an index past the last sample yields the last sample. Implausible
    /// samples yield `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use journey_router::delay::{StopDelay, TripStopDelays};
    ///
    /// let mut d = TripStopDelays::default();
    /// d.push(60, 90);
    /// d.push(-700, 0);
    /// assert_eq!(d.stop_delay(0), Some(StopDelay { arrival: 60, departure: 90 }));
    /// assert_eq!(d.stop_delay(1), None);
    /// // trailing stops reuse the last sample, implausible or not
    /// assert_eq!(d.stop_delay(5), None);
    /// ```
    pub fn stop_delay(&self, stop_index: usize) -> Option<StopDelay> {
        let sample = self.samples.get(stop_index).or_else(|| self.samples.last())?;
        sample.is_plausible().then_some(*sample)
    }
}

/// Delay lookup by (service date, trip id, stop index).
#[derive(Debug, Clone, Default)]
pub struct DelayModel {
    delays: HashMap<NaiveDate, HashMap<String, TripStopDelays>>,
}

impl DelayModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next stop's sample for a trip run.
    pub fn add_delay(&mut self, service_date: NaiveDate, trip_id: &str, arrival: i64, departure: i64) {
        self.delays
            .entry(service_date)
            .or_default()
            .entry(trip_id.to_string())
            .or_default()
            .push(arrival, departure);
    }

    /// All samples for a trip run, if the feed reported it at all.
    pub fn trip_delays(&self, service_date: NaiveDate, trip_id: &str) -> Option<&TripStopDelays> {
        self.delays.get(&service_date)?.get(trip_id)
    }

    /// Delay at one stop. `None` means "use the timetable".
    pub fn delay(&self, service_date: NaiveDate, trip_id: &str, stop_index: usize) -> Option<StopDelay> {
        self.trip_delays(service_date, trip_id)?
            .stop_delay(stop_index)
    }

    /// Number of trip runs with delay data.
    pub fn trip_count(&self) -> usize {
        self.delays.values().map(HashMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn missing_trip_has_no_data() {
        let model = DelayModel::new();
        assert!(model.trip_delays(date(), "T1").is_none());
        assert!(model.delay(date(), "T1", 0).is_none());
        assert_eq!(model.trip_count(), 0);
    }

    #[test]
    fn samples_are_per_stop_in_order() {
        let mut model = DelayModel::new();
        model.add_delay(date(), "T1", 0, 30);
        model.add_delay(date(), "T1", 45, 60);

        assert_eq!(
            model.delay(date(), "T1", 1),
            Some(StopDelay { arrival: 45, departure: 60 })
        );
        assert_eq!(model.trip_delays(date(), "T1").map(TripStopDelays::len), Some(2));
        assert_eq!(model.trip_count(), 1);
    }

    #[test]
    fn service_dates_are_separate() {
        let mut model = DelayModel::new();
        model.add_delay(date(), "T1", 120, 120);
        let next = date().succ_opt().unwrap();
        assert!(model.delay(next, "T1", 0).is_none());
    }

    #[test]
    fn trailing_stops_use_last_sample() {
        let mut model = DelayModel::new();
        model.add_delay(date(), "T1", 10, 20);
        model.add_delay(date(), "T1", 30, 40);
        assert_eq!(
            model.delay(date(), "T1", 7),
            Some(StopDelay { arrival: 30, departure: 40 })
        );
    }

    #[test]
    fn implausible_sample_is_no_data() {
        let mut model = DelayModel::new();
        model.add_delay(date(), "T1", 0, -601);
        assert!(model.delay(date(), "T1", 0).is_none());

        model.add_delay(date(), "T2", -600, -600);
        assert!(model.delay(date(), "T2", 0).is_some());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any index resolves to a stored sample or to nothing, never to a
        /// value that was not pushed.
        #[test]
        fn lookup_returns_a_stored_sample(
            samples in prop::collection::vec((-900i64..900, -900i64..900), 1..20),
            index in 0usize..40,
        ) {
            let mut delays = TripStopDelays::default();
            for &(a, d) in &samples {
                delays.push(a, d);
            }
            let expected = samples[index.min(samples.len() - 1)];
            match delays.stop_delay(index) {
                Some(found) => {
                    prop_assert_eq!((found.arrival, found.departure), expected);
                    prop_assert!(found.arrival >= -600 && found.departure >= -600);
                }
                None => prop_assert!(expected.0 < -600 || expected.1 < -600),
            }
        }
    }
}
