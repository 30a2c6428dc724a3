//! Scheduled vehicle runs.

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::{RouteIdx, StopTime};

/// One run of a vehicle along its route's stop pattern.
///
/// `stop_times[i]` is the call at the route's `i`-th stop. A trip carries no
/// calendar date of its own; the route lists it under every service date it
/// operates on.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    /// External trip id, also the key for live delay lookups.
    pub id: String,
    pub route: RouteIdx,
    pub stop_times: Vec<StopTime>,
}

impl Trip {
    /// Scheduled departure from the `stop_index`-th stop for a run that
    /// started on `service_date`.
    pub fn departure_at(&self, stop_index: usize, service_date: NaiveDate) -> NaiveDateTime {
        self.stop_times[stop_index].departure_at(service_date)
    }

    /// Scheduled arrival at the `stop_index`-th stop for a run that started
    /// on `service_date`.
    pub fn arrival_at(&self, stop_index: usize, service_date: NaiveDate) -> NaiveDateTime {
        self.stop_times[stop_index].arrival_at(service_date)
    }

    /// Seconds after midnight of the service date at which the run leaves its
    /// first stop; trips on a route are ordered by this.
    pub fn first_departure_secs(&self) -> i64 {
        self.stop_times
            .first()
            .map(|st| st.departure_offset_secs())
            .unwrap_or_default()
    }
}
