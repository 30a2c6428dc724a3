//! Data transfer objects for web requests and responses.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::planner::{AlternativesError, Itinerary, Leg, SearchError, TripAlternatives, UsedTrip};

/// Error code reported with successful responses.
pub const NO_ERROR: &str = "NoError";

/// An itinerary as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ItineraryResult {
    /// Departure from the source, `YYYY-MM-DDTHH:MM:SS`
    pub departure: String,

    /// Arrival at the destination
    pub arrival: String,

    /// Total duration in minutes
    pub duration_mins: i64,

    /// Number of vehicle changes
    pub changes: usize,

    pub legs: Vec<Leg>,

    /// Alternatives per trip leg, in leg order
    pub trip_alternatives: Vec<TripAlternatives>,
}

impl ItineraryResult {
    pub fn from_itinerary(itinerary: &Itinerary) -> Self {
        let vehicles = itinerary.trip_count() + itinerary.bike_trip_count();
        Self {
            departure: format_time(&itinerary.departure),
            arrival: format_time(&itinerary.arrival),
            duration_mins: itinerary.duration_secs() / 60,
            changes: vehicles.saturating_sub(1),
            legs: itinerary.legs.clone(),
            trip_alternatives: itinerary.trip_alternatives.clone(),
        }
    }
}

/// Response for connection and range searches.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionResponse {
    /// [`NO_ERROR`] or the search error code
    pub error: &'static str,

    /// Human-readable error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Snapshot generation the search ran against
    pub generation: u64,

    pub itineraries: Vec<ItineraryResult>,
}

impl ConnectionResponse {
    pub fn found(itineraries: &[Itinerary], generation: u64) -> Self {
        Self {
            error: NO_ERROR,
            message: None,
            generation,
            itineraries: itineraries.iter().map(ItineraryResult::from_itinerary).collect(),
        }
    }

    pub fn failed(error: &SearchError, generation: u64) -> Self {
        Self {
            error: error.code(),
            message: Some(error.to_string()),
            generation,
            itineraries: Vec::new(),
        }
    }

    /// Whether the request itself was at fault.
    pub fn is_client_error(&self) -> bool {
        self.error != NO_ERROR && self.error != SearchError::NoConnectionFound.code()
    }
}

/// Response for alternative trip queries.
#[derive(Debug, Clone, Serialize)]
pub struct AlternativesResponse {
    pub error: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub trips: Vec<UsedTrip>,
}

impl AlternativesResponse {
    pub fn found(trips: Vec<UsedTrip>) -> Self {
        Self {
            error: NO_ERROR,
            message: None,
            trips,
        }
    }

    pub fn failed(error: &AlternativesError) -> Self {
        Self {
            error: error.code(),
            message: Some(error.to_string()),
            trips: Vec::new(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.error != NO_ERROR && self.error != AlternativesError::NoTripsFound.code()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub generation: u64,
    pub stops: usize,
}

/// Error response for requests that never reached the planner.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn format_time(time: &NaiveDateTime) -> String {
    time.format("%Y-%m-%dT%H:%M:%S").to_string()
}
