//! Domain error types.
//!
//! These errors represent inconsistencies found while assembling the network
//! arenas. They are distinct from request validation and IO errors.

/// Domain-level errors for network construction and lookups.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// A referenced stop id does not exist
    #[error("unknown stop id: {0}")]
    UnknownStop(String),

    /// A referenced route id does not exist
    #[error("unknown route id: {0}")]
    UnknownRoute(String),

    /// A referenced bike station id does not exist
    #[error("unknown bike station id: {0}")]
    UnknownBikeStation(String),

    /// Two objects share an id that must be unique
    #[error("duplicate id: {0}")]
    DuplicateId(String),

    /// A trip's stop times don't line up with its route's stop pattern
    #[error("trip {trip} has {actual} stop times but route pattern has {expected} stops")]
    StopCountMismatch {
        trip: String,
        expected: usize,
        actual: usize,
    },

    /// A route must serve at least two stops
    #[error("route {0} has fewer than two stops")]
    RouteTooShort(String),

    /// The stop is not part of the route's stop pattern
    #[error("stop {stop} is not served by route {route}")]
    StopNotOnRoute { stop: String, route: String },

    /// Coordinates out of range
    #[error("invalid coordinates: lat {lat}, lon {lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    /// A trip-time window that is empty, inverted or too long
    #[error("invalid time window: {0}")]
    InvalidTimeWindow(&'static str),

    /// Bad clock string in the feed
    #[error(transparent)]
    Time(#[from] super::time::TimeError),
}
