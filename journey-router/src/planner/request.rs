//! Connection requests and their validation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::endpoint::Endpoint;
use super::settings::{Settings, SettingsError};
use crate::domain::{Coordinates, CustomPoint};
use crate::snapshot::Snapshot;

/// Error from a connection search.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    #[error("date and time of the search are missing")]
    InvalidDateTime,

    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),

    #[error("source coordinates are out of range")]
    InvalidSourceCoordinates,

    #[error("destination coordinates are out of range")]
    InvalidDestinationCoordinates,

    #[error("source and destination coordinates are out of range")]
    InvalidBothCoordinates,

    #[error("no stops within walking distance of the source")]
    NoStopsNearSource,

    #[error("no stops within walking distance of the destination")]
    NoStopsNearDestination,

    #[error("no stops within walking distance of the source or the destination")]
    NoStopsNearBoth,

    #[error("unknown source stop {0:?}")]
    InvalidSourceStopName(String),

    #[error("unknown destination stop {0:?}")]
    InvalidDestinationStopName(String),

    #[error("unknown source and destination stops")]
    InvalidBothStopNames,

    #[error("source and destination are the same")]
    IdenticalEndpoints,

    #[error("search window must be non-empty and at most six hours long")]
    InvalidTimeWindow,

    #[error("no connection found")]
    NoConnectionFound,
}

impl SearchError {
    /// Stable code reported to clients.
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::InvalidDateTime => "InvalidDateTime",
            SearchError::InvalidSettings(_) => "InvalidSettings",
            SearchError::InvalidSourceCoordinates => "InvalidSourceCoordinates",
            SearchError::InvalidDestinationCoordinates => "InvalidDestinationCoordinates",
            SearchError::InvalidBothCoordinates => "InvalidBothCoordinates",
            SearchError::NoStopsNearSource => "NoStopsNearSource",
            SearchError::NoStopsNearDestination => "NoStopsNearDestination",
            SearchError::NoStopsNearBoth => "NoStopsNearBoth",
            SearchError::InvalidSourceStopName(_) => "InvalidSourceStopName",
            SearchError::InvalidDestinationStopName(_) => "InvalidDestinationStopName",
            SearchError::InvalidBothStopNames => "InvalidBothStopNames",
            SearchError::IdenticalEndpoints => "IdenticalEndpoints",
            SearchError::InvalidTimeWindow => "InvalidTimeWindow",
            SearchError::NoConnectionFound => "NoConnectionFound",
        }
    }
}

/// Where a journey starts or ends, as the client names it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Place {
    /// Every stop with this exact name.
    Stop { name: String },
    /// A point; connected to the stops around it by walking.
    Coordinates { lat: f64, lon: f64 },
}

impl Place {
    pub fn stop(name: impl Into<String>) -> Self {
        Place::Stop { name: name.into() }
    }

    fn coordinates(&self) -> Option<Coordinates> {
        match self {
            Place::Stop { .. } => None,
            Place::Coordinates { lat, lon } => Some(Coordinates::new(*lat, *lon)),
        }
    }
}

/// A connection search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub source: Place,
    pub destination: Place,
    /// Departure (earliest-departure search) or arrival (latest-arrival
    /// search) instant.
    pub date_time: Option<NaiveDateTime>,
    /// `true` departs at `date_time`, `false` arrives by it.
    #[serde(default = "default_true")]
    pub by_earliest_departure: bool,
    #[serde(default)]
    pub settings: Settings,
    /// Interchangeable earlier and later trips to attach to each trip leg.
    #[serde(default)]
    pub trip_alternatives: usize,
}

fn default_true() -> bool {
    true
}

/// A request whose endpoints were resolved against a snapshot.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub time: NaiveDateTime,
    pub forward: bool,
    pub source: Endpoint,
    pub destination: Endpoint,
}

impl ConnectionRequest {
    pub fn new(source: Place, destination: Place, date_time: NaiveDateTime) -> Self {
        Self {
            source,
            destination,
            date_time: Some(date_time),
            by_earliest_departure: true,
            settings: Settings::default(),
            trip_alternatives: 0,
        }
    }

    /// Check the request and resolve its endpoints.
    ///
    /// Checks run in a fixed order: date, settings, coordinates, stops near
    /// coordinates, stop names, and finally identical endpoints.
    pub fn validate(&self, snapshot: &Snapshot) -> Result<ValidatedRequest, SearchError> {
        let time = self.date_time.ok_or(SearchError::InvalidDateTime)?;
        self.settings.validate()?;

        let invalid = |place: &Place| place.coordinates().is_some_and(|c| !c.is_valid());
        match (invalid(&self.source), invalid(&self.destination)) {
            (true, true) => return Err(SearchError::InvalidBothCoordinates),
            (true, false) => return Err(SearchError::InvalidSourceCoordinates),
            (false, true) => return Err(SearchError::InvalidDestinationCoordinates),
            (false, false) => {}
        }

        let resolve = |place: &Place, point: CustomPoint| match place {
            Place::Stop { name } => Endpoint::by_name(&snapshot.network, name),
            Place::Coordinates { lat, lon } => Endpoint::near(
                point,
                Coordinates::new(*lat, *lon),
                &snapshot.network,
                &snapshot.bikes,
                &self.settings,
            ),
        };
        let source = resolve(&self.source, CustomPoint::Source);
        let destination = resolve(&self.destination, CustomPoint::Destination);

        let is_coords = |place: &Place| matches!(place, Place::Coordinates { .. });
        let near_missing = |place: &Place, found: &Option<Endpoint>| is_coords(place) && found.is_none();
        match (
            near_missing(&self.source, &source),
            near_missing(&self.destination, &destination),
        ) {
            (true, true) => return Err(SearchError::NoStopsNearBoth),
            (true, false) => return Err(SearchError::NoStopsNearSource),
            (false, true) => return Err(SearchError::NoStopsNearDestination),
            (false, false) => {}
        }

        let (source, destination) = match (source, destination, &self.source, &self.destination) {
            (Some(s), Some(d), _, _) => (s, d),
            (None, None, _, _) => return Err(SearchError::InvalidBothStopNames),
            (None, Some(_), Place::Stop { name }, _) => {
                return Err(SearchError::InvalidSourceStopName(name.clone()));
            }
            (Some(_), None, _, Place::Stop { name }) => {
                return Err(SearchError::InvalidDestinationStopName(name.clone()));
            }
            // coordinate endpoints were resolved above
            _ => return Err(SearchError::NoConnectionFound),
        };

        if self.source == self.destination {
            return Err(SearchError::IdenticalEndpoints);
        }

        Ok(ValidatedRequest {
            time,
            forward: self.by_earliest_departure,
            source,
            destination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bikes::BikeModel;
    use crate::delay::DelayModel;
    use crate::network::NetworkBuilder;
    use chrono::NaiveDate;

    fn snapshot() -> Snapshot {
        let mut b = NetworkBuilder::new();
        b.add_stop("A", "Alpha", Coordinates::new(50.0, 14.0)).unwrap();
        b.add_stop("B", "Beta", Coordinates::new(50.01, 14.0)).unwrap();
        Snapshot::new(b.build(), BikeModel::default(), DelayModel::new())
    }

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn request(source: Place, destination: Place) -> ConnectionRequest {
        ConnectionRequest::new(source, destination, at())
    }

    fn coords(lat: f64, lon: f64) -> Place {
        Place::Coordinates { lat, lon }
    }

    #[test]
    fn valid_request_resolves_both_sides() {
        let v = request(Place::stop("Alpha"), coords(50.01, 14.0))
            .validate(&snapshot())
            .unwrap();
        assert!(v.forward);
        assert_eq!(v.source.stops().len(), 1);
        assert_eq!(v.destination.custom_point(), Some(CustomPoint::Destination));
    }

    #[test]
    fn missing_date_comes_first() {
        let mut r = request(Place::stop("Nowhere"), Place::stop("Nowhere"));
        r.date_time = None;
        assert_eq!(r.validate(&snapshot()).unwrap_err(), SearchError::InvalidDateTime);
    }

    #[test]
    fn settings_are_checked() {
        let mut r = request(Place::stop("Alpha"), Place::stop("Beta"));
        r.settings.rounds = 0;
        assert_eq!(r.validate(&snapshot()).unwrap_err().code(), "InvalidSettings");
    }

    #[test]
    fn coordinate_errors() {
        let snap = snapshot();
        let cases = [
            (coords(91.0, 0.0), coords(0.0, 181.0), SearchError::InvalidBothCoordinates),
            (coords(91.0, 0.0), Place::stop("Beta"), SearchError::InvalidSourceCoordinates),
            (Place::stop("Alpha"), coords(0.0, 181.0), SearchError::InvalidDestinationCoordinates),
            (coords(10.0, 10.0), coords(11.0, 10.0), SearchError::NoStopsNearBoth),
            (coords(10.0, 10.0), Place::stop("Beta"), SearchError::NoStopsNearSource),
            (Place::stop("Alpha"), coords(10.0, 10.0), SearchError::NoStopsNearDestination),
        ];
        for (source, destination, expected) in cases {
            assert_eq!(request(source, destination).validate(&snap).unwrap_err(), expected);
        }
    }

    #[test]
    fn stop_name_errors() {
        let snap = snapshot();
        assert_eq!(
            request(Place::stop("X"), Place::stop("Y")).validate(&snap).unwrap_err(),
            SearchError::InvalidBothStopNames
        );
        assert_eq!(
            request(Place::stop("X"), Place::stop("Beta")).validate(&snap).unwrap_err(),
            SearchError::InvalidSourceStopName("X".into())
        );
        assert_eq!(
            request(Place::stop("Alpha"), Place::stop("Y")).validate(&snap).unwrap_err(),
            SearchError::InvalidDestinationStopName("Y".into())
        );
    }

    #[test]
    fn identical_endpoints() {
        let err = request(Place::stop("Alpha"), Place::stop("Alpha"))
            .validate(&snapshot())
            .unwrap_err();
        assert_eq!(err, SearchError::IdenticalEndpoints);
        assert_eq!(err.code(), "IdenticalEndpoints");
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{
            "source": {"kind": "stop", "name": "Alpha"},
            "destination": {"kind": "coordinates", "lat": 50.01, "lon": 14.0},
            "date_time": "2024-03-15T08:00:00"
        }"#;
        let r: ConnectionRequest = serde_json::from_str(json).unwrap();
        assert!(r.by_earliest_departure);
        assert_eq!(r.settings, Settings::default());
        assert_eq!(r.date_time, Some(at()));
    }
}
