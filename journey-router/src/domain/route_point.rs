//! Route points: anything a reach time can be recorded for.

use std::fmt;

use super::ids::{BikeStationIdx, StopIdx};

/// An ad-hoc coordinate endpoint of a single search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CustomPoint {
    Source,
    Destination,
}

impl CustomPoint {
    pub fn name(self) -> &'static str {
        match self {
            CustomPoint::Source => "Source",
            CustomPoint::Destination => "Destination",
        }
    }
}

/// A stop, a bike station or a coordinate endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoutePoint {
    Stop(StopIdx),
    BikeStation(BikeStationIdx),
    Custom(CustomPoint),
}

impl RoutePoint {
    pub fn as_stop(self) -> Option<StopIdx> {
        match self {
            RoutePoint::Stop(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bike_station(self) -> Option<BikeStationIdx> {
        match self {
            RoutePoint::BikeStation(b) => Some(b),
            _ => None,
        }
    }
}

impl From<StopIdx> for RoutePoint {
    fn from(s: StopIdx) -> Self {
        RoutePoint::Stop(s)
    }
}

impl From<BikeStationIdx> for RoutePoint {
    fn from(b: BikeStationIdx) -> Self {
        RoutePoint::BikeStation(b)
    }
}

impl fmt::Display for RoutePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutePoint::Stop(s) => write!(f, "{s}"),
            RoutePoint::BikeStation(b) => write!(f, "{b}"),
            RoutePoint::Custom(c) => write!(f, "{}", c.name()),
        }
    }
}
