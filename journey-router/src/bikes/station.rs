//! Shared-bike stations and the walks connecting them to stops.

use crate::domain::{BikeStationIdx, BikeTransferIdx, Coordinates, RoutePoint, StopIdx};

/// A dock of a shared-bike system.
#[derive(Debug, Clone, PartialEq)]
pub struct BikeStation {
    pub id: String,
    pub name: String,
    pub coords: Coordinates,
    pub capacity: u32,
    /// Live number of bikes available to rent.
    pub bike_count: u32,
    /// Walks from this station to nearby stops.
    pub transfers: Vec<BikeTransferIdx>,
}

impl BikeStation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, coords: Coordinates, capacity: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coords,
            capacity,
            bike_count: 0,
            transfers: Vec::new(),
        }
    }

    pub fn has_bikes(&self) -> bool {
        self.bike_count > 0
    }
}

/// Which way a [`BikeTransfer`] walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BikeTransferKind {
    /// Stop to station.
    ToStation,
    /// Station to stop.
    FromStation,
}

/// A walk between a stop and a bike station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BikeTransfer {
    pub stop: StopIdx,
    pub station: BikeStationIdx,
    pub kind: BikeTransferKind,
    pub distance: u32,
    pub opposite: Option<BikeTransferIdx>,
}

impl BikeTransfer {
    pub fn source(&self) -> RoutePoint {
        match self.kind {
            BikeTransferKind::ToStation => RoutePoint::Stop(self.stop),
            BikeTransferKind::FromStation => RoutePoint::BikeStation(self.station),
        }
    }

    pub fn target(&self) -> RoutePoint {
        match self.kind {
            BikeTransferKind::ToStation => RoutePoint::BikeStation(self.station),
            BikeTransferKind::FromStation => RoutePoint::Stop(self.stop),
        }
    }
}
