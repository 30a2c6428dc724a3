//! Transit stops.

use crate::domain::{Coordinates, RouteIdx, TransferIdx};

/// A physical boarding point of the transit network.
///
/// Stops sharing a name form a node (e.g. all platforms of one station) and
/// are interchangeable as search endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub coords: Coordinates,
    /// Routes whose stop pattern contains this stop.
    pub routes: Vec<RouteIdx>,
    /// Outgoing pedestrian transfers.
    pub transfers: Vec<TransferIdx>,
}

impl Stop {
    pub fn new(id: impl Into<String>, name: impl Into<String>, coords: Coordinates) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coords,
            routes: Vec::new(),
            transfers: Vec::new(),
        }
    }
}
