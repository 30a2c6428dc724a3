//! Shared bikes: stations, riding distances and live availability.

mod distance;
mod model;
mod station;

pub use distance::{StationDistanceMatrix, UNREACHABLE};
pub use model::BikeModel;
pub use station::{BikeStation, BikeTransfer, BikeTransferKind};
