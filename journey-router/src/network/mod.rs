//! The static transit network: stops, routes, trips and walking transfers.
//!
//! Everything here is immutable once built. Relations between objects are
//! arena indices, so a whole network can be swapped out by replacing one
//! value.

mod builder;
mod model;
mod route;
mod stop;
mod transfer;
mod trip;

pub use builder::{ForbiddenCrossing, MAX_TRANSFER_DISTANCE, NetworkBuilder};
pub use model::TransitModel;
pub use route::{Route, RouteInfo, VehicleType};
pub use stop::Stop;
pub use transfer::Transfer;
pub use trip::Trip;
