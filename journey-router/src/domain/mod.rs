//! Domain types shared by the network model and the planner.
//!
//! Everything here is small, `Copy` where possible, and validated at
//! construction time.

mod coords;
mod error;
mod ids;
mod route_point;
mod time;

pub use coords::Coordinates;
pub use error::DomainError;
pub use ids::{BikeStationIdx, BikeTransferIdx, RouteIdx, StopIdx, TransferIdx, TripIdx};
pub use route_point::{CustomPoint, RoutePoint};
pub use time::{
    StopTime, TimeError, parse_clock, shift, stop_times_from_clock, truncate_to_minute,
};
