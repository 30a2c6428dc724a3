//! Arena indices.
//!
//! The network is stored as flat vectors; every relation between stops,
//! routes, trips, transfers and bike stations is one of these indices.

use std::fmt;

macro_rules! arena_index {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub usize);

        impl $name {
            /// Position in the owning arena.
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

arena_index!(
    /// Index of a stop in the transit model.
    StopIdx
);
arena_index!(
    /// Index of a route in the transit model.
    RouteIdx
);
arena_index!(
    /// Index of a trip in the transit model.
    TripIdx
);
arena_index!(
    /// Index of a stop-to-stop transfer in the transit model.
    TransferIdx
);
arena_index!(
    /// Index of a bike station in the bike model.
    BikeStationIdx
);
arena_index!(
    /// Index of a stop/bike-station transfer in the bike model.
    BikeTransferIdx
);
