//! Journey planner using round-based search.
//!
//! This module answers: "what is the best way from here to there, leaving
//! at (or arriving by) this time?"
//!
//! Each round extends the journeys found so far by one more vehicle (a trip
//! or a shared bike) and then by walking transfers, so round `k` knows the
//! best journeys with at most `k` vehicles. The same code runs forward
//! (earliest arrival) and backward (latest departure).

mod alternatives;
mod comparator;
mod endpoint;
mod extract;
mod range;
mod rank;
mod request;
mod result;
mod route_finder;
mod search;
mod search_model;
mod settings;


pub use alternatives::{
    AlternativesError, AlternativesFinder, AlternativesRequest, MAX_ALTERNATIVES,
    fill_trip_alternatives,
};
pub use comparator::{IndexComparator, TimeComparator};
pub use endpoint::Endpoint;
pub use extract::{ResultBuilder, RoundResult};
pub use range::{RangePlan, RangeRequest, merge as merge_range_results, plan as plan_range, search_range};
pub use rank::{deduplicate, rank_itineraries};
pub use request::{ConnectionRequest, Place, SearchError, ValidatedRequest};
pub use result::{
    Itinerary, Leg, PointInfo, StopPass, TripAlternatives, UsedBikeTrip, UsedTransfer, UsedTrip,
};
pub use route_finder::{RouteFinder, SearchContext};
pub use search::{Planner, ResultMode, SearchResult};
pub use search_model::{CustomTransfer, Reach, SearchModel, TransferRef};
pub use settings::{
    BikeTripBuffer, ComfortBalance, MAX_BIKE_TRIP_SECONDS, Settings, SettingsError,
    TransferBuffer, WalkingPreference,
};
