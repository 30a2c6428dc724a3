//! Web layer for the journey planner.
//!
//! JSON endpoints for connection searches, range searches and alternative
//! trips. Searches run on the blocking thread pool against the snapshot
//! current when the request arrived.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::create_router;
pub use state::AppState;
