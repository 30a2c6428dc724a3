//! Connection search entry point.
//!
//! Validates a request, runs the round search against one snapshot and
//! extracts the best itinerary (or every viable one).

use chrono::NaiveDateTime;
use tracing::debug;

use super::alternatives::{MAX_ALTERNATIVES, fill_trip_alternatives};
use super::endpoint::Endpoint;
use super::extract::ResultBuilder;
use super::request::{ConnectionRequest, SearchError, ValidatedRequest};
use super::result::Itinerary;
use super::route_finder::{RouteFinder, SearchContext};
use super::search_model::SearchModel;
use super::settings::Settings;
use crate::snapshot::Snapshot;

/// Which results to extract from a converged search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultMode {
    /// Only the best comfort-adjusted result.
    Best,
    /// Every round result close to the best one.
    Viable,
}

/// Result of a connection search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Found itineraries; a single one unless viable results were asked for.
    pub itineraries: Vec<Itinerary>,

    /// Generation of the snapshot the search ran against.
    pub generation: u64,
}

/// Runs connection searches against one snapshot.
pub struct Planner<'a> {
    snapshot: &'a Snapshot,
}

impl<'a> Planner<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self { snapshot }
    }

    /// Find the best connection.
    pub fn search(&self, request: &ConnectionRequest) -> Result<SearchResult, SearchError> {
        self.search_with(request, ResultMode::Best)
    }

    /// Find the best connection and every other round result within a few
    /// minutes of it.
    pub fn search_viable(&self, request: &ConnectionRequest) -> Result<SearchResult, SearchError> {
        self.search_with(request, ResultMode::Viable)
    }

    pub fn search_with(
        &self,
        request: &ConnectionRequest,
        mode: ResultMode,
    ) -> Result<SearchResult, SearchError> {
        let validated = request.validate(self.snapshot)?;
        let mut itineraries = self.run(&request.settings, &validated, validated.time, mode);
        if itineraries.is_empty() {
            return Err(SearchError::NoConnectionFound);
        }

        if request.trip_alternatives > 0 {
            let ctx = SearchContext::new(self.snapshot, &request.settings);
            let count = request.trip_alternatives.min(MAX_ALTERNATIVES);
            for it in &mut itineraries {
                fill_trip_alternatives(ctx, it, count);
            }
        }

        Ok(SearchResult {
            itineraries,
            generation: self.snapshot.generation,
        })
    }

    /// Run one search for an already validated request at `time`.
    pub fn run(
        &self,
        settings: &Settings,
        request: &ValidatedRequest,
        time: NaiveDateTime,
        mode: ResultMode,
    ) -> Vec<Itinerary> {
        let ctx = SearchContext::new(self.snapshot, settings);
        let model = self.converge(ctx, request.forward, time, &request.source, &request.destination);
        let builder = ResultBuilder::new(ctx, &model);
        let itineraries = match mode {
            ResultMode::Best => builder.best_result().into_iter().collect(),
            ResultMode::Viable => builder.viable_alternatives(),
        };
        debug!(
            forward = request.forward,
            %time,
            results = itineraries.len(),
            "search complete"
        );
        itineraries
    }

    /// Run the round loop and return the converged model.
    pub fn converge(
        &self,
        ctx: SearchContext<'_>,
        forward: bool,
        time: NaiveDateTime,
        source: &Endpoint,
        destination: &Endpoint,
    ) -> SearchModel {
        RouteFinder::run(ctx, forward, time, source, destination)
    }
}
