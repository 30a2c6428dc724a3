//! JSON feeds the server loads its snapshot from.
//!
//! Three files: the network feed (stops, routes, trips, bike stations and
//! riding distances), an optional delay feed, and an optional live bike
//! count feed. The latter two are re-read periodically.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::bikes::{BikeModel, BikeStation, StationDistanceMatrix};
use crate::delay::DelayModel;
use crate::domain::{Coordinates, DomainError};
use crate::network::{MAX_TRANSFER_DISTANCE, NetworkBuilder, RouteInfo, TransitModel, VehicleType};

/// Errors loading a feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid feed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRecord {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub id: String,
    /// Line id shared by the route variants of one line; defaults to `id`.
    #[serde(default)]
    pub line_id: Option<String>,
    pub short_name: String,
    #[serde(default)]
    pub long_name: String,
    /// GTFS `route_type` code.
    pub route_type: u16,
    #[serde(default)]
    pub color: Option<String>,
    pub stops: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub id: String,
    pub route: String,
    pub service_dates: Vec<NaiveDate>,
    /// `(arrival, departure)` per stop as `HH:MM[:SS]`, hours past 23
    /// allowed for trips running past midnight.
    pub times: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub from: String,
    pub to: String,
    pub distance: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BikeStationRecord {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub bike_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationDistanceRecord {
    pub from: String,
    pub to: String,
    /// Riding distance in meters; negative when the router found no path.
    pub distance: i32,
}

/// The static network feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkFeed {
    pub stops: Vec<StopRecord>,
    pub routes: Vec<RouteRecord>,
    pub trips: Vec<TripRecord>,
    /// Extra transfers on top of the generated ones.
    pub transfers: Vec<TransferRecord>,
    /// Generate transfers between stops closer than this; `None` uses the
    /// network-wide maximum walk.
    pub transfer_distance: Option<u32>,
    pub bike_stations: Vec<BikeStationRecord>,
    pub station_distances: Vec<StationDistanceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripDelayRecord {
    pub trip_id: String,
    pub service_date: NaiveDate,
    /// `(arrival, departure)` delay in seconds per stop, in stop order.
    pub stops: Vec<(i64, i64)>,
}

/// The live delay feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelayFeed {
    #[serde(default)]
    pub trips: Vec<TripDelayRecord>,
}

/// The live bike count feed: bikes available per station id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BikeCountFeed {
    #[serde(default)]
    pub stations: HashMap<String, u32>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, FeedError> {
    let contents = std::fs::read_to_string(path).map_err(|source| FeedError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&contents)?)
}

impl NetworkFeed {
    pub fn from_path(path: &Path) -> Result<Self, FeedError> {
        read_json(path)
    }

    /// Assemble the transit network and the bike model linked to it.
    pub fn build(&self) -> Result<(TransitModel, BikeModel), FeedError> {
        let mut b = NetworkBuilder::new();
        for stop in &self.stops {
            b.add_stop(&stop.id, &stop.name, Coordinates::new(stop.lat, stop.lon))?;
        }
        for route in &self.routes {
            let vehicle_type = VehicleType::from_gtfs(route.route_type).unwrap_or(VehicleType::Bus);
            let info = RouteInfo {
                line_id: route.line_id.clone().unwrap_or_else(|| route.id.clone()),
                short_name: route.short_name.clone(),
                long_name: route.long_name.clone(),
                vehicle_type,
                color: route.color.clone(),
            };
            let stops: Vec<&str> = route.stops.iter().map(String::as_str).collect();
            b.add_route_with_info(&route.id, info, &stops)?;
        }
        for trip in &self.trips {
            let times: Vec<(&str, &str)> = trip
                .times
                .iter()
                .map(|(arr, dep)| (arr.as_str(), dep.as_str()))
                .collect();
            b.add_trip_from_clock(&trip.route, &trip.id, &trip.service_dates, &times)?;
        }

        let generated = b.connect_nearby_stops(self.transfer_distance.unwrap_or(MAX_TRANSFER_DISTANCE));
        for t in &self.transfers {
            b.add_transfer_pair(&t.from, &t.to, t.distance)?;
        }
        let network = b.build();

        let stations = self
            .bike_stations
            .iter()
            .map(|s| {
                let coords = Coordinates::new(s.lat, s.lon);
                if !coords.is_valid() {
                    return Err(DomainError::InvalidCoordinates { lat: s.lat, lon: s.lon });
                }
                let mut station = BikeStation::new(&s.id, &s.name, coords, s.capacity);
                station.bike_count = s.bike_count;
                Ok(station)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut distances = StationDistanceMatrix::new();
        for d in &self.station_distances {
            distances.add(&d.from, &d.to, d.distance);
        }
        let mut bikes = BikeModel::new(stations, distances)?;
        let bike_pairs = bikes.connect_stops(&network, MAX_TRANSFER_DISTANCE);

        info!(
            stops = network.stops().len(),
            routes = self.routes.len(),
            trips = network.trips().len(),
            generated_transfers = generated,
            bike_stations = bikes.station_count(),
            bike_transfers = bike_pairs,
            "network feed loaded"
        );
        Ok((network, bikes))
    }
}

impl DelayFeed {
    pub fn from_path(path: &Path) -> Result<Self, FeedError> {
        read_json(path)
    }

    pub fn build(&self) -> DelayModel {
        let mut model = DelayModel::new();
        for trip in &self.trips {
            for &(arrival, departure) in &trip.stops {
                model.add_delay(trip.service_date, &trip.trip_id, arrival, departure);
            }
        }
        debug!(trips = model.trip_count(), "delay feed loaded");
        model
    }
}

impl BikeCountFeed {
    pub fn from_path(path: &Path) -> Result<Self, FeedError> {
        read_json(path)
    }
}
