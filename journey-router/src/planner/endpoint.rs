//! Search endpoints resolved against the current snapshot.

use super::Settings;
use crate::bikes::BikeModel;
use crate::domain::{Coordinates, CustomPoint, RoutePoint, StopIdx};
use crate::network::TransitModel;

/// One side of a connection search.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    /// Every stop carrying one name; any of them may start or end the
    /// journey.
    Stops(Vec<StopIdx>),
    /// A coordinate point, connected by walks to the stops (and, with shared
    /// bikes enabled, the bike stations) around it.
    Coordinates {
        point: CustomPoint,
        coords: Coordinates,
        access: Vec<(RoutePoint, u32)>,
    },
}

impl Endpoint {
    /// All stops named `name`, or `None` when there are none.
    pub fn by_name(network: &TransitModel, name: &str) -> Option<Self> {
        let stops = network.stops_by_name(name);
        (!stops.is_empty()).then(|| Endpoint::Stops(stops.to_vec()))
    }

    /// Points within walking distance of `coords`, or `None` when nothing is
    /// close enough.
    pub fn near(
        point: CustomPoint,
        coords: Coordinates,
        network: &TransitModel,
        bikes: &BikeModel,
        settings: &Settings,
    ) -> Option<Self> {
        let radius = settings.max_transfer_distance();
        let mut access: Vec<(RoutePoint, u32)> = network
            .stops_near(&coords, radius)
            .into_iter()
            .map(|(stop, d)| (RoutePoint::Stop(stop), d))
            .collect();
        if settings.use_shared_bikes {
            access.extend(
                bikes
                    .near_stations(&coords, radius)
                    .into_iter()
                    .map(|(station, d)| (RoutePoint::BikeStation(station), d)),
            );
        }
        (!access.is_empty()).then_some(Endpoint::Coordinates {
            point,
            coords,
            access,
        })
    }

    /// The stops and stations a journey may start or end at.
    pub fn points(&self) -> Vec<RoutePoint> {
        match self {
            Endpoint::Stops(stops) => stops.iter().copied().map(RoutePoint::Stop).collect(),
            Endpoint::Coordinates { access, .. } => access.iter().map(|&(p, _)| p).collect(),
        }
    }

    pub fn stops(&self) -> Vec<StopIdx> {
        self.points().into_iter().filter_map(RoutePoint::as_stop).collect()
    }

    pub fn custom_point(&self) -> Option<CustomPoint> {
        match self {
            Endpoint::Stops(_) => None,
            Endpoint::Coordinates { point, .. } => Some(*point),
        }
    }

    /// Coordinates of a coordinate endpoint.
    pub fn coords(&self) -> Option<Coordinates> {
        match self {
            Endpoint::Stops(_) => None,
            Endpoint::Coordinates { coords, .. } => Some(*coords),
        }
    }

    /// Walking distance between the coordinate point and `point`.
    pub fn access_distance(&self, point: RoutePoint) -> Option<u32> {
        match self {
            Endpoint::Stops(_) => None,
            Endpoint::Coordinates { access, .. } => {
                access.iter().find(|&&(p, _)| p == point).map(|&(_, d)| d)
            }
        }
    }

    pub fn contains(&self, point: RoutePoint) -> bool {
        match self {
            Endpoint::Stops(stops) => point.as_stop().is_some_and(|s| stops.contains(&s)),
            Endpoint::Coordinates { access, .. } => access.iter().any(|&(p, _)| p == point),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bikes::{BikeStation, StationDistanceMatrix};
    use crate::domain::BikeStationIdx;
    use crate::network::NetworkBuilder;

    fn network() -> TransitModel {
        let mut b = NetworkBuilder::new();
        b.add_stop("A1", "Alpha", Coordinates::new(50.0, 14.0)).unwrap();
        b.add_stop("A2", "Alpha", Coordinates::new(50.0001, 14.0)).unwrap();
        b.add_stop("F", "Far", Coordinates::new(50.1, 14.0)).unwrap();
        b.build()
    }

    fn bikes() -> BikeModel {
        let stations = vec![BikeStation::new("B1", "Dock", Coordinates::new(50.001, 14.0), 5)];
        BikeModel::new(stations, StationDistanceMatrix::new()).unwrap()
    }

    #[test]
    fn by_name_collects_every_platform() {
        let net = network();
        let e = Endpoint::by_name(&net, "Alpha").unwrap();
        assert_eq!(e.stops().len(), 2);
        assert_eq!(e.custom_point(), None);
        assert!(e.contains(RoutePoint::Stop(StopIdx(1))));
        assert!(Endpoint::by_name(&net, "Nowhere").is_none());
    }

    #[test]
    fn coordinates_reach_stations_only_with_bikes() {
        let net = network();
        let here = Coordinates::new(50.0, 14.0);
        let settings = Settings::default();
        let e = Endpoint::near(CustomPoint::Source, here, &net, &bikes(), &settings).unwrap();
        assert_eq!(e.points().len(), 2);
        assert_eq!(e.access_distance(RoutePoint::Stop(StopIdx(0))), Some(0));

        let with_bikes = Settings {
            use_shared_bikes: true,
            ..Settings::default()
        };
        let e = Endpoint::near(CustomPoint::Source, here, &net, &bikes(), &with_bikes).unwrap();
        assert!(e.contains(RoutePoint::BikeStation(BikeStationIdx(0))));
        assert_eq!(e.coords(), Some(here));
    }

    #[test]
    fn nothing_nearby() {
        let net = network();
        let nowhere = Coordinates::new(49.0, 14.0);
        assert!(
            Endpoint::near(CustomPoint::Destination, nowhere, &net, &bikes(), &Settings::default())
                .is_none()
        );
    }
}
