use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use journey_router::config::ServerConfig;
use journey_router::feed::{BikeCountFeed, DelayFeed, FeedError, NetworkFeed};
use journey_router::snapshot::{Snapshot, SnapshotHolder};
use journey_router::web::{AppState, create_router};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Re-read `path` every `period` and hand the parsed feed to `publish`.
/// Failed reads keep the current snapshot.
fn spawn_refresh<T, F>(name: &'static str, path: PathBuf, period: Duration, publish: F)
where
    T: FeedFile + Send + 'static,
    F: Fn(T) + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // First tick is immediate, skip it
        loop {
            interval.tick().await;
            let path = path.clone();
            match tokio::task::spawn_blocking(move || T::read(&path)).await {
                Ok(Ok(feed)) => publish(feed),
                Ok(Err(e)) => warn!(feed = name, error = %e, "feed refresh failed"),
                Err(e) => warn!(feed = name, error = %e, "feed refresh task failed"),
            }
        }
    });
}

trait FeedFile: Sized {
    fn read(path: &Path) -> Result<Self, FeedError>;
}

impl FeedFile for DelayFeed {
    fn read(path: &Path) -> Result<Self, FeedError> {
        DelayFeed::from_path(path)
    }
}

impl FeedFile for BikeCountFeed {
    fn read(path: &Path) -> Result<Self, FeedError> {
        BikeCountFeed::from_path(path)
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env().expect("Invalid server configuration");

    let feed = NetworkFeed::from_path(&config.feed).expect("Failed to read network feed");
    let (network, mut bikes) = feed.build().expect("Invalid network feed");

    let delays = match &config.delays {
        Some(path) => DelayFeed::from_path(path)
            .map(|d| d.build())
            .unwrap_or_else(|e| {
                warn!(error = %e, "starting without delays");
                Default::default()
            }),
        None => Default::default(),
    };
    if let Some(path) = &config.bikes {
        match BikeCountFeed::from_path(path) {
            Ok(counts) => bikes = bikes.with_bike_counts(&counts.stations),
            Err(e) => warn!(error = %e, "starting without live bike counts"),
        }
    }

    let snapshots = Arc::new(SnapshotHolder::new(Snapshot::new(network, bikes, delays)));

    if let Some(path) = config.delays.clone() {
        let holder = snapshots.clone();
        spawn_refresh("delays", path, config.delay_refresh, move |feed: DelayFeed| {
            holder.replace_delays(feed.build());
        });
    }
    if let Some(path) = config.bikes.clone() {
        let holder = snapshots.clone();
        spawn_refresh("bikes", path, config.bike_refresh, move |feed: BikeCountFeed| {
            let current = holder.current();
            holder.replace_bikes(current.bikes.with_bike_counts(&feed.stations));
        });
    }

    let state = AppState::new(snapshots, &config.cache);
    let app = create_router(state);

    info!(addr = %config.addr, "journey router listening");
    info!("  GET  /health            - Health check");
    info!("  POST /connection        - Best connection");
    info!("  POST /connection/range  - Connections over a time range");
    info!("  POST /alternatives      - Trips between two stops");

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, app).await.expect("Server error");
}
