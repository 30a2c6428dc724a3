//! HTTP route handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::cache::CacheKey;
use crate::planner::{
    AlternativesFinder, AlternativesRequest, ConnectionRequest, Planner, RangeRequest, ResultMode,
    SearchContext, SearchError, Settings, merge_range_results, plan_range,
};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/connection", post(connection))
        .route("/connection/range", post(connection_range))
        .route("/alternatives", post(alternatives))
        .with_state(state)
}

/// Health check endpoint.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.snapshots.current();
    Json(HealthResponse {
        status: "ok",
        generation: snapshot.generation,
        stops: snapshot.network.stops().len(),
    })
}

/// Parse JSON manually so we can log the body on failure.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, body = %String::from_utf8_lossy(body), "invalid request JSON");
        AppError::BadRequest {
            message: format!("Invalid JSON: {e}"),
        }
    })
}

fn connection_reply(response: &ConnectionResponse) -> Response {
    let status = if response.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    (status, Json(response)).into_response()
}

/// Best connection (or, with `trip_alternatives`, connections with
/// interchangeable trips attached).
async fn connection(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let req: ConnectionRequest = parse_body(&body)?;
    let snapshot = state.snapshots.current();
    let generation = snapshot.generation;
    let key = CacheKey::new("connection", &req, generation)?;
    if let Some(cached) = state.connections.get(&key).await {
        debug!(generation, "connection served from cache");
        return Ok(connection_reply(&cached));
    }

    let response = tokio::task::spawn_blocking(move || match Planner::new(&snapshot).search(&req) {
        Ok(result) => ConnectionResponse::found(&result.itineraries, result.generation),
        Err(e) => ConnectionResponse::failed(&e, generation),
    })
    .await?;

    let response = Arc::new(response);
    state.connections.insert(key, response.clone()).await;
    Ok(connection_reply(&response))
}

/// Connections for several departure (or arrival) instants, merged.
async fn connection_range(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let req: RangeRequest = parse_body(&body)?;
    let snapshot = state.snapshots.current();
    let generation = snapshot.generation;
    let key = CacheKey::new("range", &req, generation)?;
    if let Some(cached) = state.connections.get(&key).await {
        return Ok(connection_reply(&cached));
    }

    let plan = {
        let snapshot = snapshot.clone();
        let req = req.clone();
        tokio::task::spawn_blocking(move || plan_range(&snapshot, &req)).await?
    };
    let response = match plan {
        Err(e) => ConnectionResponse::failed(&e, generation),
        Ok(plan) => {
            let searches = plan.instants.iter().map(|&time| {
                let snapshot = snapshot.clone();
                let request = plan.request.clone();
                let settings = req.connection.settings.clone();
                tokio::task::spawn_blocking(move || {
                    Planner::new(&snapshot).run(&settings, &request, time, ResultMode::Viable)
                })
            });
            let results = join_all(searches)
                .await
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?;
            let merged = merge_range_results(results);
            debug!(
                searches = plan.instants.len(),
                results = merged.len(),
                "range search complete"
            );
            if merged.is_empty() {
                ConnectionResponse::failed(&SearchError::NoConnectionFound, generation)
            } else {
                ConnectionResponse::found(&merged, generation)
            }
        }
    };

    let response = Arc::new(response);
    state.connections.insert(key, response.clone()).await;
    Ok(connection_reply(&response))
}

/// Trips directly connecting two stops around an instant.
async fn alternatives(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let req: AlternativesRequest = parse_body(&body)?;
    let snapshot = state.snapshots.current();
    let key = CacheKey::new("alternatives", &req, snapshot.generation)?;
    let response = match state.alternatives.get(&key).await {
        Some(cached) => cached,
        None => {
            let response = tokio::task::spawn_blocking(move || {
                let settings = Settings::default();
                let ctx = SearchContext::new(&snapshot, &settings);
                match AlternativesFinder::new(ctx).find(&req) {
                    Ok(trips) => AlternativesResponse::found(trips),
                    Err(e) => AlternativesResponse::failed(&e),
                }
            })
            .await?;
            let response = Arc::new(response);
            state.alternatives.insert(key, response.clone()).await;
            response
        }
    };

    let status = if response.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    Ok((status, Json(&*response)).into_response())
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    Internal { message: String },
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal {
            message: e.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal {
            message: format!("search task failed: {e}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::Internal { message } => {
                error!(%message, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bikes::BikeModel;
    use crate::cache::CacheConfig;
    use crate::delay::DelayModel;
    use crate::domain::Coordinates;
    use crate::network::{NetworkBuilder, VehicleType};
    use crate::snapshot::{Snapshot, SnapshotHolder};
    use chrono::NaiveDate;
    use serde_json::{Value, json};

    fn state() -> AppState {
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let mut b = NetworkBuilder::new();
        b.add_stop("A", "Alpha", Coordinates::new(50.0, 14.0)).unwrap();
        b.add_stop("B", "Beta", Coordinates::new(50.02, 14.0)).unwrap();
        b.add_route("R1", "1", VehicleType::Bus, &["A", "B"]).unwrap();
        for (i, &dep) in ["08:05", "08:15", "08:25"].iter().enumerate() {
            let arr = format!("08:{}5", i + 2);
            b.add_trip_from_clock(
                "R1",
                &format!("T{i}"),
                &[day],
                &[(dep, dep), (arr.as_str(), arr.as_str())],
            )
            .unwrap();
        }
        let snapshot = Snapshot::new(b.build(), BikeModel::default(), DelayModel::new());
        AppState::new(Arc::new(SnapshotHolder::new(snapshot)), &CacheConfig::default())
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn body(value: Value) -> Bytes {
        Bytes::from(value.to_string())
    }

    fn connection_body(destination: &str) -> Value {
        json!({
            "source": {"kind": "stop", "name": "Alpha"},
            "destination": {"kind": "stop", "name": destination},
            "date_time": "2024-03-15T08:00:00"
        })
    }

    #[tokio::test]
    async fn health_reports_snapshot() {
        let Json(report) = health(State(state())).await;
        assert_eq!(report.status, "ok");
        assert_eq!(report.stops, 2);
    }

    #[tokio::test]
    async fn connection_found() {
        let response = connection(State(state()), body(connection_body("Beta")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["error"], "NoError");
        assert_eq!(json["itineraries"][0]["departure"], "2024-03-15T08:05:00");
        assert_eq!(json["itineraries"][0]["legs"][0]["trip_id"], "T0");
    }

    #[tokio::test]
    async fn connection_is_cached_per_generation() {
        let state = state();
        connection(State(state.clone()), body(connection_body("Beta")))
            .await
            .unwrap();

        let request: ConnectionRequest = serde_json::from_value(connection_body("Beta")).unwrap();
        let key = CacheKey::new("connection", &request, 0).unwrap();
        let cached = state.connections.get(&key).await.unwrap();
        assert_eq!(cached.error, NO_ERROR);

        let newer = CacheKey::new("connection", &request, 1).unwrap();
        assert!(state.connections.get(&newer).await.is_none());
    }

    #[tokio::test]
    async fn validation_errors_are_client_errors() {
        let response = connection(State(state()), body(connection_body("Nowhere")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "InvalidDestinationStopName");
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let err = connection(State(state()), Bytes::from_static(b"{\"source\":"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest { .. }));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn range_merges_searches() {
        let mut request = connection_body("Beta");
        request["window_minutes"] = json!(30);
        let response = connection_range(State(state()), body(request)).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json["error"], "NoError");
        assert_eq!(json["itineraries"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn range_reports_invalid_requests() {
        let mut request = connection_body("Nowhere");
        request["window_minutes"] = json!(30);
        let response = connection_range(State(state()), body(request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "InvalidDestinationStopName");
    }

    #[tokio::test]
    async fn alternatives_lists_trips() {
        let request = json!({
            "source_stop_id": "A",
            "destination_stop_id": "B",
            "date_time": "2024-03-15T08:00:00",
            "count": 2
        });
        let response = alternatives(State(state()), body(request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let ids: Vec<&str> = json["trips"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["trip_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, ["T0", "T1"]);
    }

    #[tokio::test]
    async fn alternatives_reports_bad_count() {
        let request = json!({
            "source_stop_id": "A",
            "destination_stop_id": "B",
            "date_time": "2024-03-15T08:00:00",
            "count": 0
        });
        let response = alternatives(State(state()), body(request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "InvalidCount");
    }
}
