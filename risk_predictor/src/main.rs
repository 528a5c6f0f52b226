use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json,
};
use rand::{rngs::StdRng, SeedableRng};
use risk_core::{
    group_trips, predict_risk, score_trip, ModelHandle, RiskError, TripGenerator, TripSample,
    TripScore,
};
use serde_json::json;
use std::{sync::Arc, time::{SystemTime, UNIX_EPOCH}};
use tracing_subscriber::EnvFilter;

mod model;
mod types;

use types::{PredictRequest, PredictionOut, TripSummary};

type ApiError = (StatusCode, Json<serde_json::Value>);

// ---------- Server state ----------

#[derive(Clone)]
struct AppState {
    model: Arc<ModelHandle>,
    trips: Arc<Vec<TripSample>>, // browsing data set, generated once
}

// ---------- Error mapping ----------

fn api_error(e: RiskError) -> ApiError {
    let status = match e {
        RiskError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": e.to_string() })))
}

fn not_found(trip_id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("no trip '{}'", trip_id) })),
    )
}

fn find_trip<'a>(trips: &'a [TripSample], trip_id: &str) -> Option<&'a [TripSample]> {
    group_trips(trips).into_iter().find(|t| t[0].trip_id == trip_id)
}

// ---------- Handlers ----------

async fn predict(
    State(state): State<AppState>,
    Json(payload): Json<PredictRequest>,
) -> Result<Json<PredictionOut>, ApiError> {
    if std::env::var("LOG_PRED").ok().as_deref() == Some("1") {
        tracing::info!(
            "recv speed={:.1} hora_do_dia={} clima={}",
            payload.speed_kmh, payload.hora_do_dia, payload.clima
        );
    }

    let bundle = state.model.get().map_err(api_error)?;
    let probability = predict_risk(&bundle, payload.speed_kmh, &payload.hora_do_dia, &payload.clima)
        .map_err(api_error)?;

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default();
    Ok(Json(PredictionOut {
        t: now_ms,
        speed_kmh: payload.speed_kmh,
        hora_do_dia: payload.hora_do_dia,
        clima: payload.clima,
        probability,
    }))
}

async fn list_trips(State(state): State<AppState>) -> Json<Vec<TripSummary>> {
    let trips = group_trips(&state.trips)
        .into_iter()
        .map(|t| TripSummary {
            trip_id: t[0].trip_id.clone(),
            user_id: t[0].user_id.clone(),
            hora_do_dia: t[0].hora_do_dia,
            clima: t[0].clima,
            samples: t.len(),
        })
        .collect();
    Json(trips)
}

async fn trip_samples(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<Vec<TripSample>>, ApiError> {
    find_trip(&state.trips, &trip_id)
        .map(|t| Json(t.to_vec()))
        .ok_or_else(|| not_found(&trip_id))
}

async fn trip_score(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<TripScore>, ApiError> {
    let trip = find_trip(&state.trips, &trip_id).ok_or_else(|| not_found(&trip_id))?;
    let bundle = state.model.get().map_err(api_error)?;
    let score = score_trip(&bundle, trip).map_err(api_error)?;
    Ok(Json(score))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port: u16 = std::env::var("PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(8080);
    let (handle, config) = model::handle_from_env()?;

    // Pay any training cost before accepting requests
    model::warm_up(Arc::clone(&handle)).await?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let trips = TripGenerator::new(config.zone.clone()).generate(config.browse_trips, &mut rng)?;
    tracing::info!("generated {} browsing trips ({} samples)", config.browse_trips, trips.len());

    let state = AppState {
        model: handle,
        trips: Arc::new(trips),
    };

    let app = axum::Router::new()
        .route("/predict", post(predict))
        .route("/trips", get(list_trips))
        .route("/trips/:trip_id", get(trip_samples))
        .route("/trips/:trip_id/score", get(trip_score))
        .with_state(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
