use risk_core::{TimeOfDay, Weather};
use serde::{Deserialize, Serialize};

// Labels stay free-form strings: unseen values are scored, not rejected.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub speed_kmh: f64,
    pub hora_do_dia: String,
    pub clima: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct PredictionOut {
    pub t: i64,
    pub speed_kmh: f64,
    pub hora_do_dia: String,
    pub clima: String,
    pub probability: f64,
}

#[derive(Debug, Serialize, Clone)]
pub struct TripSummary {
    pub trip_id: String,
    pub user_id: String,
    pub hora_do_dia: TimeOfDay,
    pub clima: Weather,
    pub samples: usize,
}
