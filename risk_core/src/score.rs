//! Life-saving score: how much predicted risk a driver shed by slowing
//! down inside the risk zone.

use crate::bundle::RiskModelBundle;
use crate::context::{TimeOfDay, Weather, Zone};
use crate::error::{Result, RiskError};
use crate::generator::TripSample;
use crate::predictor::predict_context;
use serde::{Deserialize, Serialize};

const SCORE_SCALE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifeSavingScore {
    pub risk_before: f64,
    pub risk_inside: f64,
    pub delta_risk: f64,
    /// Percentage of the pre-zone risk removed; 0 when there was none
    pub percent_reduction: f64,
    pub score: f64,
    pub reduced_risk: bool,
}

pub fn score_from_risks(risk_before: f64, risk_inside: f64) -> LifeSavingScore {
    let delta_risk = risk_before - risk_inside;
    let percent_reduction = if risk_before > 0.0 {
        delta_risk / risk_before * 100.0
    } else {
        0.0
    };
    LifeSavingScore {
        risk_before,
        risk_inside,
        delta_risk,
        percent_reduction,
        score: (percent_reduction * SCORE_SCALE).max(0.0),
        reduced_risk: delta_risk > 0.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripScore {
    pub trip_id: String,
    pub user_id: String,
    pub hora_do_dia: TimeOfDay,
    pub clima: Weather,
    pub mean_speed_before: f64,
    pub mean_speed_inside: f64,
    #[serde(flatten)]
    pub score: LifeSavingScore,
}

fn mean_speed(trip: &[TripSample], zone: Zone) -> f64 {
    let (sum, n) = trip
        .iter()
        .filter(|s| s.zone == zone)
        .fold((0.0, 0usize), |(sum, n), s| (sum + s.speed_kmh, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Score one trip from its mean Control and Risk speeds.
pub fn score_trip(bundle: &RiskModelBundle, trip: &[TripSample]) -> Result<TripScore> {
    let first = trip
        .first()
        .ok_or_else(|| RiskError::InvalidArgument("cannot score an empty trip".to_string()))?;

    let mean_speed_before = mean_speed(trip, Zone::Control);
    let mean_speed_inside = mean_speed(trip, Zone::Risk);

    let risk_before = predict_context(bundle, mean_speed_before, first.hora_do_dia, first.clima)?;
    let risk_inside = predict_context(bundle, mean_speed_inside, first.hora_do_dia, first.clima)?;

    Ok(TripScore {
        trip_id: first.trip_id.clone(),
        user_id: first.user_id.clone(),
        hora_do_dia: first.hora_do_dia,
        clima: first.clima,
        mean_speed_before,
        mean_speed_inside,
        score: score_from_risks(risk_before, risk_inside),
    })
}
