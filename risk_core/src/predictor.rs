//! Inference over a loaded bundle.
//!
//! Unseen categorical values fall back to `unknown`. When the encoder never
//! saw `unknown` during fit the classifier has no learned behaviour for it,
//! so the prediction is the worst case across that feature's known codes.

use crate::bundle::RiskModelBundle;
use crate::context::{TimeOfDay, Weather, FEATURE_TIME_OF_DAY, FEATURE_WEATHER};
use crate::encoder::{Encoded, LabelEncoder};
use crate::error::{Result, RiskError};
use tracing::debug;

/// Codes to evaluate for one categorical input.
fn candidate_codes(feature: &str, encoder: &LabelEncoder, value: &str) -> Result<Vec<u32>> {
    match encoder.encode(value) {
        Encoded::Known(code) => Ok(vec![code]),
        Encoded::Unknown if encoder.unknown_was_fitted() => Ok(vec![encoder.unknown_code()]),
        Encoded::Unknown => {
            if encoder.is_empty() {
                return Err(RiskError::BundleSchemaMismatch(format!(
                    "encoder for '{}' has an empty vocabulary",
                    feature
                )));
            }
            debug!(
                "{}='{}' not seen in training; using worst case over {} classes",
                feature,
                value,
                encoder.len()
            );
            Ok((0..encoder.len() as u32).collect())
        }
    }
}

/// Probability of an accident for one (speed, context) query, in [0, 1].
pub fn predict_risk(
    bundle: &RiskModelBundle,
    speed_kmh: f64,
    time_of_day: &str,
    weather: &str,
) -> Result<f64> {
    if !speed_kmh.is_finite() {
        return Err(RiskError::InvalidArgument(format!(
            "speed must be finite, got {}",
            speed_kmh
        )));
    }

    let time_codes = candidate_codes(
        FEATURE_TIME_OF_DAY,
        bundle.encoder(FEATURE_TIME_OF_DAY)?,
        time_of_day,
    )?;
    let weather_codes = candidate_codes(FEATURE_WEATHER, bundle.encoder(FEATURE_WEATHER)?, weather)?;

    let classifier = bundle.classifier();
    let mut worst: f64 = 0.0;
    for &t in &time_codes {
        for &w in &weather_codes {
            let row = [speed_kmh, f64::from(t), f64::from(w)];
            worst = worst.max(classifier.predict_proba(&row)?);
        }
    }
    Ok(worst.clamp(0.0, 1.0))
}

/// Typed variant of [`predict_risk`].
pub fn predict_context(
    bundle: &RiskModelBundle,
    speed_kmh: f64,
    time_of_day: TimeOfDay,
    weather: Weather,
) -> Result<f64> {
    predict_risk(bundle, speed_kmh, time_of_day.as_str(), weather.as_str())
}
