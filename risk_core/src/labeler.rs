//! Ground-truth accident labels for training-set construction.
//! Never consulted at inference time.

use crate::context::{TimeOfDay, Weather};
use crate::generator::TripSample;

/// Speed treated as the top of the normalisation scale (km/h).
pub const MAX_SPEED_KMH: f64 = 150.0;

const LOGISTIC_SLOPE: f64 = 5.0;
const LOGISTIC_OFFSET: f64 = 2.0;

pub fn time_of_day_multiplier(time_of_day: TimeOfDay) -> f64 {
    match time_of_day {
        TimeOfDay::Dia => 1.0,
        TimeOfDay::Noite => 1.5,
        TimeOfDay::Crepusculo => 1.2,
    }
}

pub fn weather_multiplier(weather: Weather) -> f64 {
    match weather {
        Weather::Limpo => 1.0,
        Weather::Chuva => 1.4,
        Weather::Neblina => 1.8,
    }
}

/// Composite risk score before the logistic transform.
pub fn risk_score(speed_kmh: f64, time_of_day: TimeOfDay, weather: Weather) -> f64 {
    let normalized = speed_kmh / MAX_SPEED_KMH;
    normalized.powi(2) * time_of_day_multiplier(time_of_day) * weather_multiplier(weather)
}

pub fn accident_probability(speed_kmh: f64, time_of_day: TimeOfDay, weather: Weather) -> f64 {
    let risk = risk_score(speed_kmh, time_of_day, weather);
    1.0 / (1.0 + (-risk * LOGISTIC_SLOPE + LOGISTIC_OFFSET).exp())
}

/// 1 when the accident probability exceeds one half, else 0.
pub fn label(speed_kmh: f64, time_of_day: TimeOfDay, weather: Weather) -> u8 {
    u8::from(accident_probability(speed_kmh, time_of_day, weather) > 0.5)
}

pub fn label_sample(sample: &TripSample) -> u8 {
    label(sample.speed_kmh, sample.hora_do_dia, sample.clima)
}

pub fn label_samples(samples: &[TripSample]) -> Vec<u8> {
    samples.iter().map(label_sample).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_speed_day_clear() {
        // risk > 0.4  <=>  speed > 150 * sqrt(0.4) ~= 94.87
        assert_eq!(label(94.0, TimeOfDay::Dia, Weather::Limpo), 0);
        assert_eq!(label(96.0, TimeOfDay::Dia, Weather::Limpo), 1);
    }

    #[test]
    fn test_known_probability() {
        // speed 150 on a clear day: risk 1.0, p = 1 / (1 + e^-3)
        let p = accident_probability(150.0, TimeOfDay::Dia, Weather::Limpo);
        assert!((p - 1.0 / (1.0 + (-3.0f64).exp())).abs() < 1e-12);

        let p0 = accident_probability(0.0, TimeOfDay::Noite, Weather::Neblina);
        assert!((p0 - 1.0 / (1.0 + 2.0f64.exp())).abs() < 1e-12);
    }

    #[test]
    fn test_multipliers_compose() {
        let base = risk_score(100.0, TimeOfDay::Dia, Weather::Limpo);
        let foggy_night = risk_score(100.0, TimeOfDay::Noite, Weather::Neblina);
        assert!((foggy_night - base * 1.5 * 1.8).abs() < 1e-12);
    }

    #[test]
    fn test_context_monotonicity() {
        for speed in (0..=160).step_by(5).map(f64::from) {
            for w in Weather::ALL {
                let day = accident_probability(speed, TimeOfDay::Dia, w);
                assert!(accident_probability(speed, TimeOfDay::Noite, w) >= day);
                assert!(accident_probability(speed, TimeOfDay::Crepusculo, w) >= day);
            }
            for t in TimeOfDay::ALL {
                let clear = accident_probability(speed, t, Weather::Limpo);
                let rain = accident_probability(speed, t, Weather::Chuva);
                let fog = accident_probability(speed, t, Weather::Neblina);
                assert!(fog >= rain && rain >= clear);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        for _ in 0..5 {
            assert_eq!(
                label(88.3, TimeOfDay::Noite, Weather::Chuva),
                label(88.3, TimeOfDay::Noite, Weather::Chuva)
            );
        }
    }
}
