//! Synthetic trip telemetry.
//!
//! Each trip gets one (time of day, weather) context drawn up front. The
//! context shifts the free-flow speed and the chance the driver slows down
//! once the risk-zone alert fires.

use crate::context::{TimeOfDay, Weather, Zone};
use crate::error::{Result, RiskError};
use crate::zone::{RiskZone, ROAD_LONGITUDE};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::distributions::WeightedIndex;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONTROL_SAMPLES: usize = 5;
pub const RISK_SAMPLES: usize = 10;

const SAMPLE_INTERVAL_S: i64 = 2;
const RISK_OFFSET_S: i64 = 10;
const LAT_STEP: f64 = 0.0001;
const SPEED_STD_KMH: f64 = 5.0;

const BASE_REACTION_PROB: f64 = 0.7;

/// One telemetry point. Field names match the trip data set columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSample {
    pub trip_id: String,
    pub user_id: String,
    pub timestamp: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    /// Speed in km/h, never negative
    pub speed_kmh: f64,
    pub zone: Zone,
    pub hora_do_dia: TimeOfDay,
    pub clima: Weather,
}

/// Per-trip draws before the samples are emitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripPlan {
    pub time_of_day: TimeOfDay,
    pub weather: Weather,
    /// Baseline speed before the zone (km/h)
    pub speed_before: f64,
    /// Whether the driver reacted to the alert
    pub reacted: bool,
    /// Speed inside the zone (km/h)
    pub speed_inside: f64,
}

/// Probability that a driver slows down for the zone alert.
pub fn reaction_probability(time_of_day: TimeOfDay, weather: Weather) -> f64 {
    let mut p = BASE_REACTION_PROB;
    if time_of_day == TimeOfDay::Noite {
        p += 0.1;
    }
    if weather == Weather::Chuva {
        p -= 0.1;
    }
    p.clamp(0.0, 1.0)
}

pub struct TripGenerator {
    zone: RiskZone,
    start: NaiveDateTime,
    time_dist: WeightedIndex<f64>,
    weather_dist: WeightedIndex<f64>,
}

impl TripGenerator {
    pub fn new(zone: RiskZone) -> Self {
        // Weights are constant and positive
        let time_dist = WeightedIndex::new(TimeOfDay::ALL.iter().map(|t| t.weight()))
            .expect("time-of-day weights are valid");
        let weather_dist = WeightedIndex::new(Weather::ALL.iter().map(|w| w.weight()))
            .expect("weather weights are valid");

        Self {
            zone,
            start: trip_start(),
            time_dist,
            weather_dist,
        }
    }

    pub fn zone(&self) -> &RiskZone {
        &self.zone
    }

    /// Draw the context and speeds for one trip.
    pub fn plan_trip<R: Rng + ?Sized>(&self, rng: &mut R) -> TripPlan {
        let time_of_day = TimeOfDay::ALL[self.time_dist.sample(rng)];
        let weather = Weather::ALL[self.weather_dist.sample(rng)];

        let speed_before = if time_of_day == TimeOfDay::Noite || weather == Weather::Chuva {
            rng.gen_range(70.0..100.0)
        } else {
            rng.gen_range(90.0..120.0)
        };

        let reacted = rng.gen_bool(reaction_probability(time_of_day, weather));
        let speed_inside = if reacted {
            speed_before * rng.gen_range(0.6..0.85)
        } else {
            speed_before * rng.gen_range(0.98..1.05)
        };

        TripPlan {
            time_of_day,
            weather,
            speed_before,
            reacted,
            speed_inside,
        }
    }

    /// Generate `num_trips` trips of 5 Control + 10 Risk samples each.
    pub fn generate<R: Rng + ?Sized>(&self, num_trips: usize, rng: &mut R) -> Result<Vec<TripSample>> {
        if num_trips == 0 {
            return Err(RiskError::InvalidArgument(
                "num_trips must be at least 1".to_string(),
            ));
        }

        let mut samples = Vec::with_capacity(num_trips * (CONTROL_SAMPLES + RISK_SAMPLES));
        for i in 1..=num_trips {
            let plan = self.plan_trip(rng);
            self.emit_trip(i, &plan, rng, &mut samples)?;
        }

        debug!(
            "generated {} trips ({} samples) for zone {}",
            num_trips,
            samples.len(),
            self.zone.id
        );
        Ok(samples)
    }

    fn emit_trip<R: Rng + ?Sized>(
        &self,
        index: usize,
        plan: &TripPlan,
        rng: &mut R,
        out: &mut Vec<TripSample>,
    ) -> Result<()> {
        let trip_id = format!("trip_{}", index);
        let user_id = format!("user_{}", index);

        for (zone, speed, num_points) in [
            (Zone::Control, plan.speed_before, CONTROL_SAMPLES),
            (Zone::Risk, plan.speed_inside, RISK_SAMPLES),
        ] {
            let noise = Normal::new(speed, SPEED_STD_KMH)
                .map_err(|e| RiskError::InvalidArgument(format!("speed {}: {}", speed, e)))?;

            for j in 0..num_points {
                let (offset_s, latitude) = match zone {
                    Zone::Control => (
                        SAMPLE_INTERVAL_S * j as i64,
                        self.zone.start_lat + LAT_STEP * j as f64,
                    ),
                    Zone::Risk => (
                        RISK_OFFSET_S + SAMPLE_INTERVAL_S * j as i64,
                        self.zone.start_lat - LAT_STEP * j as f64,
                    ),
                };

                out.push(TripSample {
                    trip_id: trip_id.clone(),
                    user_id: user_id.clone(),
                    timestamp: self.start + Duration::seconds(offset_s),
                    latitude,
                    longitude: ROAD_LONGITUDE,
                    speed_kmh: noise.sample(rng).max(0.0),
                    zone,
                    hora_do_dia: plan.time_of_day,
                    clima: plan.weather,
                });
            }
        }
        Ok(())
    }
}

impl Default for TripGenerator {
    fn default() -> Self {
        Self::new(RiskZone::default())
    }
}

/// Generate trips around the default risk zone.
pub fn generate<R: Rng + ?Sized>(num_trips: usize, rng: &mut R) -> Result<Vec<TripSample>> {
    TripGenerator::default().generate(num_trips, rng)
}

/// Split a flat sample list into per-trip slices, in first-seen order.
/// Samples of one trip are expected to be contiguous, as `generate` emits them.
pub fn group_trips(samples: &[TripSample]) -> Vec<&[TripSample]> {
    let mut trips = Vec::new();
    let mut start = 0;
    for i in 1..=samples.len() {
        if i == samples.len() || samples[i].trip_id != samples[start].trip_id {
            if i > start {
                trips.push(&samples[start..i]);
            }
            start = i;
        }
    }
    trips
}

fn trip_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 9, 26)
        .and_then(|d| d.and_hms_opt(10, 0, 0))
        .expect("fixed trip start is a valid datetime")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_zero_trips_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = generate(0, &mut rng).unwrap_err();
        assert!(matches!(err, RiskError::InvalidArgument(_)));
    }

    #[test]
    fn test_trip_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let samples = generate(40, &mut rng).unwrap();
        assert_eq!(samples.len(), 40 * 15);

        let trips = group_trips(&samples);
        assert_eq!(trips.len(), 40);
        for trip in trips {
            let control = trip.iter().filter(|s| s.zone == Zone::Control).count();
            let risk = trip.iter().filter(|s| s.zone == Zone::Risk).count();
            assert_eq!(control, 5);
            assert_eq!(risk, 10);

            let first = &trip[0];
            assert!(trip
                .iter()
                .all(|s| s.hora_do_dia == first.hora_do_dia && s.clima == first.clima));
            assert!(trip.iter().all(|s| s.user_id == first.user_id));
        }
    }

    #[test]
    fn test_speed_never_negative() {
        let mut rng = StdRng::seed_from_u64(99);
        let samples = generate(300, &mut rng).unwrap();
        assert!(samples.iter().all(|s| s.speed_kmh >= 0.0));
    }

    #[test]
    fn test_timestamps_and_coordinates() {
        let mut rng = StdRng::seed_from_u64(3);
        let samples = generate(1, &mut rng).unwrap();
        let start = trip_start();

        assert_eq!(samples[0].trip_id, "trip_1");
        assert_eq!(samples[0].user_id, "user_1");
        assert_eq!(samples[0].timestamp, start);
        assert_eq!(samples[4].timestamp, start + Duration::seconds(8));
        assert_eq!(samples[5].timestamp, start + Duration::seconds(10));
        assert_eq!(samples[14].timestamp, start + Duration::seconds(28));

        assert!((samples[1].latitude - (-23.55 + 0.0001)).abs() < 1e-12);
        assert!((samples[6].latitude - (-23.55 - 0.0001)).abs() < 1e-12);
        assert!(samples.iter().all(|s| s.longitude == ROAD_LONGITUDE));
    }

    #[test]
    fn test_plan_respects_context_rules() {
        let generator = TripGenerator::default();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..2000 {
            let plan = generator.plan_trip(&mut rng);
            let cautious = plan.time_of_day == TimeOfDay::Noite || plan.weather == Weather::Chuva;
            if cautious {
                assert!(plan.speed_before >= 70.0 && plan.speed_before < 100.0);
            } else {
                assert!(plan.speed_before >= 90.0 && plan.speed_before < 120.0);
            }

            let ratio = plan.speed_inside / plan.speed_before;
            if plan.reacted {
                assert!((0.6..0.85).contains(&ratio));
            } else {
                assert!((0.98..1.05).contains(&ratio));
            }
        }
    }

    #[test]
    fn test_reaction_probability() {
        assert!((reaction_probability(TimeOfDay::Dia, Weather::Limpo) - 0.7).abs() < 1e-12);
        assert!((reaction_probability(TimeOfDay::Noite, Weather::Limpo) - 0.8).abs() < 1e-12);
        assert!((reaction_probability(TimeOfDay::Dia, Weather::Chuva) - 0.6).abs() < 1e-12);
        assert!((reaction_probability(TimeOfDay::Noite, Weather::Chuva) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_same_seed_same_data() {
        let a = generate(25, &mut StdRng::seed_from_u64(5)).unwrap();
        let b = generate(25, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(a, b);
    }
}
