//! Animal-crossing risk scoring.
//!
//! Synthetic trips are labelled by a ground-truth risk function, a gradient
//! boosted classifier is trained on (speed, time of day, weather), and the
//! persisted bundle answers risk queries for the life-saving score.

pub mod bundle;
pub mod config;
pub mod context;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod gbm;
pub mod generator;
pub mod labeler;
pub mod predictor;
pub mod score;
pub mod store;
pub mod trainer;
pub mod zone;

pub use bundle::RiskModelBundle;
pub use config::RiskConfig;
pub use context::{TimeOfDay, Weather, Zone};
pub use error::{Result, RiskError};
pub use gbm::{GbmClassifier, GbmParams};
pub use generator::{generate, group_trips, TripGenerator, TripSample};
pub use predictor::{predict_context, predict_risk};
pub use score::{score_from_risks, score_trip, LifeSavingScore, TripScore};
pub use store::{load_or_train, FileModelStore, ModelHandle, ModelStore};
pub use trainer::{TrainedModel, Trainer};
pub use zone::RiskZone;
