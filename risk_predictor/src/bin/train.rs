//! Retrain the risk model and overwrite the persisted bundle.
//!
//! Reads the same `CONFIG_PATH` / `MODEL_PATH` / `TRAINING_TRIPS` /
//! `RISK_SEED` settings as the service.

use anyhow::Context;
use risk_core::{FileModelStore, RiskConfig, Trainer};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = RiskConfig::from_env().context("failed to read configuration")?;
    let store = FileModelStore::new(config.model_path.clone());
    let trips = config.training_trips;

    let trained = Trainer::new(config)
        .train_and_persist(&store, trips)
        .context("training failed")?;

    println!(
        "accuracy={:.2} positive_rate={:.3} train_rows={} test_rows={} model={}",
        trained.test_accuracy,
        trained.positive_rate,
        trained.train_rows,
        trained.test_rows,
        store.path().display()
    );
    Ok(())
}
