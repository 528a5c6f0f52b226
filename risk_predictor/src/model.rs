use anyhow::{bail, Context, Result};
use risk_core::{predict_risk, ModelHandle, RiskConfig, RiskModelBundle};
use std::sync::Arc;

/// Load (or train) the bundle behind `handle` off the async runtime, then
/// probe it with one query so a broken bundle fails at start-up.
pub async fn warm_up(handle: Arc<ModelHandle>) -> Result<Arc<RiskModelBundle>> {
    let bundle = tokio::task::spawn_blocking(move || handle.get())
        .await
        .context("model loading task panicked")?
        .context("failed to load or train the risk model")?;

    let p = predict_risk(&bundle, 100.0, "dia", "limpo").context("warmup prediction failed")?;
    if !(0.0..=1.0).contains(&p) {
        bail!("warmup produced probability {} outside [0, 1]", p);
    }
    tracing::info!(
        "warmup ok: p(100 km/h, dia, limpo) = {:.3}; trained_at {}",
        p,
        bundle.trained_at()
    );
    Ok(bundle)
}

pub fn handle_from_env() -> Result<(Arc<ModelHandle>, RiskConfig)> {
    let config = RiskConfig::from_env().context("failed to read configuration")?;
    tracing::info!(
        "model store {}; {} training trips, seed {}",
        config.model_path.display(),
        config.training_trips,
        config.seed
    );
    Ok((Arc::new(ModelHandle::from_config(config.clone())), config))
}
