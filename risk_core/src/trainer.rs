use crate::bundle::RiskModelBundle;
use crate::config::RiskConfig;
use crate::dataset::{fit_encoders, stratified_split, Dataset};
use crate::error::Result;
use crate::gbm::GbmClassifier;
use crate::generator::TripGenerator;
use crate::labeler::label_samples;
use crate::store::ModelStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

/// Outcome of one training run.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub bundle: RiskModelBundle,
    /// Held-out accuracy; informational only
    pub test_accuracy: f64,
    /// Share of positive labels in the generated data
    pub positive_rate: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

pub struct Trainer {
    config: RiskConfig,
}

impl Trainer {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Generate, label, encode, split and fit. Same seed and trip count
    /// give the same model.
    pub fn train(&self, num_trips: usize) -> Result<TrainedModel> {
        let seed = self.config.seed;
        let mut rng = StdRng::seed_from_u64(seed);

        info!("Generating {} trips for training", num_trips);
        let samples = TripGenerator::new(self.config.zone.clone()).generate(num_trips, &mut rng)?;
        let targets = label_samples(&samples);

        let encoders = fit_encoders(&samples);
        let data = Dataset::from_samples(&samples, targets, &encoders)?;
        info!(
            "Labelled {} samples, positive rate {:.3}",
            data.len(),
            data.positive_rate()
        );

        let (train_idx, test_idx) = stratified_split(&data.targets, self.config.test_fraction, seed)?;
        let train = data.subset(&train_idx);
        let test = data.subset(&test_idx);

        let classifier = GbmClassifier::fit(&train.rows, &train.targets, self.config.gbm_params())?;
        let test_accuracy = classifier.accuracy(&test.rows, &test.targets)?;
        info!("Model accuracy on held-out split: {:.2}", test_accuracy);

        Ok(TrainedModel {
            bundle: RiskModelBundle::new(classifier, encoders)?,
            test_accuracy,
            positive_rate: data.positive_rate(),
            train_rows: train.len(),
            test_rows: test.len(),
        })
    }

    /// Train and write the bundle to `store`.
    pub fn train_and_persist(&self, store: &dyn ModelStore, num_trips: usize) -> Result<TrainedModel> {
        let trained = self.train(num_trips)?;
        store.save(&trained.bundle)?;
        info!("Model saved to {}", store.location());
        Ok(trained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RiskError;
    use crate::gbm::GbmParams;

    fn quick_config() -> RiskConfig {
        RiskConfig {
            gbm: GbmParams {
                n_estimators: 30,
                ..GbmParams::default()
            },
            ..RiskConfig::default()
        }
    }

    #[test]
    fn test_train_reports_split() {
        let trained = Trainer::new(quick_config()).train(120).unwrap();
        assert_eq!(trained.train_rows + trained.test_rows, 120 * 15);
        assert!(trained.test_accuracy > 0.8);
        assert!(trained.positive_rate > 0.0 && trained.positive_rate < 1.0);
        assert!(trained.bundle.validate().is_ok());
    }

    #[test]
    fn test_zero_trips_rejected() {
        let err = Trainer::new(quick_config()).train(0).unwrap_err();
        assert!(matches!(err, RiskError::InvalidArgument(_)));
    }
}
