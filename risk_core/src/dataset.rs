use crate::context::{FEATURE_NAMES, FEATURE_TIME_OF_DAY, FEATURE_WEATHER};
use crate::encoder::LabelEncoder;
use crate::error::{Result, RiskError};
use crate::generator::TripSample;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Categorical encoders keyed by feature column name.
pub type Encoders = BTreeMap<String, LabelEncoder>;

/// Encoded feature matrix with its binary targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<u8>,
}

/// Fit one encoder per categorical column over the observed labels.
pub fn fit_encoders(samples: &[TripSample]) -> Encoders {
    let mut encoders = Encoders::new();
    encoders.insert(
        FEATURE_TIME_OF_DAY.to_string(),
        LabelEncoder::fit(samples.iter().map(|s| s.hora_do_dia.as_str())),
    );
    encoders.insert(
        FEATURE_WEATHER.to_string(),
        LabelEncoder::fit(samples.iter().map(|s| s.clima.as_str())),
    );
    encoders
}

fn encoder<'a>(encoders: &'a Encoders, name: &str) -> Result<&'a LabelEncoder> {
    encoders
        .get(name)
        .ok_or_else(|| RiskError::BundleSchemaMismatch(format!("missing encoder for '{}'", name)))
}

impl Dataset {
    pub fn from_samples(samples: &[TripSample], targets: Vec<u8>, encoders: &Encoders) -> Result<Self> {
        if samples.len() != targets.len() {
            return Err(RiskError::InvalidArgument(format!(
                "{} samples but {} targets",
                samples.len(),
                targets.len()
            )));
        }
        let time_enc = encoder(encoders, FEATURE_TIME_OF_DAY)?;
        let weather_enc = encoder(encoders, FEATURE_WEATHER)?;

        let rows = samples
            .iter()
            .map(|s| {
                vec![
                    s.speed_kmh,
                    f64::from(time_enc.transform(s.hora_do_dia.as_str())),
                    f64::from(weather_enc.transform(s.clima.as_str())),
                ]
            })
            .collect();

        Ok(Self {
            feature_names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            rows,
            targets,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn positive_rate(&self) -> f64 {
        if self.targets.is_empty() {
            return 0.0;
        }
        self.targets.iter().filter(|&&t| t == 1).count() as f64 / self.targets.len() as f64
    }

    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            feature_names: self.feature_names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }
}

/// Split row indices into (train, test), keeping the class balance of
/// `targets` in both halves. Each class is shuffled with `seed`.
pub fn stratified_split(targets: &[u8], test_fraction: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(RiskError::InvalidArgument(format!(
            "test_fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let mut by_class: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (i, &t) in targets.iter().enumerate() {
        by_class.entry(t).or_default().push(i);
    }
    if by_class.len() < 2 {
        return Err(RiskError::TrainingFailed(format!(
            "stratified split needs two classes, found {}",
            by_class.len()
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(targets.len());
    let mut test = Vec::new();

    for (class, mut members) in by_class {
        if members.len() < 2 {
            return Err(RiskError::TrainingFailed(format!(
                "class {} has {} member(s); stratified split needs at least 2",
                class,
                members.len()
            )));
        }
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64 * test_fraction).round() as usize).clamp(1, members.len() - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate;
    use crate::labeler::label_samples;

    #[test]
    fn test_split_preserves_balance() {
        let targets: Vec<u8> = (0..1000).map(|i| u8::from(i % 4 == 0)).collect();
        let (train, test) = stratified_split(&targets, 0.2, 42).unwrap();

        assert_eq!(train.len() + test.len(), 1000);
        assert_eq!(test.len(), 200);
        let test_pos = test.iter().filter(|&&i| targets[i] == 1).count();
        assert_eq!(test_pos, 50);

        let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..1000).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_seeded() {
        let targets: Vec<u8> = (0..300).map(|i| u8::from(i % 3 == 0)).collect();
        assert_eq!(
            stratified_split(&targets, 0.2, 7).unwrap(),
            stratified_split(&targets, 0.2, 7).unwrap()
        );
        assert_ne!(
            stratified_split(&targets, 0.2, 7).unwrap(),
            stratified_split(&targets, 0.2, 8).unwrap()
        );
    }

    #[test]
    fn test_split_rejects_degenerate_targets() {
        assert!(matches!(
            stratified_split(&[1, 1, 1, 1], 0.2, 1),
            Err(RiskError::TrainingFailed(_))
        ));
        assert!(matches!(
            stratified_split(&[0, 0, 0, 1], 0.2, 1),
            Err(RiskError::TrainingFailed(_))
        ));
        assert!(matches!(
            stratified_split(&[0, 1, 0, 1], 1.0, 1),
            Err(RiskError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_dataset_encodes_context() {
        let mut rng = StdRng::seed_from_u64(21);
        let samples = generate(30, &mut rng).unwrap();
        let targets = label_samples(&samples);
        let encoders = fit_encoders(&samples);
        let data = Dataset::from_samples(&samples, targets, &encoders).unwrap();

        assert_eq!(data.len(), samples.len());
        assert_eq!(data.feature_names, vec!["speed_kmh", "hora_do_dia", "clima"]);
        for (row, s) in data.rows.iter().zip(&samples) {
            assert_eq!(row[0], s.speed_kmh);
            let tod = encoders[FEATURE_TIME_OF_DAY].decode(row[1] as u32).unwrap();
            assert_eq!(tod, s.hora_do_dia.as_str());
        }
    }
}
