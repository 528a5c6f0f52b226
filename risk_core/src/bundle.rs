use crate::context::{FEATURE_NAMES, FEATURE_TIME_OF_DAY, FEATURE_WEATHER};
use crate::dataset::Encoders;
use crate::encoder::LabelEncoder;
use crate::error::{Result, RiskError};
use crate::gbm::GbmClassifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Trained classifier paired with the encoders it was fit against.
/// The unit of persistence; read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskModelBundle {
    format_version: u32,
    feature_names: Vec<String>,
    classifier: GbmClassifier,
    encoders: Encoders,
    trained_at: DateTime<Utc>,
}

impl RiskModelBundle {
    pub fn new(classifier: GbmClassifier, encoders: Encoders) -> Result<Self> {
        let bundle = Self {
            format_version: BUNDLE_FORMAT_VERSION,
            feature_names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            classifier,
            encoders,
            trained_at: Utc::now(),
        };
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn classifier(&self) -> &GbmClassifier {
        &self.classifier
    }

    pub fn encoders(&self) -> &Encoders {
        &self.encoders
    }

    pub fn encoder(&self, feature: &str) -> Result<&LabelEncoder> {
        self.encoders.get(feature).ok_or_else(|| {
            RiskError::BundleSchemaMismatch(format!("bundle has no encoder for '{}'", feature))
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Reject bundles written by incompatible code.
    pub fn validate(&self) -> Result<()> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            return Err(RiskError::BundleSchemaMismatch(format!(
                "format version {} (expected {})",
                self.format_version, BUNDLE_FORMAT_VERSION
            )));
        }
        if self.feature_names != FEATURE_NAMES {
            return Err(RiskError::BundleSchemaMismatch(format!(
                "feature order {:?} (expected {:?})",
                self.feature_names, FEATURE_NAMES
            )));
        }
        for feature in [FEATURE_TIME_OF_DAY, FEATURE_WEATHER] {
            let enc = self.encoder(feature)?;
            if enc.is_empty() || !enc.is_well_formed() {
                return Err(RiskError::BundleSchemaMismatch(format!(
                    "encoder for '{}' is empty or malformed",
                    feature
                )));
            }
        }
        if self.classifier.n_features() != FEATURE_NAMES.len() {
            return Err(RiskError::BundleSchemaMismatch(format!(
                "classifier expects {} features (expected {})",
                self.classifier.n_features(),
                FEATURE_NAMES.len()
            )));
        }
        if !self.classifier.is_well_formed() {
            return Err(RiskError::BundleSchemaMismatch(
                "classifier trees are malformed".to_string(),
            ));
        }
        Ok(())
    }
}
