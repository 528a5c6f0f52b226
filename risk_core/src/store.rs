//! Persistence of the model bundle and the train-or-load path.

use crate::bundle::RiskModelBundle;
use crate::config::RiskConfig;
use crate::error::{Result, RiskError};
use crate::trainer::Trainer;
use parking_lot::Mutex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Durable home of a single model bundle.
pub trait ModelStore: Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<RiskModelBundle>>;

    fn save(&self, bundle: &RiskModelBundle) -> Result<()>;

    /// Human-readable location, for logs.
    fn location(&self) -> String;
}

/// Bundle stored as one JSON file.
#[derive(Debug, Clone)]
pub struct FileModelStore {
    path: PathBuf,
}

impl FileModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, reason: impl ToString) -> RiskError {
        RiskError::ModelStoreCorrupt {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl ModelStore for FileModelStore {
    fn load(&self) -> Result<Option<RiskModelBundle>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => return Err(self.corrupt(e)),
            Err(e) => return Err(e.into()),
        };

        let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| self.corrupt(e))?;
        let bundle: RiskModelBundle = serde_json::from_value(value)
            .map_err(|e| RiskError::BundleSchemaMismatch(format!("{}: {}", self.path.display(), e)))?;
        bundle.validate()?;
        Ok(Some(bundle))
    }

    fn save(&self, bundle: &RiskModelBundle) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(bundle)
            .map_err(|e| RiskError::InvalidArgument(format!("cannot serialise bundle: {}", e)))?;

        // Readers only ever see a complete file.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Return the persisted bundle, or train and persist one when the store is empty.
pub fn load_or_train(store: &dyn ModelStore, config: &RiskConfig) -> Result<RiskModelBundle> {
    match store.load()? {
        Some(bundle) => {
            info!("Loaded existing model from {}", store.location());
            Ok(bundle)
        }
        None => {
            warn!(
                "No model at {}; training a new one on {} trips",
                store.location(),
                config.training_trips
            );
            let trained = Trainer::new(config.clone()).train_and_persist(store, config.training_trips)?;
            Ok(trained.bundle)
        }
    }
}

/// Lazily loaded, shareable model bundle.
///
/// The first `get` loads or trains while holding the lock, so concurrent
/// callers wait for that single result instead of training again.
pub struct ModelHandle {
    store: Box<dyn ModelStore>,
    config: RiskConfig,
    slot: Mutex<Option<Arc<RiskModelBundle>>>,
}

impl ModelHandle {
    pub fn new(store: Box<dyn ModelStore>, config: RiskConfig) -> Self {
        Self {
            store,
            config,
            slot: Mutex::new(None),
        }
    }

    /// Handle over a [`FileModelStore`] at `config.model_path`.
    pub fn from_config(config: RiskConfig) -> Self {
        let store = FileModelStore::new(config.model_path.clone());
        Self::new(Box::new(store), config)
    }

    pub fn get(&self) -> Result<Arc<RiskModelBundle>> {
        let mut slot = self.slot.lock();
        if let Some(bundle) = slot.as_ref() {
            return Ok(Arc::clone(bundle));
        }
        let bundle = Arc::new(load_or_train(self.store.as_ref(), &self.config)?);
        *slot = Some(Arc::clone(&bundle));
        Ok(bundle)
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.lock().is_some()
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbm::GbmParams;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quick_config(path: PathBuf) -> RiskConfig {
        RiskConfig {
            model_path: path,
            training_trips: 60,
            gbm: GbmParams {
                n_estimators: 10,
                ..GbmParams::default()
            },
            ..RiskConfig::default()
        }
    }

    /// Counts saves so tests can see how often training ran.
    struct CountingStore {
        inner: FileModelStore,
        saves: Arc<AtomicUsize>,
    }

    impl ModelStore for CountingStore {
        fn load(&self) -> Result<Option<RiskModelBundle>> {
            self.inner.load()
        }

        fn save(&self, bundle: &RiskModelBundle) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.inner.save(bundle)
        }

        fn location(&self) -> String {
            self.inner.location()
        }
    }

    #[test]
    fn test_missing_file_is_none() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let store = FileModelStore::new(tmp.path().join("absent.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let path = tmp.path().join("model.json");
        fs::write(&path, "\u{0}\u{1}not json").unwrap();
        let err = FileModelStore::new(&path).load().unwrap_err();
        assert!(matches!(err, RiskError::ModelStoreCorrupt { .. }));
    }

    #[test]
    fn test_wrong_shape_is_schema_mismatch() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let path = tmp.path().join("model.json");
        fs::write(&path, r#"{"model": {}, "encoders": {}}"#).unwrap();
        let err = FileModelStore::new(&path).load().unwrap_err();
        assert!(matches!(err, RiskError::BundleSchemaMismatch(_)));
    }

    #[test]
    fn test_train_then_load_from_disk() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let path = tmp.path().join("nested").join("model.json");
        let config = quick_config(path.clone());
        let store = FileModelStore::new(&path);

        let trained = load_or_train(&store, &config).unwrap();
        assert!(path.exists());

        let loaded = load_or_train(&store, &config).unwrap();
        assert_eq!(loaded, trained);
    }

    #[test]
    fn test_handle_trains_once_across_threads() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let path = tmp.path().join("model.json");
        let saves = Arc::new(AtomicUsize::new(0));
        let store = CountingStore {
            inner: FileModelStore::new(&path),
            saves: Arc::clone(&saves),
        };
        let handle = ModelHandle::new(Box::new(store), quick_config(path));
        assert!(!handle.is_loaded());

        let bundles: Vec<Arc<RiskModelBundle>> = std::thread::scope(|s| {
            let workers: Vec<_> = (0..4).map(|_| s.spawn(|| handle.get().unwrap())).collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(saves.load(Ordering::SeqCst), 1);
        assert!(handle.is_loaded());
        for b in &bundles[1..] {
            assert!(Arc::ptr_eq(b, &bundles[0]));
        }
    }
}
