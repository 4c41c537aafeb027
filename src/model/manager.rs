use anyhow::Result;
use std::sync::{Arc, RwLock};
use tracing::info;

use super::adapter::{ClassifierAdapter, ModelConfiguration};
use super::dataset::DatasetProvider;
use crate::events::{emit, EventSender, SessionEvent};

/// Owns the single active classifier adapter.
///
/// The capture loop reads the active adapter once per prediction via
/// [`ModelManager::current`]; a configuration change trains a replacement on
/// the caller's thread and swaps the reference atomically, so readers observe
/// either the old adapter or the new one, never a partial update.
pub struct ModelManager {
    provider: Arc<dyn DatasetProvider>,
    active: RwLock<Arc<ClassifierAdapter>>,
    events: EventSender,
}

impl ModelManager {
    /// Train the initial adapter synchronously and emit its test score.
    pub fn new(
        provider: Arc<dyn DatasetProvider>,
        initial: ModelConfiguration,
        events: EventSender,
    ) -> Result<Self> {
        let adapter = ClassifierAdapter::train(initial, provider.as_ref())?;
        let score = adapter.score()?;
        info!("Initial model trained (test score {:.3})", score);
        emit(&events, SessionEvent::Score { value: score });

        Ok(Self {
            provider,
            active: RwLock::new(Arc::new(adapter)),
            events,
        })
    }

    /// Build, train and activate a new adapter.
    ///
    /// Training blocks until complete and is not cancellable; the previous
    /// adapter keeps serving predictions until the swap. On any failure the
    /// previous adapter remains in force and no event is emitted.
    pub fn set_configuration(&self, config: ModelConfiguration) -> Result<()> {
        config.validate()?;

        info!("Retraining model: {:?} / {:?}", config.estimator, config.strategy);
        let adapter = ClassifierAdapter::train(config, self.provider.as_ref())?;
        let score = adapter.score()?;

        *self
            .active
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(adapter);

        info!("Model activated (test score {:.3})", score);
        emit(&self.events, SessionEvent::Score { value: score });
        Ok(())
    }

    /// The adapter to use for the next prediction. Callers must not pin the
    /// returned reference across windows.
    pub fn current(&self) -> Arc<ClassifierAdapter> {
        self.active
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Test score of the currently active adapter.
    pub fn score(&self) -> Result<f32> {
        self.current().score()
    }
}
