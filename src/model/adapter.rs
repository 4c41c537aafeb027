use anyhow::{bail, Context, Result};
use ndarray::Array2;

use super::dataset::{train_test_split, DatasetProvider, TrainTestSplit};
use super::estimator::{Estimator, EstimatorKind};
use super::strategy::ModelStrategy;

/// Everything needed to build one classifier adapter. Immutable once built;
/// a configuration change always produces a new adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfiguration {
    pub estimator: EstimatorKind,
    pub strategy: ModelStrategy,
    /// Length of the MFCC vector extracted per window.
    pub feature_length: usize,
    pub test_fraction: f32,
    pub seed: u64,
}

impl Default for ModelConfiguration {
    fn default() -> Self {
        Self {
            estimator: EstimatorKind::DecisionTree { max_depth: None },
            strategy: ModelStrategy::PerLabel {
                target: "Prolongation".to_string(),
            },
            feature_length: 13,
            test_fraction: 0.4,
            seed: 42,
        }
    }
}

impl ModelConfiguration {
    /// Rejects invalid configurations before any training work starts.
    pub fn validate(&self) -> Result<()> {
        if let ModelStrategy::PerLabel { target } = &self.strategy {
            if target.is_empty() {
                bail!("Per-label strategy requires a target label");
            }
        }
        if self.feature_length == 0 {
            bail!("Feature length must be at least 1");
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            bail!("Test fraction must be in (0, 1), got {}", self.test_fraction);
        }
        Ok(())
    }
}

/// One trained estimator plus the configuration it was built from and its
/// cached train/test split.
pub struct ClassifierAdapter {
    config: ModelConfiguration,
    estimator: Box<dyn Estimator>,
    split: TrainTestSplit,
}

impl ClassifierAdapter {
    /// Pull the dataset, frame it per strategy, split once, and fit.
    /// Blocks until training completes.
    pub fn train(config: ModelConfiguration, provider: &dyn DatasetProvider) -> Result<Self> {
        config.validate()?;

        let data = provider
            .dataset(config.feature_length)
            .context("Failed to pull training dataset")?;
        let (x, y) = config.strategy.frame(&data)?;
        let split = train_test_split(&x, &y, config.test_fraction, config.seed)?;

        let mut estimator = config.estimator.build(config.seed);
        estimator
            .fit(&split.x_train, &split.y_train)
            .context("Estimator training failed")?;

        Ok(Self {
            config,
            estimator,
            split,
        })
    }

    pub fn config(&self) -> &ModelConfiguration {
        &self.config
    }

    pub fn feature_length(&self) -> usize {
        self.config.feature_length
    }

    /// Classify one window's feature vector into exactly one label.
    pub fn predict_window(&self, features: &[f32]) -> Result<String> {
        if features.len() != self.config.feature_length {
            bail!(
                "Feature vector has {} entries, model expects {}",
                features.len(),
                self.config.feature_length
            );
        }

        let x = Array2::from_shape_vec((1, features.len()), features.to_vec())?;
        self.estimator
            .predict(&x)?
            .into_iter()
            .next()
            .context("Estimator returned no prediction")
    }

    /// Accuracy on the cached held-out split.
    pub fn score(&self) -> Result<f32> {
        self.estimator.score(&self.split.x_test, &self.split.y_test)
    }
}
