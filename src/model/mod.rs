//! Disfluency model layer
//!
//! - [`dataset`]: the batch-data pull contract and the seeded split
//! - [`estimator`]: fit/predict/score estimators behind a configuration tag
//! - [`strategy`]: per-label vs. all-labels target framing
//! - [`adapter`]: one trained estimator bound to its configuration
//! - [`manager`]: the hot-swappable active adapter

pub mod adapter;
pub mod dataset;
pub mod estimator;
pub mod manager;
pub mod strategy;

pub use adapter::{ClassifierAdapter, ModelConfiguration};
pub use dataset::{
    train_test_split, DatasetFile, DatasetProvider, DatasetRow, JsonDatasetProvider,
    MemoryDatasetProvider, TabularDataset, TrainTestSplit, DISFLUENCY_LABELS,
};
pub use estimator::{DecisionTree, Estimator, EstimatorKind, NearestCentroid};
pub use manager::ModelManager;
pub use strategy::{ModelStrategy, NEGATIVE_LABEL};
