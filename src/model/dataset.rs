//! Tabular training data pulled from the offline batch pipeline
//!
//! The dataset itself is built elsewhere (clip labeling + feature extraction
//! over the SEP-28k corpus); this module only defines the pull contract the
//! model layer trains against, plus the seeded train/test split every
//! classifier adapter caches.

use anyhow::{bail, Context, Result};
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The disfluency label columns of the dataset, in column order.
pub const DISFLUENCY_LABELS: [&str; 6] = [
    "NaturalPause",
    "Interjection",
    "Prolongation",
    "WordRep",
    "SoundRep",
    "Block",
];

/// Rows of annotation counts plus feature columns.
#[derive(Debug, Clone)]
pub struct TabularDataset {
    /// Names of the label columns.
    pub label_names: Vec<String>,
    /// Per-row annotation counts, one column per label name.
    pub labels: Array2<f32>,
    /// Per-row feature vectors.
    pub features: Array2<f32>,
}

impl TabularDataset {
    pub fn rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn label_index(&self, name: &str) -> Option<usize> {
        self.label_names.iter().position(|n| n == name)
    }
}

/// The batch data collaborator. Pulled synchronously by the model layer at
/// configuration time; never touched by the capture loop.
pub trait DatasetProvider: Send + Sync {
    /// Return the dataset with feature vectors trimmed to the last
    /// `feature_length` feature columns.
    fn dataset(&self, feature_length: usize) -> Result<TabularDataset>;
}

/// One row of the serialized feature table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRow {
    pub labels: Vec<f32>,
    pub features: Vec<f32>,
}

/// The serialized feature table written by the offline pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetFile {
    pub label_names: Vec<String>,
    pub rows: Vec<DatasetRow>,
}

impl DatasetFile {
    fn into_dataset(self, feature_length: usize) -> Result<TabularDataset> {
        if self.rows.is_empty() {
            bail!("Dataset contains no rows");
        }

        let n_labels = self.label_names.len();
        let stored_width = self.rows[0].features.len();
        if stored_width < feature_length {
            bail!(
                "Dataset stores {} feature columns, {} requested",
                stored_width,
                feature_length
            );
        }

        let n = self.rows.len();
        let mut labels = Vec::with_capacity(n * n_labels);
        let mut features = Vec::with_capacity(n * feature_length);
        for (i, row) in self.rows.iter().enumerate() {
            if row.labels.len() != n_labels || row.features.len() != stored_width {
                bail!("Dataset row {} has inconsistent width", i);
            }
            labels.extend_from_slice(&row.labels);
            // The trailing columns are the most recent extraction; older
            // tables may carry extra leading columns.
            features.extend_from_slice(&row.features[stored_width - feature_length..]);
        }

        Ok(TabularDataset {
            label_names: self.label_names,
            labels: Array2::from_shape_vec((n, n_labels), labels)?,
            features: Array2::from_shape_vec((n, feature_length), features)?,
        })
    }
}

/// In-memory provider, for embedders that assemble their own table.
pub struct MemoryDatasetProvider {
    file: DatasetFile,
}

impl MemoryDatasetProvider {
    pub fn new(file: DatasetFile) -> Self {
        Self { file }
    }
}

impl DatasetProvider for MemoryDatasetProvider {
    fn dataset(&self, feature_length: usize) -> Result<TabularDataset> {
        self.file.clone().into_dataset(feature_length)
    }
}

/// Provider reading the JSON feature table from disk on every pull.
pub struct JsonDatasetProvider {
    path: PathBuf,
}

impl JsonDatasetProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DatasetProvider for JsonDatasetProvider {
    fn dataset(&self, feature_length: usize) -> Result<TabularDataset> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read dataset: {}", self.path.display()))?;
        let file: DatasetFile = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse dataset: {}", self.path.display()))?;
        file.into_dataset(feature_length)
    }
}

/// A cached train/test partition. Computed once per classifier adapter and
/// reused for every subsequent scoring call.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f32>,
    pub x_test: Array2<f32>,
    pub y_train: Vec<String>,
    pub y_test: Vec<String>,
}

/// Shuffle rows with a seeded generator and split off a fixed test fraction.
pub fn train_test_split(
    x: &Array2<f32>,
    y: &[String],
    test_fraction: f32,
    seed: u64,
) -> Result<TrainTestSplit> {
    let n = x.nrows();
    if n != y.len() {
        bail!("Feature rows ({}) and labels ({}) disagree", n, y.len());
    }
    if n < 2 {
        bail!("At least two rows are required to split, got {}", n);
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let n_test = ((n as f32) * test_fraction).round() as usize;
    let n_test = n_test.clamp(1, n - 1);
    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), train_idx),
        x_test: x.select(Axis(0), test_idx),
        y_train: train_idx.iter().map(|&i| y[i].clone()).collect(),
        y_test: test_idx.iter().map(|&i| y[i].clone()).collect(),
    })
}
