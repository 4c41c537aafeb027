use anyhow::{bail, Context, Result};
use ndarray::{Array2, Axis};

use super::dataset::TabularDataset;

/// Class assigned to per-label rows where the target disfluency is absent.
pub const NEGATIVE_LABEL: &str = "none";

/// How the classification target is framed from the labeled dataset.
///
/// A closed set of variants sharing one contract: turn the tabular dataset
/// into feature rows plus one class label per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStrategy {
    /// Binary presence of one disfluency label. Rows where any *other*
    /// disfluency label is active are filtered out as confounded.
    PerLabel { target: String },
    /// Multi-class over all labels; each row's class is its dominant label
    /// column (first on ties).
    AllLabels,
}

impl ModelStrategy {
    /// Derive the training frame `(X, y)` from the dataset.
    pub fn frame(&self, data: &TabularDataset) -> Result<(Array2<f32>, Vec<String>)> {
        match self {
            Self::PerLabel { target } => {
                let target_col = data
                    .label_index(target)
                    .with_context(|| format!("Unknown target label: {}", target))?;

                let keep: Vec<usize> = (0..data.rows())
                    .filter(|&r| {
                        data.labels
                            .row(r)
                            .iter()
                            .enumerate()
                            .all(|(c, &count)| c == target_col || count == 0.0)
                    })
                    .collect();
                if keep.is_empty() {
                    bail!("No rows remain after filtering confounded labels");
                }

                let x = data.features.select(Axis(0), &keep);
                let y = keep
                    .iter()
                    .map(|&r| {
                        if data.labels[[r, target_col]] >= 1.0 {
                            target.clone()
                        } else {
                            NEGATIVE_LABEL.to_string()
                        }
                    })
                    .collect();
                Ok((x, y))
            }

            Self::AllLabels => {
                if data.label_names.is_empty() {
                    bail!("Dataset has no label columns");
                }

                let y = (0..data.rows())
                    .map(|r| {
                        let row = data.labels.row(r);
                        let mut dominant = 0;
                        for (c, &count) in row.iter().enumerate() {
                            if count > row[dominant] {
                                dominant = c;
                            }
                        }
                        data.label_names[dominant].clone()
                    })
                    .collect();
                Ok((data.features.clone(), y))
            }
        }
    }
}
