//! Statistical estimators behind the fit/predict/score contract
//!
//! Concrete estimators are resolved from a closed configuration tag rather
//! than discovered at runtime; a kind that supports seeding receives the
//! model seed explicitly at build time.

use anyhow::{bail, Context, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// The statistical-model contract: train on labeled rows, predict labels for
/// new rows, and report held-out accuracy in [0, 1].
pub trait Estimator: Send + Sync {
    fn fit(&mut self, x: &Array2<f32>, y: &[String]) -> Result<()>;

    fn predict(&self, x: &Array2<f32>) -> Result<Vec<String>>;

    fn score(&self, x: &Array2<f32>, y: &[String]) -> Result<f32> {
        if y.is_empty() {
            bail!("Cannot score on an empty set");
        }
        let predicted = self.predict(x)?;
        let hits = predicted.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
        Ok(hits as f32 / y.len() as f32)
    }
}

/// Which estimator a model configuration resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EstimatorKind {
    /// Gini-impurity decision tree. Seedable: the seed orders features so
    /// ties between equally good splits break reproducibly.
    DecisionTree { max_depth: Option<usize> },
    /// Nearest class centroid. Fully deterministic, declares no seed.
    NearestCentroid,
}

impl EstimatorKind {
    pub fn build(&self, seed: u64) -> Box<dyn Estimator> {
        match self {
            Self::DecisionTree { max_depth } => {
                Box::new(DecisionTree::seeded(seed, *max_depth))
            }
            Self::NearestCentroid => Box::new(NearestCentroid::new()),
        }
    }
}

enum Node {
    Leaf {
        label: String,
    },
    Split {
        feature: usize,
        threshold: f32,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// CART-style decision tree over f32 features and string class labels.
pub struct DecisionTree {
    seed: u64,
    max_depth: Option<usize>,
    root: Option<Node>,
}

impl DecisionTree {
    pub fn seeded(seed: u64, max_depth: Option<usize>) -> Self {
        Self {
            seed,
            max_depth,
            root: None,
        }
    }

    fn build(
        &self,
        x: &Array2<f32>,
        y: &[String],
        rows: &[usize],
        depth: usize,
        rng: &mut StdRng,
    ) -> Node {
        let parent_gini = gini(y, rows);
        let at_max_depth = self.max_depth.is_some_and(|d| depth >= d);
        if parent_gini == 0.0 || at_max_depth || rows.len() < 2 {
            return Node::Leaf {
                label: majority_label(y, rows),
            };
        }

        let mut feature_order: Vec<usize> = (0..x.ncols()).collect();
        feature_order.shuffle(rng);

        let mut best: Option<(f32, usize, f32)> = None;
        for &feature in &feature_order {
            let mut values: Vec<f32> = rows.iter().map(|&r| x[[r, feature]]).collect();
            values.sort_by(f32::total_cmp);
            values.dedup();

            for pair in values.windows(2) {
                let threshold = (pair[0] + pair[1]) / 2.0;
                let (left, right): (Vec<usize>, Vec<usize>) =
                    rows.iter().partition(|&&r| x[[r, feature]] <= threshold);
                let weighted = (left.len() as f32 * gini(y, &left)
                    + right.len() as f32 * gini(y, &right))
                    / rows.len() as f32;
                // Strictly-better comparison: ties keep the earlier candidate
                // in the seeded feature order.
                if best.is_none_or(|(g, _, _)| weighted < g) {
                    best = Some((weighted, feature, threshold));
                }
            }
        }

        match best {
            Some((impurity, feature, threshold)) if impurity < parent_gini => {
                let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
                    rows.iter().partition(|&&r| x[[r, feature]] <= threshold);
                Node::Split {
                    feature,
                    threshold,
                    left: Box::new(self.build(x, y, &left_rows, depth + 1, rng)),
                    right: Box::new(self.build(x, y, &right_rows, depth + 1, rng)),
                }
            }
            _ => Node::Leaf {
                label: majority_label(y, rows),
            },
        }
    }
}

impl Estimator for DecisionTree {
    fn fit(&mut self, x: &Array2<f32>, y: &[String]) -> Result<()> {
        if x.nrows() == 0 {
            bail!("Cannot fit on an empty training set");
        }
        if x.nrows() != y.len() {
            bail!("Feature rows ({}) and labels ({}) disagree", x.nrows(), y.len());
        }

        let rows: Vec<usize> = (0..x.nrows()).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.root = Some(self.build(x, y, &rows, 0, &mut rng));
        Ok(())
    }

    fn predict(&self, x: &Array2<f32>) -> Result<Vec<String>> {
        let root = self.root.as_ref().context("Decision tree is not fitted")?;

        Ok((0..x.nrows())
            .map(|r| {
                let mut node = root;
                loop {
                    match node {
                        Node::Leaf { label } => return label.clone(),
                        Node::Split {
                            feature,
                            threshold,
                            left,
                            right,
                        } => {
                            node = if x[[r, *feature]] <= *threshold {
                                left
                            } else {
                                right
                            };
                        }
                    }
                }
            })
            .collect())
    }
}

fn gini(y: &[String], rows: &[usize]) -> f32 {
    if rows.is_empty() {
        return 0.0;
    }
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for &r in rows {
        *counts.entry(y[r].as_str()).or_insert(0) += 1;
    }
    let n = rows.len() as f32;
    1.0 - counts
        .values()
        .map(|&c| {
            let p = c as f32 / n;
            p * p
        })
        .sum::<f32>()
}

/// Most common label among the rows; ties resolve to the lexicographically
/// smallest so leaves are reproducible.
fn majority_label(y: &[String], rows: &[usize]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for &r in rows {
        *counts.entry(y[r].as_str()).or_insert(0) += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (label, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label.to_string()).unwrap_or_default()
}

/// Classifies by distance to per-class mean feature vectors.
pub struct NearestCentroid {
    centroids: Vec<(String, Vec<f32>)>,
}

impl NearestCentroid {
    pub fn new() -> Self {
        Self {
            centroids: Vec::new(),
        }
    }
}

impl Default for NearestCentroid {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator for NearestCentroid {
    fn fit(&mut self, x: &Array2<f32>, y: &[String]) -> Result<()> {
        if x.nrows() == 0 {
            bail!("Cannot fit on an empty training set");
        }
        if x.nrows() != y.len() {
            bail!("Feature rows ({}) and labels ({}) disagree", x.nrows(), y.len());
        }

        let width = x.ncols();
        let mut sums: BTreeMap<&str, (Vec<f64>, usize)> = BTreeMap::new();
        for (r, label) in y.iter().enumerate() {
            let entry = sums
                .entry(label.as_str())
                .or_insert_with(|| (vec![0.0; width], 0));
            for c in 0..width {
                entry.0[c] += x[[r, c]] as f64;
            }
            entry.1 += 1;
        }

        self.centroids = sums
            .into_iter()
            .map(|(label, (sum, count))| {
                let mean = sum.iter().map(|&v| (v / count as f64) as f32).collect();
                (label.to_string(), mean)
            })
            .collect();
        Ok(())
    }

    fn predict(&self, x: &Array2<f32>) -> Result<Vec<String>> {
        if self.centroids.is_empty() {
            bail!("Nearest-centroid model is not fitted");
        }

        Ok((0..x.nrows())
            .map(|r| {
                let mut best: Option<(f32, &str)> = None;
                for (label, centroid) in &self.centroids {
                    let distance: f32 = centroid
                        .iter()
                        .enumerate()
                        .map(|(c, &m)| {
                            let d = x[[r, c]] - m;
                            d * d
                        })
                        .sum();
                    if best.is_none_or(|(d, _)| distance < d) {
                        best = Some((distance, label));
                    }
                }
                best.map(|(_, label)| label.to_string()).unwrap_or_default()
            })
            .collect())
    }
}
