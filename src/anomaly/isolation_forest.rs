//! Isolation forest outlier model
//!
//! An unsupervised one-class model: random axis-aligned splits isolate
//! outliers in fewer steps than inliers. Hyperparameters are fixed and the
//! random generator is seeded, so fitting is deterministic.
//!
//! Scoring follows Liu et al. (2008):
//! ```text
//! score(x)    = -2^(-E[h(x)] / c(psi))
//! offset      = percentile(score(training), 100 * contamination)
//! decision(x) = score(x) - offset      (negative => outlier)
//! ```

use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_pcg::Mcg128Xsl64;

/// Number of trees in the ensemble
pub const DEFAULT_TREES: usize = 100;

/// Largest sub-sample drawn per tree
pub const MAX_SUBSAMPLE: usize = 256;

/// Seed for reproducible fits
pub const DEFAULT_SEED: u64 = 42;

/// Euler-Mascheroni constant
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Untrained isolation forest hyperparameters
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: usize,
    contamination: f64,
    seed: u64,
}

impl IsolationForest {
    pub fn new(contamination: f64) -> Self {
        Self {
            trees: DEFAULT_TREES,
            contamination,
            seed: DEFAULT_SEED,
        }
    }

    /// Fit the forest on `rows`. Returns `None` when there is nothing to fit.
    pub fn fit(&self, rows: &[Vec<f64>]) -> Option<FittedForest> {
        if rows.is_empty() || self.trees == 0 {
            return None;
        }

        let mut rng = Mcg128Xsl64::seed_from_u64(self.seed);
        let sample_size = rows.len().min(MAX_SUBSAMPLE);
        let height_limit = (sample_size as f64).log2().ceil().max(0.0) as usize;

        let trees = (0..self.trees)
            .map(|_| {
                let indices = sample(&mut rng, rows.len(), sample_size).into_vec();
                build_node(rows, indices, 0, height_limit, &mut rng)
            })
            .collect();

        let mut forest = FittedForest {
            trees,
            sample_size,
            offset: 0.0,
        };

        let mut training_scores: Vec<f64> = rows.iter().map(|row| forest.score(row)).collect();
        forest.offset = percentile(&mut training_scores, self.contamination * 100.0);

        Some(forest)
    }
}

/// A trained forest ready to classify new rows
#[derive(Debug, Clone)]
pub struct FittedForest {
    trees: Vec<Node>,
    sample_size: usize,
    offset: f64,
}

impl FittedForest {
    /// Raw anomaly score in [-1, 0); lower is more anomalous
    pub fn score(&self, row: &[f64]) -> f64 {
        let mean_path = self
            .trees
            .iter()
            .map(|tree| path_length(tree, row, 0))
            .sum::<f64>()
            / self.trees.len() as f64;

        let normalizer = average_path_length(self.sample_size);
        if normalizer <= 0.0 {
            return -0.5;
        }
        -(2f64.powf(-mean_path / normalizer))
    }

    /// Score shifted by the contamination threshold; negative means outlier
    pub fn decision_function(&self, row: &[f64]) -> f64 {
        self.score(row) - self.offset
    }

    #[cfg(test)]
    fn is_outlier(&self, row: &[f64]) -> bool {
        self.decision_function(row) < 0.0
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

fn build_node(
    rows: &[Vec<f64>],
    indices: Vec<usize>,
    depth: usize,
    height_limit: usize,
    rng: &mut Mcg128Xsl64,
) -> Node {
    if depth >= height_limit || indices.len() <= 1 {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    // Only features that still vary inside this node can split it
    let width = rows[indices[0]].len();
    let candidates: Vec<(usize, f64, f64)> = (0..width)
        .filter_map(|feature| {
            let (min, max) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                (lo.min(rows[i][feature]), hi.max(rows[i][feature]))
            });
            (max > min).then_some((feature, min, max))
        })
        .collect();

    if candidates.is_empty() {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let (feature, min, max) = candidates[rng.gen_range(0..candidates.len())];
    let threshold = rng.gen_range(min..max);

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| rows[i][feature] <= threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_node(rows, left, depth + 1, height_limit, rng)),
        right: Box::new(build_node(rows, right, depth + 1, height_limit, rng)),
    }
}

fn path_length(node: &Node, row: &[f64], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            let next = if row.get(*feature).copied().unwrap_or(0.0) <= *threshold {
                left
            } else {
                right
            };
            path_length(next, row, depth + 1)
        }
    }
}

/// Average unsuccessful-search path length in a binary search tree of `n` nodes
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Percentile with linear interpolation between closest ranks
fn percentile(values: &mut [f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let rank = (pct / 100.0).clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    values[lower] + (values[upper] - values[lower]) * weight
}
