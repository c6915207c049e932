//! Data loading
//!
//! Provides the three dataset splits as aligned (feature matrix, label vector) pairs:
//! - [`features`] - sentinel-token embeddings from line-delimited JSON
//! - [`labels`] - ground-truth labels from CSV tables

pub mod features;
pub mod labels;

pub use features::{load_split_features, read_feature_file, FeatureOptions};
pub use labels::{label_column, load_label_table, load_labels};

use crate::config::ExperimentConfig;
use crate::error::{NliError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::info;

/// One of the three disjoint data partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
    Eval,
}

impl Split {
    /// All splits in reporting order
    pub const ALL: [Split; 3] = [Split::Train, Split::Test, Split::Eval];

    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
            Split::Eval => "eval",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature matrix and labels of one split, row-aligned
#[derive(Debug, Clone)]
pub struct SplitData {
    pub features: Array2<f64>,
    pub labels: Vec<String>,
}

impl SplitData {
    /// Pair a feature matrix with its labels, rejecting row-count mismatches
    pub fn new(features: Array2<f64>, labels: Vec<String>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(NliError::ShapeError {
                expected: format!("{} labels (one per feature row)", features.nrows()),
                actual: format!("{} labels", labels.len()),
            });
        }
        if labels.is_empty() {
            return Err(NliError::DataError("split has no examples".to_string()));
        }
        Ok(Self { features, labels })
    }

    pub fn n_samples(&self) -> usize {
        self.labels.len()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }
}

/// The train/test/eval splits of one experiment
#[derive(Debug, Clone)]
pub struct Dataset {
    pub train: SplitData,
    pub test: SplitData,
    pub eval: SplitData,
}

impl Dataset {
    /// Assemble the splits, requiring the same dimensionality everywhere
    pub fn new(train: SplitData, test: SplitData, eval: SplitData) -> Result<Self> {
        let dim = train.n_features();
        for (split, data) in [(Split::Test, &test), (Split::Eval, &eval)] {
            if data.n_features() != dim {
                return Err(NliError::ShapeError {
                    expected: format!("{} features in every split", dim),
                    actual: format!("{} features in {} split", data.n_features(), split),
                });
            }
        }
        Ok(Self { train, test, eval })
    }

    /// Read all three splits from the configured directories
    pub fn load(config: &ExperimentConfig) -> Result<Self> {
        let options = FeatureOptions::from(&config.data);
        let mut loaded = Vec::with_capacity(3);

        for split in Split::ALL {
            let labels = load_labels(
                &config.paths.data_dir,
                config.data.label_file(split),
                &config.data.label_column,
            )?;
            let features = load_split_features(&config.paths.feature_dir, split, &options)?;
            let data = SplitData::new(features, labels).map_err(|e| match e {
                NliError::ShapeError { expected, actual } => NliError::ShapeError {
                    expected: format!("{} ({} split)", expected, split),
                    actual,
                },
                other => other,
            })?;

            info!(
                split = %split,
                n_samples = data.n_samples(),
                n_features = data.n_features(),
                "Loaded split"
            );
            loaded.push(data);
        }

        let eval = loaded.pop();
        let test = loaded.pop();
        let train = loaded.pop();
        match (train, test, eval) {
            (Some(train), Some(test), Some(eval)) => Self::new(train, test, eval),
            _ => Err(NliError::DataError("expected three splits".to_string())),
        }
    }

    pub fn split(&self, split: Split) -> &SplitData {
        match split {
            Split::Train => &self.train,
            Split::Test => &self.test,
            Split::Eval => &self.eval,
        }
    }

    pub fn n_features(&self) -> usize {
        self.train.n_features()
    }

    /// Sorted label set of the test split, the class ordering used for reporting
    pub fn canonical_classes(&self) -> Vec<String> {
        self.test
            .labels
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_data_rejects_row_mismatch() {
        let x = array![[0.0, 1.0], [1.0, 0.0]];
        let err = SplitData::new(x, labels(&["en"])).unwrap_err();
        assert!(matches!(err, NliError::ShapeError { .. }));
    }

    #[test]
    fn test_split_data_rejects_empty() {
        let x = Array2::<f64>::zeros((0, 2));
        assert!(SplitData::new(x, Vec::new()).is_err());
    }

    #[test]
    fn test_dataset_rejects_dimension_mismatch() {
        let train = SplitData::new(array![[0.0, 1.0]], labels(&["en"])).unwrap();
        let test = SplitData::new(array![[0.0, 1.0, 2.0]], labels(&["fr"])).unwrap();
        let eval = SplitData::new(array![[0.0, 1.0]], labels(&["en"])).unwrap();
        let err = Dataset::new(train, test, eval).unwrap_err();
        assert!(err.to_string().contains("test split"));
    }

    #[test]
    fn test_canonical_classes_sorted_from_test() {
        let train = SplitData::new(array![[0.0], [1.0]], labels(&["zh", "en"])).unwrap();
        let test = SplitData::new(array![[0.0], [1.0], [2.0]], labels(&["fr", "en", "fr"])).unwrap();
        let eval = SplitData::new(array![[0.0]], labels(&["de"])).unwrap();
        let dataset = Dataset::new(train, test, eval).unwrap();
        assert_eq!(dataset.canonical_classes(), labels(&["en", "fr"]));
    }

    #[test]
    fn test_split_names() {
        let names: Vec<String> = Split::ALL.iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["train", "test", "eval"]);
    }
}
