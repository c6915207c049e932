//! Experiment configuration
//!
//! Every component receives the slice of configuration it needs; nothing is read from
//! process-wide globals. Values come from [`ExperimentConfig::default`], optionally
//! overlaid by a JSON file and then by command-line flags.

use crate::data::Split;
use crate::error::{NliError, Result};
use crate::evaluation::NormalizationPolicy;
use crate::training::Penalty;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Regularization strengths swept by default
pub const DEFAULT_STRENGTHS: [f64; 9] = [0.001, 0.01, 0.1, 1.0, 5.0, 10.0, 100.0, 1000.0, 10000.0];

/// Input and output directories
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Directory holding the labelled CSV tables
    pub data_dir: PathBuf,
    /// Directory holding the `<split>.jsonlines` embedding files
    pub feature_dir: PathBuf,
    /// Directory receiving the rendered figures
    pub image_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            feature_dir: ["..", "bert", "bert_output_data"].iter().collect(),
            image_dir: PathBuf::from("images"),
        }
    }
}

/// How examples are read from disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Token whose representation summarizes the whole sequence
    pub sentinel_token: String,
    /// Position in the `layers` list to read (0 is nearest the network output)
    pub layer_index: usize,
    /// Label column in the CSV tables
    pub label_column: String,
    pub train_labels: String,
    pub test_labels: String,
    pub eval_labels: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            sentinel_token: "[CLS]".to_string(),
            layer_index: 0,
            label_column: "native_language".to_string(),
            train_labels: "lang_id_train.csv".to_string(),
            test_labels: "lang_id_test.csv".to_string(),
            eval_labels: "lang_id_eval.csv".to_string(),
        }
    }
}

impl DataConfig {
    /// Label table file name for a split
    pub fn label_file(&self, split: Split) -> &str {
        match split {
            Split::Train => &self.train_labels,
            Split::Test => &self.test_labels,
            Split::Eval => &self.eval_labels,
        }
    }
}

/// Solver settings shared by every fit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub max_iter: usize,
    pub tol: f64,
    pub random_state: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_iter: 2000,
            tol: 1e-4,
            random_state: 42,
        }
    }
}

/// Hyperparameter sweep settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Inverse regularization strengths, in the order used for tie-breaking
    pub strengths: Vec<f64>,
    pub penalty: Penalty,
    /// Worker threads (0 = all available, 1 = sequential)
    pub n_jobs: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            strengths: DEFAULT_STRENGTHS.to_vec(),
            penalty: Penalty::L2,
            n_jobs: 0,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Whether figures are written to the image directory
    pub plots: bool,
    /// Handling of all-zero columns in the normalized confusion matrix
    pub normalization: NormalizationPolicy,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            plots: true,
            normalization: NormalizationPolicy::ClipToZero,
        }
    }
}

/// Top-level configuration for one experiment run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub paths: PathConfig,
    pub data: DataConfig,
    pub training: TrainerConfig,
    pub sweep: SweepConfig,
    pub report: ReportConfig,
}

impl ExperimentConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| NliError::from_io(path, e))?;
        serde_json::from_str(&json)
            .map_err(|e| NliError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Builder method to set the label table directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.paths.data_dir = dir.into();
        self
    }

    /// Builder method to set the embedding directory
    pub fn with_feature_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.paths.feature_dir = dir.into();
        self
    }

    /// Builder method to set the figure directory
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.paths.image_dir = dir.into();
        self
    }

    /// Builder method to set the swept strengths
    pub fn with_strengths(mut self, strengths: Vec<f64>) -> Self {
        self.sweep.strengths = strengths;
        self
    }

    /// Builder method to set the penalty
    pub fn with_penalty(mut self, penalty: Penalty) -> Self {
        self.sweep.penalty = penalty;
        self
    }

    /// Builder method to set the number of sweep workers
    pub fn with_n_jobs(mut self, n: usize) -> Self {
        self.sweep.n_jobs = n;
        self
    }

    /// Builder method to set the solver iteration cap
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.training.max_iter = max_iter;
        self
    }

    /// Builder method to enable or disable figures
    pub fn with_plots(mut self, plots: bool) -> Self {
        self.report.plots = plots;
        self
    }

    /// Check values that would otherwise fail deep inside the run
    pub fn validate(&self) -> Result<()> {
        if self.sweep.strengths.is_empty() {
            return Err(NliError::ConfigError("at least one strength is required".to_string()));
        }
        if let Some(c) = self.sweep.strengths.iter().find(|c| !(c.is_finite() && **c > 0.0)) {
            return Err(NliError::InvalidParameter {
                name: "strength".to_string(),
                value: c.to_string(),
                reason: "must be positive and finite".to_string(),
            });
        }
        if self.training.max_iter == 0 {
            return Err(NliError::InvalidParameter {
                name: "max_iter".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.training.tol.is_finite() && self.training.tol > 0.0) {
            return Err(NliError::InvalidParameter {
                name: "tol".to_string(),
                value: self.training.tol.to_string(),
                reason: "must be positive and finite".to_string(),
            });
        }
        if self.data.sentinel_token.is_empty() {
            return Err(NliError::ConfigError("sentinel token must not be empty".to_string()));
        }
        Ok(())
    }
}
