//! nli-probe - linear probes over sentence embeddings
//!
//! Predicts a writer's native language from precomputed `[CLS]` embeddings:
//! loads embeddings and labels for the train/test/eval splits, sweeps the inverse
//! regularization strength of a logistic regression, refits at the strength with the
//! best test accuracy, and reports per-class metrics with diagnostic figures.
//!
//! # Modules
//!
//! - [`data`] - embedding and label loading, split containers
//! - [`training`] - logistic regression and the strength sweep
//! - [`evaluation`] - accuracy, confusion matrix, per-class metrics
//! - [`report`] - console and SVG reporters
//! - [`pipeline`] - the end-to-end experiment
//! - [`config`] - experiment configuration
//! - [`cli`] - command-line interface

pub mod error;
pub mod config;

pub mod data;
pub mod training;
pub mod evaluation;
pub mod report;
pub mod pipeline;

pub mod utils;
pub mod cli;

pub use error::{NliError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{NliError, Result};

    pub use crate::config::{ExperimentConfig, DEFAULT_STRENGTHS};

    pub use crate::data::{Dataset, Split, SplitData};

    pub use crate::training::{
        select_best, FinalRun, HyperparameterSweep, LogisticModel, LogisticRegression, Penalty,
        SweepPoint, SweepResult,
    };

    pub use crate::evaluation::{
        accuracy, evaluate, evaluate_with_classes, ConfusionMatrix, EvaluationResult,
        NormalizationPolicy,
    };

    pub use crate::report::{ConsoleReporter, PlotReporter, Reporter};

    pub use crate::pipeline::{Experiment, ExperimentOutcome};
}
