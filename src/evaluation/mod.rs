//! Evaluation of predicted labels against ground truth
//!
//! - [`confusion`] - confusion matrix, column normalization, top misclassification
//! - [`metrics`] - accuracy, per-class precision/recall/F1, averages

pub mod confusion;
pub mod metrics;

pub use confusion::{ConfusionMatrix, NormalizationPolicy};
pub use metrics::{accuracy, evaluate, evaluate_with_classes, AverageMetrics, ClassMetrics, EvaluationResult};
