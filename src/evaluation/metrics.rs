//! Accuracy and per-class precision/recall

use super::confusion::ConfusionMatrix;
use crate::error::{NliError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Metrics for one class row of the confusion matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true examples of this class
    pub support: usize,
    /// Class most often confused with this one, if there is more than one class
    pub top_miss: Option<String>,
}

/// Averaged precision/recall/F1 over classes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Evaluation of one split's predictions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub labels: Vec<String>,
    pub predictions: Vec<String>,
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    /// One entry per class, in confusion matrix order
    pub class_metrics: Vec<ClassMetrics>,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
}

impl EvaluationResult {
    pub fn n_samples(&self) -> usize {
        self.labels.len()
    }

    pub fn classes(&self) -> &[String] {
        &self.confusion.classes
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

/// Fraction of positions where prediction equals truth
pub fn accuracy(y_true: &[String], y_pred: &[String]) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(NliError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(NliError::DataError("cannot score an empty split".to_string()));
    }
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Evaluate using the sorted set of true labels as class ordering
pub fn evaluate(y_true: &[String], y_pred: &[String]) -> Result<EvaluationResult> {
    let classes: Vec<String> = y_true
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    evaluate_with_classes(y_true, y_pred, &classes)
}

/// Evaluate against an explicit class ordering
pub fn evaluate_with_classes(
    y_true: &[String],
    y_pred: &[String],
    classes: &[String],
) -> Result<EvaluationResult> {
    let accuracy = accuracy(y_true, y_pred)?;
    let confusion = ConfusionMatrix::from_labels(y_true, y_pred, classes)?;

    let class_metrics: Vec<ClassMetrics> = classes
        .iter()
        .enumerate()
        .map(|(i, class)| {
            let tp = confusion.counts[[i, i]];
            let support = y_true.iter().filter(|t| *t == class).count();
            let predicted = y_pred.iter().filter(|p| *p == class).count();
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            ClassMetrics {
                class: class.clone(),
                precision,
                recall,
                f1: f1(precision, recall),
                support,
                top_miss: confusion.top_misclassification(i).map(str::to_string),
            }
        })
        .collect();

    let (macro_avg, weighted_avg) = averages(&class_metrics);

    Ok(EvaluationResult {
        labels: y_true.to_vec(),
        predictions: y_pred.to_vec(),
        accuracy,
        confusion,
        class_metrics,
        macro_avg,
        weighted_avg,
    })
}

fn averages(metrics: &[ClassMetrics]) -> (AverageMetrics, AverageMetrics) {
    let k = metrics.len().max(1) as f64;
    let support: usize = metrics.iter().map(|m| m.support).sum();
    let weight = |m: &ClassMetrics| {
        if support == 0 {
            0.0
        } else {
            m.support as f64 / support as f64
        }
    };

    let macro_avg = AverageMetrics {
        precision: metrics.iter().map(|m| m.precision).sum::<f64>() / k,
        recall: metrics.iter().map(|m| m.recall).sum::<f64>() / k,
        f1: metrics.iter().map(|m| m.f1).sum::<f64>() / k,
        support,
    };
    let weighted_avg = AverageMetrics {
        precision: metrics.iter().map(|m| weight(m) * m.precision).sum(),
        recall: metrics.iter().map(|m| weight(m) * m.recall).sum(),
        f1: metrics.iter().map(|m| weight(m) * m.f1).sum(),
        support,
    };
    (macro_avg, weighted_avg)
}
