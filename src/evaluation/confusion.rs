//! Confusion matrix over an explicit class ordering

use crate::error::{NliError, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Handling of all-zero columns when normalizing by column sum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationPolicy {
    /// Write 0.0 into columns that sum to zero
    #[default]
    ClipToZero,
    /// Keep the non-finite quotient so the degenerate column stays visible
    Propagate,
}

/// Counts of (true class, predicted class) pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Class names; row and column `i` both refer to `classes[i]`
    pub classes: Vec<String>,
    /// `counts[[i, j]]` = examples of true class i predicted as class j
    pub counts: Array2<usize>,
    /// Pairs whose true or predicted label is not in `classes`
    pub unlisted: usize,
}

impl ConfusionMatrix {
    /// Tally label pairs against the given class ordering
    pub fn from_labels(y_true: &[String], y_pred: &[String], classes: &[String]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(NliError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }

        let index: HashMap<&str, usize> = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        let k = classes.len();
        let mut counts = Array2::<usize>::zeros((k, k));
        let mut unlisted = 0;
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            match (index.get(t.as_str()), index.get(p.as_str())) {
                (Some(&i), Some(&j)) => counts[[i, j]] += 1,
                _ => unlisted += 1,
            }
        }

        Ok(Self {
            classes: classes.to_vec(),
            counts,
            unlisted,
        })
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn total(&self) -> usize {
        self.counts.sum()
    }

    pub fn trace(&self) -> usize {
        self.counts.diag().sum()
    }

    /// Per-row sums (true class counts inside the grid)
    pub fn row_sums(&self) -> Vec<usize> {
        self.counts.sum_axis(Axis(1)).to_vec()
    }

    /// Per-column sums (predicted class counts inside the grid)
    pub fn column_sums(&self) -> Vec<usize> {
        self.counts.sum_axis(Axis(0)).to_vec()
    }

    /// Divide each cell by its column sum
    ///
    /// Rows are true classes and columns predicted classes, so the result reads as
    /// "share of predictions of class j that were truly class i", not a recall matrix.
    pub fn normalized(&self, policy: NormalizationPolicy) -> Array2<f64> {
        let col_sums = self.column_sums();
        let mut out = self.counts.mapv(|v| v as f64);

        for (j, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let sum = col_sums[j] as f64;
            if sum == 0.0 {
                match policy {
                    NormalizationPolicy::ClipToZero => {
                        warn!(class = %self.classes[j], "Never-predicted class, normalized column set to zero");
                        column.fill(0.0);
                    }
                    NormalizationPolicy::Propagate => column.mapv_inplace(|v| v / sum),
                }
            } else {
                column.mapv_inplace(|v| v / sum);
            }
        }
        out
    }

    /// Most frequent wrong class for the class at `class_idx`
    ///
    /// The other entries of the column of `class_idx` are stable-sorted by descending count
    /// and the first is returned; equal counts keep the lower class index first. `None` when
    /// the column holds fewer than two distinct values or nothing off the diagonal.
    pub fn top_misclassification(&self, class_idx: usize) -> Option<&str> {
        if self.n_classes() < 2 || class_idx >= self.n_classes() {
            return None;
        }
        let column = self.counts.column(class_idx);
        let first = column[0];
        if column.iter().all(|&v| v == first) {
            return None;
        }

        let mut order: Vec<usize> = (0..self.n_classes()).filter(|&i| i != class_idx).collect();
        order.sort_by(|&a, &b| column[b].cmp(&column[a]));
        order
            .first()
            .filter(|&&i| column[i] > 0)
            .map(|&i| self.classes[i].as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn s(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_counts_rows_true_cols_pred() {
        let cm = ConfusionMatrix::from_labels(
            &s(&["en", "fr", "en"]),
            &s(&["en", "fr", "fr"]),
            &s(&["en", "fr"]),
        )
        .unwrap();
        assert_eq!(cm.counts, array![[1usize, 1], [0, 1]]);
        assert_eq!(cm.trace(), 2);
        assert_eq!(cm.total(), 3);
        assert_eq!(cm.row_sums(), vec![2, 1]);
        assert_eq!(cm.unlisted, 0);
    }

    #[test]
    fn test_unlisted_predictions() {
        let cm = ConfusionMatrix::from_labels(&s(&["en", "fr"]), &s(&["de", "fr"]), &s(&["en", "fr"]))
            .unwrap();
        assert_eq!(cm.total(), 1);
        assert_eq!(cm.unlisted, 1);
    }

    #[test]
    fn test_length_mismatch() {
        let err = ConfusionMatrix::from_labels(&s(&["en"]), &s(&[]), &s(&["en"])).unwrap_err();
        assert!(matches!(err, NliError::ShapeError { .. }));
    }

    #[test]
    fn test_normalized_by_column() {
        let cm = ConfusionMatrix {
            classes: s(&["a", "b"]),
            counts: array![[3, 1], [1, 3]],
            unlisted: 0,
        };
        let norm = cm.normalized(NormalizationPolicy::ClipToZero);
        assert!((norm[[0, 0]] - 0.75).abs() < 1e-12);
        assert!((norm[[1, 0]] - 0.25).abs() < 1e-12);
        for col in norm.axis_iter(Axis(1)) {
            assert!((col.sum() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_column_policies() {
        let cm = ConfusionMatrix {
            classes: s(&["a", "b"]),
            counts: array![[2, 0], [1, 0]],
            unlisted: 0,
        };
        let clipped = cm.normalized(NormalizationPolicy::ClipToZero);
        assert_eq!(clipped[[0, 1]], 0.0);
        assert_eq!(clipped[[1, 1]], 0.0);
        assert!((clipped.column(0).sum() - 1.0).abs() < 1e-12);

        let propagated = cm.normalized(NormalizationPolicy::Propagate);
        assert!(propagated[[0, 1]].is_nan());
        assert!(propagated[[1, 1]].is_nan());
    }

    #[test]
    fn test_top_misclassification_by_column() {
        // column "b": a=4, b=5, c=1 -> descending b, a, c
        let cm = ConfusionMatrix {
            classes: s(&["a", "b", "c"]),
            counts: array![[6, 4, 0], [1, 5, 2], [0, 1, 7]],
            unlisted: 0,
        };
        assert_eq!(cm.top_misclassification(1), Some("a"));
        assert_eq!(cm.top_misclassification(2), Some("b"));
    }

    #[test]
    fn test_top_misclassification_tie_prefers_lower_index() {
        // column "c" off the diagonal: a=2, b=2 -> "a"
        let cm = ConfusionMatrix {
            classes: s(&["a", "b", "c"]),
            counts: array![[5, 0, 2], [0, 5, 2], [0, 0, 5]],
            unlisted: 0,
        };
        assert_eq!(cm.top_misclassification(2), Some("a"));
        // column "a": nothing off the diagonal
        assert_eq!(cm.top_misclassification(0), None);
    }

    #[test]
    fn test_top_misclassification_never_returns_itself() {
        // column "b" is all zeros
        let never_predicted = ConfusionMatrix {
            classes: s(&["a", "b", "c"]),
            counts: array![[5, 0, 1], [2, 0, 1], [0, 0, 4]],
            unlisted: 0,
        };
        assert_eq!(never_predicted.top_misclassification(1), None);
        assert_eq!(never_predicted.top_misclassification(2), Some("a"));

        // diagonal is not the column maximum
        let off_diagonal_max = ConfusionMatrix {
            classes: s(&["a", "b"]),
            counts: array![[0, 6], [3, 1]],
            unlisted: 0,
        };
        assert_eq!(off_diagonal_max.top_misclassification(1), Some("a"));
        assert_eq!(off_diagonal_max.top_misclassification(0), Some("b"));
    }

    #[test]
    fn test_top_misclassification_single_distinct_value() {
        let cm = ConfusionMatrix {
            classes: s(&["a", "b"]),
            counts: array![[2, 1], [2, 1]],
            unlisted: 0,
        };
        assert_eq!(cm.top_misclassification(0), None);
        assert_eq!(cm.top_misclassification(1), None);
    }

    #[test]
    fn test_top_misclassification_single_class() {
        let cm = ConfusionMatrix::from_labels(&s(&["en"]), &s(&["en"]), &s(&["en"])).unwrap();
        assert_eq!(cm.top_misclassification(0), None);
    }
}
