//! Regularization strength sweep
//!
//! Fits one model per strength on the train split, scores all three splits, and selects the
//! strength with the best test accuracy. Strengths are independent, so the map over them runs
//! on rayon and is collected back in input order.

use super::logistic::{LogisticModel, LogisticRegression, Penalty};
use crate::config::DEFAULT_STRENGTHS;
use crate::data::{Dataset, Split};
use crate::error::{NliError, Result};
use crate::evaluation::{accuracy, evaluate_with_classes, EvaluationResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Accuracies of one fitted strength
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub c: f64,
    pub train: f64,
    pub test: f64,
    pub eval: f64,
    pub converged: bool,
}

impl SweepPoint {
    pub fn accuracy(&self, split: Split) -> f64 {
        match split {
            Split::Train => self.train,
            Split::Test => self.test,
            Split::Eval => self.eval,
        }
    }
}

/// All sweep points in input order plus the selected index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResult {
    pub penalty: Penalty,
    pub points: Vec<SweepPoint>,
    pub best_index: usize,
}

impl SweepResult {
    pub fn best(&self) -> &SweepPoint {
        &self.points[self.best_index]
    }

    pub fn strengths(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.c).collect()
    }

    /// Accuracy of `split` for every strength, in sweep order
    pub fn accuracies(&self, split: Split) -> Vec<f64> {
        self.points.iter().map(|p| p.accuracy(split)).collect()
    }
}

/// Index of the highest test accuracy; the earliest point wins ties
pub fn select_best(points: &[SweepPoint]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, point) in points.iter().enumerate() {
        match best {
            Some(b) if point.test > points[b].test => best = Some(i),
            None => best = Some(i),
            _ => {}
        }
    }
    best
}

/// Model refit at the selected strength with its per-split evaluations
#[derive(Debug, Clone)]
pub struct FinalRun {
    pub model: LogisticModel,
    pub train: EvaluationResult,
    pub test: EvaluationResult,
    pub eval: EvaluationResult,
}

impl FinalRun {
    pub fn split(&self, split: Split) -> &EvaluationResult {
        match split {
            Split::Train => &self.train,
            Split::Test => &self.test,
            Split::Eval => &self.eval,
        }
    }
}

/// Grid search over the inverse regularization strength
#[derive(Debug, Clone)]
pub struct HyperparameterSweep {
    strengths: Vec<f64>,
    penalty: Penalty,
    trainer: LogisticRegression,
    n_jobs: usize,
}

impl Default for HyperparameterSweep {
    fn default() -> Self {
        Self::new(DEFAULT_STRENGTHS.to_vec(), Penalty::L2)
    }
}

impl HyperparameterSweep {
    pub fn new(strengths: Vec<f64>, penalty: Penalty) -> Self {
        Self {
            strengths,
            penalty,
            trainer: LogisticRegression::default(),
            n_jobs: 0,
        }
    }

    /// Solver settings shared by every point; its `c` and penalty are overridden
    pub fn with_trainer(mut self, trainer: LogisticRegression) -> Self {
        self.trainer = trainer;
        self
    }

    /// Worker threads: 0 = rayon's global pool, 1 = sequential
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn strengths(&self) -> &[f64] {
        &self.strengths
    }

    pub fn penalty(&self) -> Penalty {
        self.penalty
    }

    fn validate(&self) -> Result<()> {
        if self.strengths.is_empty() {
            return Err(NliError::InvalidParameter {
                name: "strengths".to_string(),
                value: "[]".to_string(),
                reason: "at least one strength is required".to_string(),
            });
        }
        if let Some(bad) = self.strengths.iter().find(|c| !(c.is_finite() && **c > 0.0)) {
            return Err(NliError::InvalidParameter {
                name: "strengths".to_string(),
                value: bad.to_string(),
                reason: "strengths must be positive and finite".to_string(),
            });
        }
        Ok(())
    }

    fn trainer_for(&self, c: f64) -> LogisticRegression {
        self.trainer.clone().with_c(c).with_penalty(self.penalty)
    }

    fn evaluate_point(&self, dataset: &Dataset, c: f64) -> Result<SweepPoint> {
        let model = self.trainer_for(c).fit(&dataset.train.features, &dataset.train.labels)?;

        let score = |split: Split| -> Result<f64> {
            let data = dataset.split(split);
            accuracy(&data.labels, &model.predict(&data.features)?)
        };
        let point = SweepPoint {
            c,
            train: score(Split::Train)?,
            test: score(Split::Test)?,
            eval: score(Split::Eval)?,
            converged: model.converged,
        };

        info!(
            c,
            train = point.train,
            test = point.test,
            eval = point.eval,
            converged = point.converged,
            "Sweep point finished"
        );
        Ok(point)
    }

    fn map_points(&self, dataset: &Dataset) -> Result<Vec<SweepPoint>> {
        match self.n_jobs {
            1 => self
                .strengths
                .iter()
                .map(|&c| self.evaluate_point(dataset, c))
                .collect(),
            0 => self
                .strengths
                .par_iter()
                .map(|&c| self.evaluate_point(dataset, c))
                .collect(),
            n => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| NliError::ThreadPoolError(e.to_string()))?;
                pool.install(|| {
                    self.strengths
                        .par_iter()
                        .map(|&c| self.evaluate_point(dataset, c))
                        .collect()
                })
            }
        }
    }

    /// Fit and score every strength, then select the best
    pub fn run(&self, dataset: &Dataset) -> Result<SweepResult> {
        self.validate()?;
        info!(
            n_strengths = self.strengths.len(),
            penalty = %self.penalty,
            n_jobs = self.n_jobs,
            "Starting regularization sweep"
        );

        let points = self.map_points(dataset)?;
        let best_index = select_best(&points)
            .ok_or_else(|| NliError::TrainingError("sweep produced no points".to_string()))?;

        let best = &points[best_index];
        info!(c = best.c, test = best.test, "Selected regularization strength");

        Ok(SweepResult {
            penalty: self.penalty,
            points,
            best_index,
        })
    }

    /// Refit at `c` and evaluate every split against the test split's class ordering
    pub fn final_run(&self, dataset: &Dataset, c: f64) -> Result<FinalRun> {
        let model = self.trainer_for(c).fit(&dataset.train.features, &dataset.train.labels)?;
        let classes = dataset.canonical_classes();

        let evaluate_split = |split: Split| -> Result<EvaluationResult> {
            let data = dataset.split(split);
            let predictions = model.predict(&data.features)?;
            evaluate_with_classes(&data.labels, &predictions, &classes)
        };

        let train = evaluate_split(Split::Train)?;
        let test = evaluate_split(Split::Test)?;
        let eval = evaluate_split(Split::Eval)?;

        Ok(FinalRun { model, train, test, eval })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SplitData;
    use ndarray::array;

    fn point(c: f64, test: f64) -> SweepPoint {
        SweepPoint { c, train: 1.0, test, eval: 0.5, converged: true }
    }

    fn s(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn toy_dataset() -> Dataset {
        let split = || {
            SplitData::new(
                array![[-2.0, -1.0], [2.0, 1.0], [-1.5, -2.0], [1.5, 2.0]],
                s(&["en", "fr", "en", "fr"]),
            )
            .unwrap()
        };
        Dataset::new(split(), split(), split()).unwrap()
    }

    #[test]
    fn test_select_best_earliest_tie() {
        let points = vec![point(0.1, 0.80), point(1.0, 0.85), point(10.0, 0.85)];
        assert_eq!(select_best(&points), Some(1));
    }

    #[test]
    fn test_select_best_single_and_empty() {
        assert_eq!(select_best(&[point(5.0, 0.1)]), Some(0));
        assert_eq!(select_best(&[]), None);
    }

    #[test]
    fn test_run_preserves_input_order() {
        let dataset = toy_dataset();
        let strengths = vec![10.0, 0.01, 1.0];
        let result = HyperparameterSweep::new(strengths.clone(), Penalty::L2)
            .run(&dataset)
            .unwrap();
        assert_eq!(result.strengths(), strengths);
        assert_eq!(result.points.len(), 3);
        assert!(result.best().test >= result.points.iter().map(|p| p.test).fold(0.0, f64::max));
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let dataset = toy_dataset();
        let sweep = HyperparameterSweep::new(vec![0.1, 1.0, 100.0], Penalty::L2);
        let sequential = sweep.clone().with_n_jobs(1).run(&dataset).unwrap();
        let pooled = sweep.with_n_jobs(2).run(&dataset).unwrap();
        assert_eq!(sequential.points, pooled.points);
        assert_eq!(sequential.best_index, pooled.best_index);
    }

    #[test]
    fn test_invalid_strengths() {
        let dataset = toy_dataset();
        for strengths in [vec![], vec![1.0, -1.0], vec![f64::NAN]] {
            let err = HyperparameterSweep::new(strengths, Penalty::L2).run(&dataset).unwrap_err();
            assert!(matches!(err, NliError::InvalidParameter { .. }));
        }
    }

    #[test]
    fn test_final_run_uses_test_class_order() {
        let dataset = toy_dataset();
        let final_run = HyperparameterSweep::default().final_run(&dataset, 1.0).unwrap();
        for split in Split::ALL {
            assert_eq!(final_run.split(split).classes(), &s(&["en", "fr"])[..]);
        }
        assert_eq!(final_run.train.accuracy, 1.0);
    }
}
