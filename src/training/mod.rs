//! Model training
//!
//! - [`logistic`] - multinomial logistic regression with L2/L1/no penalty
//! - [`sweep`] - regularization strength sweep, selection and final refit

pub mod logistic;
pub mod sweep;

pub use logistic::{LogisticModel, LogisticRegression, Penalty};
pub use sweep::{select_best, FinalRun, HyperparameterSweep, SweepPoint, SweepResult};
