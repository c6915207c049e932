//! Reporting of sweep and evaluation results
//!
//! - [`console`] - text report on any `io::Write`
//! - [`plots`] - SVG figures in the image directory

pub mod console;
pub mod plots;

pub use console::ConsoleReporter;
pub use plots::PlotReporter;

use crate::config::ExperimentConfig;
use crate::data::Split;
use crate::error::Result;
use crate::evaluation::EvaluationResult;
use crate::training::{FinalRun, SweepResult};

/// Consumer of experiment results
pub trait Reporter {
    /// Called once before any result is available
    fn start(&mut self, _config: &ExperimentConfig) -> Result<()> {
        Ok(())
    }

    fn sweep(&mut self, sweep: &SweepResult) -> Result<()>;

    fn split(&mut self, split: Split, evaluation: &EvaluationResult) -> Result<()>;
}

/// Hand the sweep and every split of the final run to a reporter, in split order
pub fn publish(reporter: &mut dyn Reporter, sweep: &SweepResult, final_run: &FinalRun) -> Result<()> {
    reporter.sweep(sweep)?;
    for split in Split::ALL {
        reporter.split(split, final_run.split(split))?;
    }
    Ok(())
}
