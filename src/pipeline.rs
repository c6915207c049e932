//! End-to-end experiment: load, sweep, refit, report

use crate::config::ExperimentConfig;
use crate::data::Dataset;
use crate::error::Result;
use crate::report::{publish, ConsoleReporter, PlotReporter, Reporter};
use crate::training::{FinalRun, HyperparameterSweep, LogisticRegression, SweepResult};
use crate::utils::Timer;
use tracing::info;

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct ExperimentOutcome {
    pub sweep: SweepResult,
    pub final_run: FinalRun,
}

impl ExperimentOutcome {
    pub fn best_c(&self) -> f64 {
        self.sweep.best().c
    }
}

/// A validated configuration ready to run
#[derive(Debug, Clone)]
pub struct Experiment {
    config: ExperimentConfig,
}

impl Experiment {
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Sweep configured with the experiment's strengths, penalty and solver settings
    pub fn hyperparameter_sweep(&self) -> HyperparameterSweep {
        let trainer = LogisticRegression::from_config(1.0, self.config.sweep.penalty, &self.config.training);
        HyperparameterSweep::new(self.config.sweep.strengths.clone(), self.config.sweep.penalty)
            .with_trainer(trainer)
            .with_n_jobs(self.config.sweep.n_jobs)
    }

    /// Stdout report plus figures when enabled
    pub fn default_reporters(&self) -> Result<Vec<Box<dyn Reporter>>> {
        let mut reporters: Vec<Box<dyn Reporter>> = vec![Box::new(ConsoleReporter::stdout())];
        if self.config.report.plots {
            reporters.push(Box::new(PlotReporter::new(
                &self.config.paths.image_dir,
                self.config.report.normalization,
            )?));
        }
        Ok(reporters)
    }

    /// Load the splits from disk, then run
    pub fn run(&self, reporters: &mut [Box<dyn Reporter>]) -> Result<ExperimentOutcome> {
        for reporter in reporters.iter_mut() {
            reporter.start(&self.config)?;
        }

        let timer = Timer::start("load");
        let dataset = Dataset::load(&self.config)?;
        timer.finish();

        self.run_on(&dataset, reporters)
    }

    /// Sweep, refit and report on an already loaded dataset
    pub fn run_on(&self, dataset: &Dataset, reporters: &mut [Box<dyn Reporter>]) -> Result<ExperimentOutcome> {
        let sweep = self.hyperparameter_sweep();

        let mut timer = Timer::start("train");
        let sweep_result = sweep.run(dataset)?;
        timer.lap("sweep");
        let final_run = sweep.final_run(dataset, sweep_result.best().c)?;
        timer.lap("final fit");
        timer.finish();

        info!(
            c = sweep_result.best().c,
            train = final_run.train.accuracy,
            test = final_run.test.accuracy,
            eval = final_run.eval.accuracy,
            "Final model evaluated"
        );

        let timer = Timer::start("report");
        for reporter in reporters.iter_mut() {
            publish(reporter.as_mut(), &sweep_result, &final_run)?;
        }
        timer.finish();

        Ok(ExperimentOutcome {
            sweep: sweep_result,
            final_run,
        })
    }
}
