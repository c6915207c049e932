//! Command-line interface
//!
//! Flags override values from `--config`, which override the built-in defaults.

use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::ExperimentConfig;
use crate::pipeline::{Experiment, ExperimentOutcome};
use crate::training::Penalty;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString    { s.truecolor(100, 210, 120) }
fn warn(s: &str) -> ColoredString  { s.truecolor(230, 180, 80) }

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<14} {}", muted(key), val.white());
}

// ─── Arguments ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug, Default)]
#[command(name = "nli-probe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Probe sentence embeddings for native language identification")]
#[command(long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the label CSV tables
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory holding <split>.jsonlines feature files
    #[arg(long)]
    pub feature_dir: Option<PathBuf>,

    /// Directory for SVG figures (created if missing)
    #[arg(long)]
    pub image_dir: Option<PathBuf>,

    /// Comma-separated regularization strengths, e.g. 0.1,1,10
    #[arg(long, value_delimiter = ',')]
    pub strengths: Option<Vec<f64>>,

    /// Weight penalty (l2, l1, none)
    #[arg(long)]
    pub penalty: Option<Penalty>,

    /// Solver iteration cap per fit
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Sweep workers: 0 = all cores, 1 = sequential
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Skip figure generation
    #[arg(long)]
    pub no_plots: bool,
}

impl Cli {
    /// Resolve the configuration: defaults, then `--config`, then flags
    pub fn build_config(&self) -> crate::error::Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::from_json_file(path)?,
            None => ExperimentConfig::default(),
        };

        if let Some(dir) = &self.data_dir {
            config = config.with_data_dir(dir);
        }
        if let Some(dir) = &self.feature_dir {
            config = config.with_feature_dir(dir);
        }
        if let Some(dir) = &self.image_dir {
            config = config.with_image_dir(dir);
        }
        if let Some(strengths) = &self.strengths {
            config = config.with_strengths(strengths.clone());
        }
        if let Some(penalty) = self.penalty {
            config = config.with_penalty(penalty);
        }
        if let Some(max_iter) = self.max_iter {
            config = config.with_max_iter(max_iter);
        }
        if let Some(jobs) = self.jobs {
            config = config.with_n_jobs(jobs);
        }
        if self.no_plots {
            config = config.with_plots(false);
        }
        Ok(config)
    }
}

fn print_summary(outcome: &ExperimentOutcome, experiment: &Experiment, elapsed_secs: f64) {
    section("Summary");
    let best = outcome.sweep.best();
    kv("Penalty", outcome.sweep.penalty.as_str());
    kv("Best C", &best.c.to_string());
    kv("Classes", &outcome.final_run.model.classes.len().to_string());
    kv("Features", &outcome.final_run.model.n_features().to_string());
    if experiment.config().report.plots {
        kv("Figures", &experiment.config().paths.image_dir.display().to_string());
    }

    let unconverged = outcome.sweep.points.iter().filter(|p| !p.converged).count();
    if unconverged > 0 {
        println!(
            "  {} {}",
            warn("!"),
            format!("{} of {} fits hit the iteration cap", unconverged, outcome.sweep.points.len())
        );
    }
    println!("  {} {}", ok("✓"), dim(&format!("done in {:.2}s", elapsed_secs)));
    println!();
}

/// Run the full experiment described by the arguments
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let start = Instant::now();
    let experiment = Experiment::new(cli.build_config()?)?;
    let mut reporters = experiment.default_reporters()?;
    let outcome = experiment.run(&mut reporters)?;
    print_summary(&outcome, &experiment, start.elapsed().as_secs_f64());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_uses_defaults() {
        let cli = Cli::try_parse_from(["nli-probe"]).unwrap();
        let config = cli.build_config().unwrap();
        assert_eq!(config.paths.data_dir, PathBuf::from("data"));
        assert_eq!(config.sweep.strengths.len(), 9);
        assert!(config.report.plots);
    }

    #[test]
    fn test_flags_override() {
        let cli = Cli::try_parse_from([
            "nli-probe",
            "--data-dir",
            "/tmp/labels",
            "--strengths",
            "0.1,1,10",
            "--penalty",
            "l1",
            "--jobs",
            "1",
            "--no-plots",
        ])
        .unwrap();
        let config = cli.build_config().unwrap();
        assert_eq!(config.paths.data_dir, PathBuf::from("/tmp/labels"));
        assert_eq!(config.sweep.strengths, vec![0.1, 1.0, 10.0]);
        assert_eq!(config.sweep.penalty, Penalty::L1);
        assert_eq!(config.sweep.n_jobs, 1);
        assert!(!config.report.plots);
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, br#"{"sweep": {"strengths": [5.0], "n_jobs": 4}}"#).unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let cli = Cli::try_parse_from(["nli-probe", "--config", &path, "--jobs", "2"]).unwrap();
        let config = cli.build_config().unwrap();
        assert_eq!(config.sweep.strengths, vec![5.0]);
        assert_eq!(config.sweep.n_jobs, 2);
    }

    #[test]
    fn test_bad_penalty_rejected() {
        assert!(Cli::try_parse_from(["nli-probe", "--penalty", "elasticnet"]).is_err());
    }
}
