//! Plain-text report
//!
//! Formatting is split into pure `format_*` functions so the exact layout can be tested
//! without capturing stdout.

use super::Reporter;
use crate::config::{ExperimentConfig, PathConfig};
use crate::data::Split;
use crate::error::Result;
use crate::evaluation::{AverageMetrics, ClassMetrics, EvaluationResult};
use crate::training::{SweepPoint, SweepResult};
use colored::Colorize;
use std::io::{self, IsTerminal, Write};

const SECTION_WIDTH: usize = 100;
const NO_TOP_MISS: &str = "none";
const AGGREGATE_TOP_MISS: &str = "-";

/// Directory banner printed before anything is loaded
pub fn format_banner(paths: &PathConfig) -> String {
    format!(
        "Data directory: {}\nFeature directory: {}\nImage directory: {}\n",
        paths.data_dir.display(),
        paths.feature_dir.display(),
        paths.image_dir.display()
    )
}

/// Selected strength and its three accuracies
pub fn format_best(point: &SweepPoint) -> String {
    format!(
        "Best c value was {} with accuracies:\n    train acc={:.2}%\t test acc={:.2}%\t eval acc={:.2}%\n",
        point.c,
        point.train * 100.0,
        point.test * 100.0,
        point.eval * 100.0
    )
}

/// Split name centered in a `=` rule
pub fn format_section_title(split: Split) -> String {
    format!("{:=^width$}", split.as_str().to_uppercase(), width = SECTION_WIDTH)
}

pub fn format_accuracy(split: Split, accuracy: f64) -> String {
    format!("Accuracy for {} dataset: accuracy={:.2}% \n", split, accuracy * 100.0)
}

fn format_row(name: &str, precision: f64, recall: f64, top_miss: &str) -> String {
    format!(
        "{:<15}{:>15.2}%{:>15.2}%{:>25}",
        name.to_uppercase(),
        precision * 100.0,
        recall * 100.0,
        top_miss
    )
}

fn class_row(metrics: &ClassMetrics) -> String {
    format_row(
        &metrics.class,
        metrics.precision,
        metrics.recall,
        metrics.top_miss.as_deref().unwrap_or(NO_TOP_MISS),
    )
}

fn average_row(name: &str, avg: &AverageMetrics) -> String {
    format_row(name, avg.precision, avg.recall, AGGREGATE_TOP_MISS)
}

/// Per-class precision/recall table followed by the accuracy, macro and weighted average rows
pub fn format_class_table(split: Split, evaluation: &EvaluationResult) -> String {
    let mut lines = vec![
        format!("Per Class metrics for dataset {}.\n", split.as_str().to_uppercase()),
        format!(
            "{:<15} {:>15} {:>15} {:>25}",
            "LANGUAGE", "PRECISION(%)", "RECALL(%)", "TOP MISS CLASS. LANGUAGE"
        ),
    ];
    lines.extend(evaluation.class_metrics.iter().map(class_row));
    lines.push(format_row("accuracy", evaluation.accuracy, evaluation.accuracy, AGGREGATE_TOP_MISS));
    lines.push(average_row("macro avg", &evaluation.macro_avg));
    lines.push(average_row("weighted avg", &evaluation.weighted_avg));
    lines.join("\n") + "\n"
}

/// Writes the text report to any sink
pub struct ConsoleReporter<W: Write> {
    out: W,
    color: bool,
}

impl ConsoleReporter<io::Stdout> {
    /// Report on stdout, colored when it is a terminal
    pub fn stdout() -> Self {
        let out = io::stdout();
        let color = out.is_terminal();
        Self { out, color }
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out, color: false }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn title(&self, text: String) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text
        }
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn start(&mut self, config: &ExperimentConfig) -> Result<()> {
        write!(self.out, "{}", format_banner(&config.paths))?;
        Ok(())
    }

    fn sweep(&mut self, sweep: &SweepResult) -> Result<()> {
        let best = self.title(format_best(sweep.best()));
        write!(self.out, "{}", best)?;
        Ok(())
    }

    fn split(&mut self, split: Split, evaluation: &EvaluationResult) -> Result<()> {
        let title = self.title(format_section_title(split));
        writeln!(self.out, "\n\n{}", title)?;
        writeln!(self.out, "Results for dataset {}", split.as_str().to_uppercase())?;
        writeln!(self.out, "{}", format_accuracy(split, evaluation.accuracy))?;
        write!(self.out, "{}", format_class_table(split, evaluation))?;
        if evaluation.confusion.unlisted > 0 {
            writeln!(
                self.out,
                "{} predictions fell outside the class list",
                evaluation.confusion.unlisted
            )?;
        }
        writeln!(self.out, "Confusion matrix, without normalization")?;
        writeln!(self.out, "Normalized confusion matrix")?;
        self.out.flush()?;
        Ok(())
    }
}
