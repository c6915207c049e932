//! SVG figures: accuracy vs. strength, per-class bars, confusion heatmaps

use super::Reporter;
use crate::data::Split;
use crate::error::{NliError, Result};
use crate::evaluation::{EvaluationResult, NormalizationPolicy};
use crate::training::SweepResult;
use ndarray::Array2;
use plotters::prelude::*;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::info;

const LINE_SIZE: (u32, u32) = (800, 600);
const BAR_SIZE: (u32, u32) = (900, 600);
const HEATMAP_SIZE: (u32, u32) = (1000, 1000);
const CAPTION_FONT: u32 = 24;

const TRAIN_COLOR: RGBColor = RGBColor(31, 119, 180);
const TEST_COLOR: RGBColor = RGBColor(255, 127, 14);
const EVAL_COLOR: RGBColor = RGBColor(44, 160, 44);
const HEAT_LOW: RGBColor = RGBColor(247, 251, 255);
const HEAT_HIGH: RGBColor = RGBColor(8, 48, 107);

fn render_err(e: impl Display) -> NliError {
    NliError::RenderError(e.to_string())
}

fn split_color(split: Split) -> RGBColor {
    match split {
        Split::Train => TRAIN_COLOR,
        Split::Test => TEST_COLOR,
        Split::Eval => EVAL_COLOR,
    }
}

/// Linear blend between the two heatmap endpoints, `t` in [0, 1]
fn heat_color(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    RGBColor(
        mix(HEAT_LOW.0, HEAT_HIGH.0),
        mix(HEAT_LOW.1, HEAT_HIGH.1),
        mix(HEAT_LOW.2, HEAT_HIGH.2),
    )
}

/// Log-axis bounds around the swept strengths
fn log_bounds(strengths: &[f64]) -> (f64, f64) {
    let lo = strengths.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = strengths.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        (lo / 10.0, hi * 10.0)
    } else {
        (lo / 2.0, hi * 2.0)
    }
}

fn class_label(classes: &[String], value: &SegmentValue<usize>) -> String {
    match value {
        SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => classes.get(*i).cloned().unwrap_or_default(),
        SegmentValue::Last => String::new(),
    }
}

/// One or more accuracy-vs-C polylines on a log x axis
fn draw_accuracy_chart(
    path: &Path,
    caption: &str,
    y_desc: &str,
    strengths: &[f64],
    series: &[(&str, Vec<f64>, RGBColor)],
    legend: bool,
) -> Result<()> {
    let root = SVGBackend::new(path, LINE_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let (lo, hi) = log_bounds(strengths);
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", CAPTION_FONT).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(55)
        .build_cartesian_2d((lo..hi).log_scale(), 0f64..1f64)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_desc("C")
        .y_desc(y_desc)
        .draw()
        .map_err(render_err)?;

    for (label, values, color) in series {
        let color = *color;
        let points: Vec<(f64, f64)> = strengths.iter().copied().zip(values.iter().copied()).collect();

        chart
            .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))
            .map_err(render_err)?
            .label(*label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart
            .draw_series(points.into_iter().map(|p| Circle::new(p, 4, color.filled())))
            .map_err(render_err)?;
    }

    if legend {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::LowerRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(render_err)?;
    }

    root.present().map_err(render_err)?;
    Ok(())
}

/// One bar per class, values in [0, 1]
fn draw_class_bars(path: &Path, caption: &str, classes: &[String], values: &[f64], color: RGBColor) -> Result<()> {
    let root = SVGBackend::new(path, BAR_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let k = classes.len();
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", CAPTION_FONT).into_font())
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(55)
        .build_cartesian_2d((0..k).into_segmented(), 0f64..1f64)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(k)
        .x_label_formatter(&|v| class_label(classes, v))
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(values.iter().enumerate().map(|(i, &v)| {
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), v)],
                color.mix(0.8).filled(),
            );
            bar.set_margin(0, 0, 8, 8);
            bar
        }))
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(())
}

/// Heatmap with true classes as rows (top to bottom) and predicted classes as columns
fn draw_heatmap(path: &Path, caption: &str, classes: &[String], cells: &Array2<f64>, decimals: usize) -> Result<()> {
    let root = SVGBackend::new(path, HEATMAP_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let k = classes.len();
    let max = cells.iter().copied().filter(|v| v.is_finite()).fold(0.0_f64, f64::max);
    let threshold = max / 2.0;
    // Row 0 is drawn at the top
    let flip = |i: usize| k - 1 - i;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", CAPTION_FONT).into_font())
        .margin(15)
        .x_label_area_size(80)
        .y_label_area_size(120)
        .build_cartesian_2d((0..k).into_segmented(), (0..k).into_segmented())
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(k)
        .y_labels(k)
        .x_desc("Predicted label")
        .y_desc("True label")
        .x_label_formatter(&|v| class_label(classes, v))
        .y_label_formatter(&|v| match v {
            SegmentValue::Exact(i) | SegmentValue::CenterOf(i) if *i < k => classes[flip(*i)].clone(),
            _ => String::new(),
        })
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(cells.indexed_iter().map(|((i, j), &v)| {
            let t = if max > 0.0 { v / max } else { 0.0 };
            Rectangle::new(
                [
                    (SegmentValue::Exact(j), SegmentValue::Exact(flip(i))),
                    (SegmentValue::Exact(j + 1), SegmentValue::Exact(flip(i) + 1)),
                ],
                heat_color(t).filled(),
            )
        }))
        .map_err(render_err)?;

    chart
        .draw_series(cells.indexed_iter().map(|((i, j), &v)| {
            let color = if v > threshold { WHITE } else { BLACK };
            Text::new(
                format!("{:.*}", decimals, v),
                (SegmentValue::CenterOf(j), SegmentValue::CenterOf(flip(i))),
                ("sans-serif", 16).into_font().color(&color),
            )
        }))
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(())
}

/// Writes every figure of a run into one directory
pub struct PlotReporter {
    image_dir: PathBuf,
    normalization: NormalizationPolicy,
}

impl PlotReporter {
    /// Create the reporter, creating the image directory if it is missing
    pub fn new(image_dir: impl Into<PathBuf>, normalization: NormalizationPolicy) -> Result<Self> {
        let image_dir = image_dir.into();
        std::fs::create_dir_all(&image_dir).map_err(|e| NliError::from_io(&image_dir, e))?;
        Ok(Self { image_dir, normalization })
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    fn file(&self, name: String) -> PathBuf {
        self.image_dir.join(name + ".svg")
    }
}

impl Reporter for PlotReporter {
    fn sweep(&mut self, sweep: &SweepResult) -> Result<()> {
        let strengths = sweep.strengths();
        let penalty = sweep.penalty.as_str();

        for split in Split::ALL {
            let path = self.file(format!("compare_c_{}_{}_accs", penalty, split));
            draw_accuracy_chart(
                &path,
                &format!("{} accuracy vs C", split),
                &format!("{} accuracy", split),
                &strengths,
                &[(split.as_str(), sweep.accuracies(split), split_color(split))],
                false,
            )?;
        }

        let series: Vec<(&str, Vec<f64>, RGBColor)> = Split::ALL
            .iter()
            .map(|&split| (split.as_str(), sweep.accuracies(split), split_color(split)))
            .collect();
        let path = self.file(format!("compare_c_{}_accs", penalty));
        draw_accuracy_chart(&path, "Accuracy vs C", "accuracy", &strengths, &series, true)?;

        info!(dir = %self.image_dir.display(), penalty, "Wrote sweep figures");
        Ok(())
    }

    fn split(&mut self, split: Split, evaluation: &EvaluationResult) -> Result<()> {
        let classes = evaluation.classes();
        let precision: Vec<f64> = evaluation.class_metrics.iter().map(|m| m.precision).collect();
        let recall: Vec<f64> = evaluation.class_metrics.iter().map(|m| m.recall).collect();

        draw_class_bars(
            &self.file(format!("{}_precision_barplot", split)),
            &format!("Precision per class ({})", split),
            classes,
            &precision,
            TRAIN_COLOR,
        )?;
        draw_class_bars(
            &self.file(format!("{}_recall_barplot", split)),
            &format!("Recall per class ({})", split),
            classes,
            &recall,
            TEST_COLOR,
        )?;

        let counts = evaluation.confusion.counts.mapv(|v| v as f64);
        draw_heatmap(
            &self.file(format!("conf_matrix_{}", split)),
            &format!("Confusion matrix for dataset {}, without normalization", split),
            classes,
            &counts,
            0,
        )?;
        draw_heatmap(
            &self.file(format!("conf_matrix_{}_normalize", split)),
            &format!("Confusion matrix for dataset {}, with normalization", split),
            classes,
            &evaluation.confusion.normalized(self.normalization),
            2,
        )?;

        info!(split = %split, dir = %self.image_dir.display(), "Wrote split figures");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::evaluate;
    use crate::training::{Penalty, SweepPoint};

    fn s(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_log_bounds() {
        assert_eq!(log_bounds(&[1.0]), (0.1, 10.0));
        assert_eq!(log_bounds(&[0.01, 1.0, 100.0]), (0.005, 200.0));
    }

    #[test]
    fn test_heat_color_endpoints() {
        assert_eq!(heat_color(0.0), HEAT_LOW);
        assert_eq!(heat_color(1.0), HEAT_HIGH);
        assert_eq!(heat_color(f64::NAN), HEAT_LOW);
    }

    #[test]
    fn test_creates_directory_and_writes_figures() {
        let tmp = tempfile::tempdir().unwrap();
        let image_dir = tmp.path().join("images");
        let mut reporter = PlotReporter::new(&image_dir, NormalizationPolicy::ClipToZero).unwrap();
        assert!(image_dir.is_dir());

        let sweep = SweepResult {
            penalty: Penalty::L2,
            points: vec![
                SweepPoint { c: 0.1, train: 0.7, test: 0.6, eval: 0.6, converged: true },
                SweepPoint { c: 10.0, train: 1.0, test: 0.8, eval: 0.7, converged: true },
            ],
            best_index: 1,
        };
        reporter.sweep(&sweep).unwrap();

        let result = evaluate(&s(&["en", "fr", "en"]), &s(&["en", "fr", "fr"])).unwrap();
        reporter.split(Split::Test, &result).unwrap();

        for name in [
            "compare_c_l2_train_accs.svg",
            "compare_c_l2_test_accs.svg",
            "compare_c_l2_eval_accs.svg",
            "compare_c_l2_accs.svg",
            "test_precision_barplot.svg",
            "test_recall_barplot.svg",
            "conf_matrix_test.svg",
            "conf_matrix_test_normalize.svg",
        ] {
            let path = image_dir.join(name);
            assert!(path.is_file(), "missing {}", name);
            let body = std::fs::read_to_string(&path).unwrap();
            assert!(body.contains("<svg"));
        }
    }
}
