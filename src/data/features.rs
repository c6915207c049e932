//! Sentinel-token embedding extraction from line-delimited JSON
//!
//! Each line of a `<split>.jsonlines` file holds the per-token output of the embedding
//! model for one example:
//!
//! ```json
//! {"features": [{"token": "[CLS]", "layers": [{"values": [0.1, -0.2]}]}, ...]}
//! ```
//!
//! Only the vector of the first sentinel annotation at the configured layer is kept.

use super::Split;
use crate::config::DataConfig;
use crate::error::{NliError, Result};
use ndarray::Array2;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct FeatureRecord {
    features: Vec<TokenAnnotation>,
}

#[derive(Debug, Deserialize)]
struct TokenAnnotation {
    token: String,
    layers: Vec<LayerValues>,
}

#[derive(Debug, Deserialize)]
struct LayerValues {
    values: Vec<f64>,
}

/// Which annotation and layer to read from each record
#[derive(Debug, Clone)]
pub struct FeatureOptions {
    pub sentinel_token: String,
    pub layer_index: usize,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self {
            sentinel_token: "[CLS]".to_string(),
            layer_index: 0,
        }
    }
}

impl From<&DataConfig> for FeatureOptions {
    fn from(config: &DataConfig) -> Self {
        Self {
            sentinel_token: config.sentinel_token.clone(),
            layer_index: config.layer_index,
        }
    }
}

/// Path of the feature file for a split
pub fn feature_path(dir: &Path, split: Split) -> PathBuf {
    dir.join(format!("{}.jsonlines", split))
}

/// Load the feature matrix of one split
pub fn load_split_features(dir: &Path, split: Split, options: &FeatureOptions) -> Result<Array2<f64>> {
    let path = feature_path(dir, split);
    let vectors = read_feature_file(&path, options)?;

    let n_rows = vectors.len();
    let n_cols = vectors.first().map_or(0, Vec::len);
    let flat: Vec<f64> = vectors.into_iter().flatten().collect();
    Ok(Array2::from_shape_vec((n_rows, n_cols), flat)?)
}

/// Read one vector per line, failing on the first malformed record
pub fn read_feature_file(path: &Path, options: &FeatureOptions) -> Result<Vec<Vec<f64>>> {
    let file = File::open(path).map_err(|e| NliError::from_io(path, e))?;
    let reader = BufReader::new(file);

    let mut vectors: Vec<Vec<f64>> = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let malformed = |reason: String| NliError::DataFormat {
            path: path.to_path_buf(),
            line: line_no,
            reason,
        };
        let line = line.map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => malformed(e.to_string()),
            _ => NliError::IoError(e),
        })?;

        let record: FeatureRecord =
            serde_json::from_str(&line).map_err(|e| malformed(e.to_string()))?;
        let vector = extract_sentinel_vector(record, options).map_err(malformed)?;

        if let Some(first) = vectors.first() {
            if first.len() != vector.len() {
                return Err(malformed(format!(
                    "vector has {} values, expected {}",
                    vector.len(),
                    first.len()
                )));
            }
        }
        vectors.push(vector);
    }

    debug!(
        path = %path.display(),
        n_vectors = vectors.len(),
        dim = vectors.first().map_or(0, Vec::len),
        "Read feature file"
    );
    Ok(vectors)
}

fn extract_sentinel_vector(
    record: FeatureRecord,
    options: &FeatureOptions,
) -> std::result::Result<Vec<f64>, String> {
    let annotation = record
        .features
        .into_iter()
        .find(|t| t.token == options.sentinel_token)
        .ok_or_else(|| format!("no {} annotation", options.sentinel_token))?;

    annotation
        .layers
        .into_iter()
        .nth(options.layer_index)
        .map(|layer| layer.values)
        .ok_or_else(|| {
            format!(
                "{} annotation has no layer {}",
                options.sentinel_token, options.layer_index
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_lines(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn test_takes_first_sentinel_first_layer() {
        let file = write_lines(&[
            r#"{"linex_index": 0, "features": [
                {"token": "hello", "layers": [{"index": -1, "values": [9.0, 9.0]}]},
                {"token": "[CLS]", "layers": [{"index": -1, "values": [1.0, 2.0]}, {"index": -2, "values": [3.0, 4.0]}]},
                {"token": "[CLS]", "layers": [{"index": -1, "values": [5.0, 6.0]}]}
            ]}"#
            .replace('\n', " ")
            .as_str(),
        ]);

        let vectors = read_feature_file(file.path(), &FeatureOptions::default()).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn test_configured_layer() {
        let file = write_lines(&[
            r#"{"features": [{"token": "[CLS]", "layers": [{"values": [1.0]}, {"values": [2.0]}]}]}"#,
        ]);
        let options = FeatureOptions { layer_index: 1, ..FeatureOptions::default() };
        let vectors = read_feature_file(file.path(), &options).unwrap();
        assert_eq!(vectors, vec![vec![2.0]]);
    }

    #[test]
    fn test_missing_sentinel_reports_line() {
        let file = write_lines(&[
            r#"{"features": [{"token": "[CLS]", "layers": [{"values": [1.0]}]}]}"#,
            r#"{"features": [{"token": "the", "layers": [{"values": [1.0]}]}]}"#,
        ]);
        let err = read_feature_file(file.path(), &FeatureOptions::default()).unwrap_err();
        match err {
            NliError::DataFormat { line, reason, .. } => {
                assert_eq!(line, 2);
                assert!(reason.contains("[CLS]"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_utf8_reports_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"features": [{{"token": "[CLS]", "layers": [{{"values": [1.0]}}]}}]}}"#).unwrap();
        file.write_all(b"{\"features\": [\xff\xfe]}\n").unwrap();

        match read_feature_file(file.path(), &FeatureOptions::default()) {
            Err(NliError::DataFormat { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected DataFormat error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_layer() {
        let file = write_lines(&[r#"{"features": [{"token": "[CLS]", "layers": []}]}"#]);
        let err = read_feature_file(file.path(), &FeatureOptions::default()).unwrap_err();
        assert!(matches!(err, NliError::DataFormat { line: 1, .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_lines(&["{not json"]);
        let err = read_feature_file(file.path(), &FeatureOptions::default()).unwrap_err();
        assert!(matches!(err, NliError::DataFormat { line: 1, .. }));
    }

    #[test]
    fn test_inconsistent_dimension() {
        let file = write_lines(&[
            r#"{"features": [{"token": "[CLS]", "layers": [{"values": [1.0, 2.0]}]}]}"#,
            r#"{"features": [{"token": "[CLS]", "layers": [{"values": [1.0]}]}]}"#,
        ]);
        let err = read_feature_file(file.path(), &FeatureOptions::default()).unwrap_err();
        assert!(matches!(err, NliError::DataFormat { line: 2, .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = read_feature_file(Path::new("/nonexistent/train.jsonlines"), &FeatureOptions::default())
            .unwrap_err();
        assert!(matches!(err, NliError::FileNotFound(_)));
    }

    #[test]
    fn test_load_split_builds_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = File::create(dir.path().join("eval.jsonlines")).unwrap();
        writeln!(file, r#"{{"features": [{{"token": "[CLS]", "layers": [{{"values": [1.0, 2.0, 3.0]}}]}}]}}"#).unwrap();
        writeln!(file, r#"{{"features": [{{"token": "[CLS]", "layers": [{{"values": [4.0, 5.0, 6.0]}}]}}]}}"#).unwrap();

        let x = load_split_features(dir.path(), Split::Eval, &FeatureOptions::default()).unwrap();
        assert_eq!(x.dim(), (2, 3));
        assert_eq!(x[[1, 2]], 6.0);
    }
}
