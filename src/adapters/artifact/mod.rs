//! Model artifact adapter: JSON classifier plus calibrated metadata.
//!
//! A model directory holds:
//! - `model.json`: a linear discriminant (feature names, coefficients, intercept)
//! - `model_info.json`: the calibrated threshold and the expected column order
//! - `manifest.json` (optional): SHA-256 hashes binding both files
//!
//! A binary LDA is linear in the log-odds, so the positive-class probability
//! is `sigmoid(intercept + coefficients · x)`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::ModelConfig;
use crate::domain::ModelSchema;
use crate::ports::{Classifier, LoadedModel, ModelError, ModelLoader, ModelMetadata};

pub const MODEL_FILE: &str = "model.json";
pub const MODEL_INFO_FILE: &str = "model_info.json";
pub const MANIFEST_FILE: &str = "manifest.json";

const MODEL_KIND: &str = "linear_discriminant";
const MANIFEST_VERSION: u32 = 1;

/// On-disk layout of `model.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub kind: String,
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

/// On-disk layout of `model_info.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfoFile {
    pub optimal_threshold: f64,
    pub expected_columns: Vec<String>,
}

/// Integrity manifest for a model directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    /// Unix timestamp (seconds)
    pub created_at: i64,
    /// File name to lowercase SHA-256 hex
    pub files: BTreeMap<String, String>,
}

impl Manifest {
    /// Hash the model files in `dir` into a new manifest.
    ///
    /// # Errors
    /// Returns `ModelError::NotFound` if either model file is missing.
    pub fn for_dir(dir: &Path) -> Result<Self, ModelError> {
        let mut files = BTreeMap::new();
        for name in [MODEL_FILE, MODEL_INFO_FILE] {
            let bytes = read_bytes(&dir.join(name))?;
            files.insert(name.to_string(), sha256_hex(&bytes));
        }
        Ok(Self {
            version: MANIFEST_VERSION,
            created_at: chrono::Utc::now().timestamp(),
            files,
        })
    }
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Linear discriminant scored in log-odds space.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearDiscriminant {
    feature_names: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearDiscriminant {
    /// # Errors
    /// Returns `ModelError::Inconsistent` if the parameter lengths differ or a
    /// parameter is not finite.
    pub fn new(
        feature_names: Vec<String>,
        coefficients: Vec<f64>,
        intercept: f64,
    ) -> Result<Self, ModelError> {
        if feature_names.is_empty() {
            return Err(ModelError::Inconsistent("model has no features".into()));
        }
        if coefficients.len() != feature_names.len() {
            return Err(ModelError::Inconsistent(format!(
                "{} coefficients for {} features",
                coefficients.len(),
                feature_names.len()
            )));
        }
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::Inconsistent(
                "model parameters must be finite".into(),
            ));
        }
        Ok(Self {
            feature_names,
            coefficients,
            intercept,
        })
    }

    fn decision(&self, row: &[f64]) -> Result<f64, ModelError> {
        if row.len() != self.coefficients.len() {
            return Err(ModelError::Scoring(format!(
                "row has {} values, model expects {}",
                row.len(),
                self.coefficients.len()
            )));
        }
        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>())
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for LinearDiscriminant {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, rows: &[&[f64]]) -> Result<Vec<[f64; 2]>, ModelError> {
        rows.iter()
            .map(|row| {
                let p = sigmoid(self.decision(row)?);
                if p.is_finite() {
                    Ok([1.0 - p, p])
                } else {
                    Err(ModelError::Scoring("probability is not finite".into()))
                }
            })
            .collect()
    }
}

/// Loads a [`LinearDiscriminant`] and its metadata from a directory.
#[derive(Debug, Clone)]
pub struct JsonModelLoader {
    model_dir: PathBuf,
    require_manifest: bool,
}

impl JsonModelLoader {
    #[must_use]
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            model_dir: config.model_dir.clone(),
            require_manifest: config.require_manifest,
        }
    }

    #[must_use]
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Check `manifest.json` against the files on disk.
    fn verify_manifest(&self) -> Result<(), ModelError> {
        let path = self.model_dir.join(MANIFEST_FILE);
        if !path.exists() {
            if self.require_manifest {
                return Err(ModelError::MissingManifest { path });
            }
            tracing::warn!(dir = %self.model_dir.display(), "Loading model without integrity manifest");
            return Ok(());
        }

        let manifest: Manifest = read_json(&path)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ModelError::Malformed {
                path,
                reason: format!("unsupported manifest version {}", manifest.version),
            });
        }
        for required in [MODEL_FILE, MODEL_INFO_FILE] {
            if !manifest.files.contains_key(required) {
                return Err(ModelError::Malformed {
                    path,
                    reason: format!("manifest does not bind {required}"),
                });
            }
        }

        for (name, expected) in &manifest.files {
            if name.contains(['/', '\\']) || name == ".." {
                return Err(ModelError::Malformed {
                    path,
                    reason: format!("manifest entry '{name}' is not a plain file name"),
                });
            }
            let actual = sha256_hex(&read_bytes(&self.model_dir.join(name))?);
            if !actual.eq_ignore_ascii_case(expected.trim()) {
                return Err(ModelError::IntegrityMismatch { file: name.clone() });
            }
        }

        tracing::debug!(files = manifest.files.len(), "Model manifest verified");
        Ok(())
    }
}

impl ModelLoader for JsonModelLoader {
    type Model = LinearDiscriminant;

    fn load(&self) -> Result<LoadedModel<Self::Model>, ModelError> {
        self.verify_manifest()?;

        let model_path = self.model_dir.join(MODEL_FILE);
        let model: ModelFile = read_json(&model_path)?;
        if model.kind != MODEL_KIND {
            return Err(ModelError::Malformed {
                path: model_path,
                reason: format!("unsupported model kind '{}'", model.kind),
            });
        }
        let info: ModelInfoFile = read_json(&self.model_dir.join(MODEL_INFO_FILE))?;

        let threshold = info.optimal_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ModelError::Inconsistent(format!(
                "optimal_threshold {threshold} is outside [0, 1]"
            )));
        }
        if info.expected_columns != model.feature_names {
            return Err(ModelError::Inconsistent(
                "expected_columns do not match the model's feature names".into(),
            ));
        }
        let schema = ModelSchema::new(info.expected_columns)
            .map_err(|e| ModelError::Inconsistent(e.to_string()))?;
        let classifier =
            LinearDiscriminant::new(model.feature_names, model.coefficients, model.intercept)?;

        tracing::info!(
            dir = %self.model_dir.display(),
            features = schema.len(),
            threshold,
            "Loaded classifier"
        );

        Ok(LoadedModel {
            classifier,
            metadata: ModelMetadata {
                optimal_threshold: threshold,
                schema,
            },
        })
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ModelError> {
    fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ModelError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ModelError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes).map_err(|e| ModelError::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_model(dir: &Path, columns: &[&str], threshold: f64) {
        let model = ModelFile {
            kind: MODEL_KIND.into(),
            feature_names: columns.iter().map(|c| (*c).to_string()).collect(),
            coefficients: vec![0.5; columns.len()],
            intercept: -1.0,
        };
        let info = ModelInfoFile {
            optimal_threshold: threshold,
            expected_columns: model.feature_names.clone(),
        };
        fs::write(dir.join(MODEL_FILE), serde_json::to_vec(&model).expect("serialize"))
            .expect("write model");
        fs::write(dir.join(MODEL_INFO_FILE), serde_json::to_vec(&info).expect("serialize"))
            .expect("write info");
    }

    fn loader(dir: &Path, require_manifest: bool) -> JsonModelLoader {
        JsonModelLoader::new(&ModelConfig {
            model_dir: dir.to_path_buf(),
            require_manifest,
        })
    }

    #[test]
    fn test_load_without_manifest() {
        let temp = tempdir().expect("tempdir");
        write_model(temp.path(), &["BMI", "Sex"], 0.3);

        let loaded = loader(temp.path(), false).load().expect("Should load");
        assert_eq!(loaded.metadata.optimal_threshold, 0.3);
        assert_eq!(loaded.metadata.schema.columns(), &["BMI", "Sex"]);
        assert_eq!(loaded.classifier.feature_names(), &["BMI", "Sex"]);
    }

    #[test]
    fn test_missing_manifest_fatal_when_required() {
        let temp = tempdir().expect("tempdir");
        write_model(temp.path(), &["BMI"], 0.3);

        let err = loader(temp.path(), true).load().unwrap_err();
        assert!(matches!(err, ModelError::MissingManifest { .. }));
    }

    #[test]
    fn test_manifest_detects_tampering() {
        let temp = tempdir().expect("tempdir");
        write_model(temp.path(), &["BMI"], 0.3);
        let manifest = Manifest::for_dir(temp.path()).expect("Should hash");
        fs::write(
            temp.path().join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&manifest).expect("serialize"),
        )
        .expect("write manifest");

        assert!(loader(temp.path(), true).load().is_ok());

        write_model(temp.path(), &["BMI"], 0.9);
        let err = loader(temp.path(), true).load().unwrap_err();
        assert!(matches!(err, ModelError::IntegrityMismatch { file } if file == MODEL_INFO_FILE));
    }

    #[test]
    fn test_missing_artifact_is_not_found() {
        let temp = tempdir().expect("tempdir");
        let err = loader(temp.path(), false).load().unwrap_err();
        assert!(matches!(err, ModelError::NotFound { .. }));
    }

    #[test]
    fn test_column_mismatch_is_inconsistent() {
        let temp = tempdir().expect("tempdir");
        write_model(temp.path(), &["BMI", "Sex"], 0.3);
        let info = ModelInfoFile {
            optimal_threshold: 0.3,
            expected_columns: vec!["Sex".into(), "BMI".into()],
        };
        fs::write(
            temp.path().join(MODEL_INFO_FILE),
            serde_json::to_vec(&info).expect("serialize"),
        )
        .expect("write info");

        let err = loader(temp.path(), false).load().unwrap_err();
        assert!(matches!(err, ModelError::Inconsistent(_)));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let temp = tempdir().expect("tempdir");
        write_model(temp.path(), &["BMI"], 1.5);
        let err = loader(temp.path(), false).load().unwrap_err();
        assert!(matches!(err, ModelError::Inconsistent(_)));
    }

    #[test]
    fn test_linear_discriminant_scoring() {
        let model = LinearDiscriminant::new(vec!["a".into(), "b".into()], vec![1.0, -1.0], 0.0)
            .expect("valid model");

        let proba = model
            .predict_proba(&[&[2.0, 2.0], &[3.0, 0.0]])
            .expect("Should score");
        assert!((proba[0][1] - 0.5).abs() < 1e-12);
        assert!(proba[1][1] > 0.95);
        assert!((proba[1][0] + proba[1][1] - 1.0).abs() < 1e-12);

        assert_eq!(model.predict(&[&[0.0, 3.0], &[3.0, 0.0]]).expect("Should predict"), vec![0, 1]);
        assert!(matches!(
            model.predict_proba(&[&[1.0]]),
            Err(ModelError::Scoring(_))
        ));
    }
}
