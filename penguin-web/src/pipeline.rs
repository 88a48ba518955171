//! Prediction Pipeline adapter
//!
//! The trained artifact is a JSON `LinearPipeline`: a feature encoder
//! (standard scaling of numeric features, one-hot encoding of categorical
//! features) followed by a multinomial logistic-regression model.
//!
//! The web handler consumes it through the `Classifier` trait.
//! `ArtifactClassifier` re-reads the artifact from disk on every call, so
//! a retrained model is picked up without a restart and a missing artifact
//! surfaces as `Error::ModelMissing` instead of triggering training.

use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, Axis};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use penguin_common::{Error, NumericFeature, Observation, PredictionResult, Result, Species};

/// Maps an unclassified observation to a species and confidence
pub trait Classifier: Send + Sync {
    fn classify(&self, observation: &Observation) -> Result<PredictionResult>;
}

// ========================================
// Feature encoding
// ========================================

/// Standard-scaler parameters for one numeric feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub feature: NumericFeature,
    pub mean: f64,
    pub scale: f64,
}

/// Categorical input columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalFeature {
    Island,
    Sex,
}

impl CategoricalFeature {
    pub const ALL: [CategoricalFeature; 2] = [CategoricalFeature::Island, CategoricalFeature::Sex];

    fn value_of(&self, observation: &Observation) -> Option<&'static str> {
        match self {
            CategoricalFeature::Island => Some(observation.island.as_str()),
            CategoricalFeature::Sex => observation.sex.map(|s| s.as_str()),
        }
    }
}

/// One-hot categories for one categorical feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotParams {
    pub feature: CategoricalFeature,
    pub categories: Vec<String>,
}

/// Turns an observation into the model's input vector
///
/// Layout: scaled numeric features in encoder order, then each categorical
/// feature's one-hot block. Unknown or absent categories encode as zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    pub numeric: Vec<ScalerParams>,
    pub categorical: Vec<OneHotParams>,
}

impl FeatureEncoder {
    /// Fit scaler statistics and category lists on a sample
    pub fn fit(observations: &[&Observation]) -> Self {
        let features = NumericFeature::ALL;
        let raw = Array2::from_shape_fn((observations.len(), features.len()), |(i, j)| {
            observations[i].numeric(features[j])
        });
        let (mean, std) = if observations.is_empty() {
            (Array1::zeros(features.len()), Array1::zeros(features.len()))
        } else {
            let mean = raw
                .mean_axis(Axis(0))
                .unwrap_or_else(|| Array1::zeros(features.len()));
            (mean, raw.std_axis(Axis(0), 0.0))
        };

        let numeric = features
            .into_iter()
            .zip(mean.iter().zip(std.iter()))
            .map(|(feature, (&mean, &scale))| ScalerParams {
                feature,
                mean,
                scale,
            })
            .collect();

        let categorical = CategoricalFeature::ALL
            .into_iter()
            .map(|feature| {
                let mut categories: Vec<String> = observations
                    .iter()
                    .filter_map(|o| feature.value_of(o))
                    .map(str::to_string)
                    .collect();
                categories.sort();
                categories.dedup();
                OneHotParams {
                    feature,
                    categories,
                }
            })
            .collect();

        Self {
            numeric,
            categorical,
        }
    }

    /// Length of the encoded vector
    pub fn width(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|c| c.categories.len())
                .sum::<usize>()
    }

    pub fn encode(&self, observation: &Observation) -> Array1<f64> {
        let mut row = Vec::with_capacity(self.width());

        for params in &self.numeric {
            // Zero-variance features are centred but not scaled
            let scale = if params.scale > 0.0 { params.scale } else { 1.0 };
            row.push((observation.numeric(params.feature) - params.mean) / scale);
        }

        for params in &self.categorical {
            let value = params.feature.value_of(observation);
            row.extend(
                params
                    .categories
                    .iter()
                    .map(|c| if Some(c.as_str()) == value { 1.0 } else { 0.0 }),
            );
        }

        Array1::from(row)
    }

    /// Design matrix with one encoded row per observation
    pub fn encode_all(&self, observations: &[&Observation]) -> Array2<f64> {
        let mut matrix = Array2::zeros((observations.len(), self.width()));
        for (mut row, observation) in matrix.rows_mut().into_iter().zip(observations) {
            row.assign(&self.encode(observation));
        }
        matrix
    }
}

// ========================================
// Linear model
// ========================================

/// Multinomial logistic regression weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub classes: Vec<Species>,
    /// One weight row per class, `encoder.width()` columns
    pub coefficients: Array2<f64>,
    pub intercepts: Array1<f64>,
}

impl LinearModel {
    /// Class probabilities for an already-encoded row
    pub fn probabilities(&self, row: &Array1<f64>) -> Array1<f64> {
        let scores = self.coefficients.dot(row) + &self.intercepts;
        softmax(scores.view())
    }
}

/// Serialized pipeline artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPipeline {
    pub encoder: FeatureEncoder,
    pub model: LinearModel,
}

impl LinearPipeline {
    /// Load an artifact from disk
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ModelMissing(path.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;
        let pipeline: LinearPipeline = serde_json::from_str(&text)
            .map_err(|e| Error::Model(format!("Unreadable artifact {}: {}", path.display(), e)))?;
        pipeline.check_shape()?;
        debug!(path = %path.display(), classes = pipeline.model.classes.len(), "Loaded model artifact");
        Ok(pipeline)
    }

    /// Write the artifact as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Verify weight dimensions agree with the encoder
    pub fn check_shape(&self) -> Result<()> {
        let model = &self.model;
        if model.classes.is_empty() {
            return Err(Error::Model("artifact has no classes".to_string()));
        }
        if model.coefficients.nrows() != model.classes.len()
            || model.intercepts.len() != model.classes.len()
        {
            return Err(Error::Model(format!(
                "expected {} weight rows and intercepts, found {} and {}",
                model.classes.len(),
                model.coefficients.nrows(),
                model.intercepts.len()
            )));
        }
        let width = self.encoder.width();
        if model.coefficients.ncols() != width {
            return Err(Error::Model(format!(
                "weight rows have {} entries, encoder produces {}",
                model.coefficients.ncols(),
                width
            )));
        }
        Ok(())
    }

    /// Probability per class, in `model.classes` order
    pub fn predict_proba(&self, observation: &Observation) -> Array1<f64> {
        self.model.probabilities(&self.encoder.encode(observation))
    }

    /// Most probable class and its probability
    pub fn predict(&self, observation: &Observation) -> (Species, f64) {
        let proba = self.predict_proba(observation);
        let (index, best) = argmax(proba.view());
        (self.model.classes[index], best)
    }
}

impl Classifier for LinearPipeline {
    fn classify(&self, observation: &Observation) -> Result<PredictionResult> {
        let (species, confidence) = self.predict(observation);
        if !confidence.is_finite() {
            return Err(Error::Model("classifier produced a non-finite probability".to_string()));
        }
        Ok(PredictionResult {
            species,
            confidence: round_to(confidence, 4),
        })
    }
}

/// Classifier backed by the artifact file, read on every call
#[derive(Debug, Clone)]
pub struct ArtifactClassifier {
    path: PathBuf,
}

impl ArtifactClassifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Classifier for ArtifactClassifier {
    fn classify(&self, observation: &Observation) -> Result<PredictionResult> {
        LinearPipeline::load(&self.path)?.classify(observation)
    }
}

// ========================================
// Numeric helpers
// ========================================

/// Numerically stable softmax over one row of scores
pub fn softmax(scores: ArrayView1<f64>) -> Array1<f64> {
    let mut out = scores.to_owned();
    softmax_in_place(out.view_mut());
    out
}

/// Replace a row of scores with its softmax
pub fn softmax_in_place(mut row: ArrayViewMut1<f64>) {
    let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
    row.mapv_inplace(|v| (v - max).exp());
    let total = row.sum();
    row /= total;
}

/// Index and value of the largest entry (first wins on ties)
pub fn argmax(values: ArrayView1<f64>) -> (usize, f64) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        })
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
