//! Observation and prediction records

use serde::{Deserialize, Serialize};

use crate::features::{Island, NumericFeature, Sex, Species};

/// One penguin's measurements plus its species once classified
///
/// Field order matches the prediction log column order, so serializing
/// an `Observation` through `csv` always yields
/// `species, island, bill_length_mm, bill_depth_mm, flipper_length_mm, body_mass_g, sex`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Absent on input, present after classification
    #[serde(default)]
    pub species: Option<Species>,
    pub island: Island,
    pub bill_length_mm: f64,
    pub bill_depth_mm: f64,
    pub flipper_length_mm: f64,
    pub body_mass_g: f64,
    #[serde(default)]
    pub sex: Option<Sex>,
}

impl Observation {
    /// Value of a numeric feature
    pub fn numeric(&self, feature: NumericFeature) -> f64 {
        match feature {
            NumericFeature::BillLengthMm => self.bill_length_mm,
            NumericFeature::BillDepthMm => self.bill_depth_mm,
            NumericFeature::FlipperLengthMm => self.flipper_length_mm,
            NumericFeature::BodyMassG => self.body_mass_g,
        }
    }

    /// Attach the predicted species
    pub fn with_species(mut self, species: Species) -> Self {
        self.species = Some(species);
        self
    }
}

/// Classifier output for one observation
///
/// Produced once per classify action and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub species: Species,
    /// Maximum class probability in `[0, 1]`, rounded to 4 places
    pub confidence: f64,
}

impl PredictionResult {
    /// Confidence as a percentage rounded to 2 places
    pub fn confidence_percent(&self) -> f64 {
        (self.confidence * 100.0 * 100.0).round() / 100.0
    }
}
