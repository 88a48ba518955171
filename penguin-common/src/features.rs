//! Feature catalogue
//!
//! Fixed categorical vocabularies (island, sex, species) and the numeric
//! measurement features with their declared closed ranges. The ranges are
//! shared by the input widgets and the server-side validator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

// ========================================
// Column names
// ========================================

/// Column order of the prediction log
pub const CSV_HEADER: [&str; 7] = [
    "species",
    "island",
    "bill_length_mm",
    "bill_depth_mm",
    "flipper_length_mm",
    "body_mass_g",
    "sex",
];

/// Label column
pub const SPECIES_COLUMN: &str = "species";

/// Non-feature timestamp column present in the seed dataset
pub const TIMESTAMP_COLUMN: &str = "year";

// ========================================
// Categorical features
// ========================================

/// Island where the penguin was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Island {
    Torgersen,
    Biscoe,
    Dream,
}

impl Island {
    /// All islands in dropdown order
    pub const ALL: [Island; 3] = [Island::Torgersen, Island::Biscoe, Island::Dream];

    pub fn as_str(&self) -> &'static str {
        match self {
            Island::Torgersen => "Torgersen",
            Island::Biscoe => "Biscoe",
            Island::Dream => "Dream",
        }
    }
}

impl fmt::Display for Island {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Island {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Island::ALL
            .into_iter()
            .find(|island| island.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown island: {}", s)))
    }
}

/// Recorded sex of the penguin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub const ALL: [Sex; 2] = [Sex::Male, Sex::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Sex::ALL
            .into_iter()
            .find(|sex| sex.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown sex: {}", s)))
    }
}

/// Penguin species (classification label)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    Adelie,
    Chinstrap,
    Gentoo,
}

impl Species {
    pub const ALL: [Species; 3] = [Species::Adelie, Species::Chinstrap, Species::Gentoo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Adelie => "Adelie",
            Species::Chinstrap => "Chinstrap",
            Species::Gentoo => "Gentoo",
        }
    }

    /// Fixed chart color for this species
    pub fn color(&self) -> &'static str {
        match self {
            Species::Adelie => "#636EFA",
            Species::Chinstrap => "#EF553B",
            Species::Gentoo => "#00CC96",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Species {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Species::ALL
            .into_iter()
            .find(|species| species.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown species: {}", s)))
    }
}

// ========================================
// Numeric features
// ========================================

/// Declared closed range and widget default for a numeric feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureConstraint {
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl FeatureConstraint {
    /// True when `value` lies within `[min, max]`
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Numeric morphological measurement
///
/// Serialized by column name (e.g. `"bill_length_mm"`), which is also the
/// value used by the axis selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericFeature {
    BillLengthMm,
    BillDepthMm,
    FlipperLengthMm,
    BodyMassG,
}

/// Default chart X axis
pub const DEFAULT_X_AXIS: NumericFeature = NumericFeature::FlipperLengthMm;

/// Default chart Y axis
pub const DEFAULT_Y_AXIS: NumericFeature = NumericFeature::BillLengthMm;

/// Feature that drives marker size on the scatter chart
pub const SIZE_FEATURE: NumericFeature = NumericFeature::BodyMassG;

impl NumericFeature {
    /// All numeric features in declared (validation) order
    pub const ALL: [NumericFeature; 4] = [
        NumericFeature::BillLengthMm,
        NumericFeature::BillDepthMm,
        NumericFeature::FlipperLengthMm,
        NumericFeature::BodyMassG,
    ];

    /// Column name
    pub fn name(&self) -> &'static str {
        match self {
            NumericFeature::BillLengthMm => "bill_length_mm",
            NumericFeature::BillDepthMm => "bill_depth_mm",
            NumericFeature::FlipperLengthMm => "flipper_length_mm",
            NumericFeature::BodyMassG => "body_mass_g",
        }
    }

    pub fn constraint(&self) -> FeatureConstraint {
        match self {
            NumericFeature::BillLengthMm => FeatureConstraint {
                min: 25.0,
                max: 65.0,
                default: 40.0,
            },
            NumericFeature::BillDepthMm => FeatureConstraint {
                min: 10.0,
                max: 25.0,
                default: 20.0,
            },
            NumericFeature::FlipperLengthMm => FeatureConstraint {
                min: 150.0,
                max: 250.0,
                default: 200.0,
            },
            NumericFeature::BodyMassG => FeatureConstraint {
                min: 2000.0,
                max: 7500.0,
                default: 4000.0,
            },
        }
    }
}

impl fmt::Display for NumericFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NumericFeature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        NumericFeature::ALL
            .into_iter()
            .find(|feature| feature.name() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown feature: {}", s)))
    }
}
