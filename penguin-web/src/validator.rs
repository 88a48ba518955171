//! Feature Validator
//!
//! Checks raw submitted form values before any classification is attempted.
//! Checks run in a fixed order and stop at the first offending field:
//! island first, then the numeric features in declared order, then the
//! optional sex field.
//!
//! Numeric values must parse as finite real numbers and lie within the
//! feature's declared closed range. The range is enforced here as well as
//! on the input widgets.

use serde::{Deserialize, Serialize};
use std::fmt;

use penguin_common::{Island, NumericFeature, Observation, Sex};

/// A submitted field value as the browser sends it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// Raw form state submitted with a classify action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawForm {
    #[serde(default)]
    pub island: Option<String>,
    #[serde(default)]
    pub bill_length_mm: Option<FieldValue>,
    #[serde(default)]
    pub bill_depth_mm: Option<FieldValue>,
    #[serde(default)]
    pub flipper_length_mm: Option<FieldValue>,
    #[serde(default)]
    pub body_mass_g: Option<FieldValue>,
    #[serde(default)]
    pub sex: Option<String>,
}

impl RawForm {
    fn numeric(&self, feature: NumericFeature) -> Option<&FieldValue> {
        match feature {
            NumericFeature::BillLengthMm => self.bill_length_mm.as_ref(),
            NumericFeature::BillDepthMm => self.bill_depth_mm.as_ref(),
            NumericFeature::FlipperLengthMm => self.flipper_length_mm.as_ref(),
            NumericFeature::BodyMassG => self.body_mass_g.as_ref(),
        }
    }
}

/// Reason a form was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    MissingIsland,
    UnknownIsland(String),
    /// Missing, empty, unparseable or non-finite value
    InvalidNumber(NumericFeature),
    OutOfRange(NumericFeature, f64),
    UnknownSex(String),
}

impl Rejection {
    /// The field the rejection refers to
    pub fn field(&self) -> &'static str {
        match self {
            Rejection::MissingIsland | Rejection::UnknownIsland(_) => "island",
            Rejection::InvalidNumber(feature) | Rejection::OutOfRange(feature, _) => {
                feature.name()
            }
            Rejection::UnknownSex(_) => "sex",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingIsland => write!(f, "Please select an island."),
            Rejection::UnknownIsland(_) => write!(f, "Please select a valid island."),
            Rejection::InvalidNumber(feature) => {
                write!(f, "Please enter a valid value for '{}'.", feature.name())
            }
            Rejection::OutOfRange(feature, _) => {
                let c = feature.constraint();
                write!(
                    f,
                    "Please enter allowed value for '{}' (between {} and {}).",
                    feature.name(),
                    c.min,
                    c.max
                )
            }
            Rejection::UnknownSex(_) => write!(f, "Please select a valid sex."),
        }
    }
}

/// Validate a raw form and build the unclassified observation
///
/// No side effects.
pub fn validate(form: &RawForm) -> Result<Observation, Rejection> {
    let island = match form.island.as_deref().map(str::trim) {
        None | Some("") => return Err(Rejection::MissingIsland),
        Some(raw) => raw
            .parse::<Island>()
            .map_err(|_| Rejection::UnknownIsland(raw.to_string()))?,
    };

    let mut values = [0.0; 4];
    for (slot, feature) in values.iter_mut().zip(NumericFeature::ALL) {
        let value = parse_number(form.numeric(feature))
            .ok_or(Rejection::InvalidNumber(feature))?;
        if !feature.constraint().contains(value) {
            return Err(Rejection::OutOfRange(feature, value));
        }
        *slot = value;
    }

    let sex = match form.sex.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<Sex>()
                .map_err(|_| Rejection::UnknownSex(raw.to_string()))?,
        ),
    };

    let [bill_length_mm, bill_depth_mm, flipper_length_mm, body_mass_g] = values;
    Ok(Observation {
        species: None,
        island,
        bill_length_mm,
        bill_depth_mm,
        flipper_length_mm,
        body_mass_g,
        sex,
    })
}

fn parse_number(value: Option<&FieldValue>) -> Option<f64> {
    let number = match value? {
        FieldValue::Number(n) => *n,
        FieldValue::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            text.parse::<f64>().ok()?
        }
    };
    number.is_finite().then_some(number)
}
