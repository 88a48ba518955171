//! Form vocabulary endpoint
//!
//! Everything the UI needs to build its inputs: the categorical options,
//! the numeric widgets with their ranges and defaults, and the axis
//! selector choices.

use axum::Json;
use serde::Serialize;

use penguin_common::features::{DEFAULT_X_AXIS, DEFAULT_Y_AXIS, SIZE_FEATURE};
use penguin_common::{FeatureConstraint, Island, NumericFeature, Sex};

/// One numeric input widget
#[derive(Debug, Serialize)]
pub struct NumericField {
    pub name: NumericFeature,
    #[serde(flatten)]
    pub constraint: FeatureConstraint,
}

#[derive(Debug, Serialize)]
pub struct FormResponse {
    pub islands: Vec<Island>,
    pub sexes: Vec<Sex>,
    pub numeric: Vec<NumericField>,
    pub axes: Vec<NumericFeature>,
    pub default_x_axis: NumericFeature,
    pub default_y_axis: NumericFeature,
    pub size_axis: NumericFeature,
}

/// GET /api/form
pub async fn get_form() -> Json<FormResponse> {
    Json(FormResponse {
        islands: Island::ALL.to_vec(),
        sexes: Sex::ALL.to_vec(),
        numeric: NumericFeature::ALL
            .into_iter()
            .map(|name| NumericField {
                name,
                constraint: name.constraint(),
            })
            .collect(),
        axes: NumericFeature::ALL.to_vec(),
        default_x_axis: DEFAULT_X_AXIS,
        default_y_axis: DEFAULT_Y_AXIS,
        size_axis: SIZE_FEATURE,
    })
}
