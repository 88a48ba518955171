//! Request Handler
//!
//! Sequences validation, prediction, persistence and view composition for
//! each user action. Every action is an explicit `Trigger`; the handler's
//! reply is a `HandlerOutput` in which `None` means "leave that output as
//! it is".
//!
//! | Trigger            | Outputs updated                                   |
//! |--------------------|---------------------------------------------------|
//! | `initial_load`     | banner (info), chart, table                       |
//! | `axis_changed`     | chart (re-overlays the cached prediction)         |
//! | `classify_clicked` | banner; on success also chart, table, prediction  |
//! | anything else      | nothing                                           |
//!
//! The last prediction is session state owned by the caller: it arrives in
//! `HandlerInput::latest_prediction` and is handed back on success.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use penguin_common::features::{DEFAULT_X_AXIS, DEFAULT_Y_AXIS, SIZE_FEATURE};
use penguin_common::{Error, NumericFeature, Observation, PredictionResult, Result};

use crate::history::HistoryStore;
use crate::pipeline::Classifier;
use crate::validator::{validate, RawForm};
use crate::views::{build_scatter, build_table, ChartSpec, TableView};

pub const INITIAL_MESSAGE: &str = "Please enter values and press Classify";
pub const NO_SEX_NOTE: &str = " - (Note: No sex provided)";

/// The user action being handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Trigger {
    InitialLoad,
    AxisChanged,
    ClassifyClicked,
    Unhandled,
}

impl From<String> for Trigger {
    fn from(value: String) -> Self {
        match value.as_str() {
            "initial_load" => Trigger::InitialLoad,
            "axis_changed" => Trigger::AxisChanged,
            "classify_clicked" => Trigger::ClassifyClicked,
            _ => Trigger::Unhandled,
        }
    }
}

/// Axis dropdown value as sent by the page
///
/// Anything that is not a numeric feature name is kept as `Unknown` so a
/// stale or tampered dropdown cannot fail the whole request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisSelection {
    Feature(NumericFeature),
    Unknown(serde_json::Value),
}

impl From<NumericFeature> for AxisSelection {
    fn from(feature: NumericFeature) -> Self {
        AxisSelection::Feature(feature)
    }
}

/// Current UI state accompanying a trigger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandlerInput {
    #[serde(default)]
    pub x_axis: Option<AxisSelection>,
    #[serde(default)]
    pub y_axis: Option<AxisSelection>,
    #[serde(default)]
    pub form: RawForm,
    /// Prediction cached from an earlier classify action in this session
    #[serde(default)]
    pub latest_prediction: Option<Observation>,
}

impl HandlerInput {
    /// Selected axes with defaults for absent ones; `None` if either is unknown
    fn axes(&self) -> Option<(NumericFeature, NumericFeature)> {
        fn pick(axis: Option<&AxisSelection>, default: NumericFeature) -> Option<NumericFeature> {
            match axis {
                None => Some(default),
                Some(AxisSelection::Feature(feature)) => Some(*feature),
                Some(AxisSelection::Unknown(_)) => None,
            }
        }
        Some((
            pick(self.x_axis.as_ref(), DEFAULT_X_AXIS)?,
            pick(self.y_axis.as_ref(), DEFAULT_Y_AXIS)?,
        ))
    }

    fn axes_or_default(&self) -> (NumericFeature, NumericFeature) {
        self.axes().unwrap_or((DEFAULT_X_AXIS, DEFAULT_Y_AXIS))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerColor {
    Info,
    Success,
    Danger,
}

/// Result message shown above the form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Banner {
    pub text: String,
    pub color: BannerColor,
}

impl Banner {
    fn new(text: impl Into<String>, color: BannerColor) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

/// Outputs to apply; `None` leaves the current value untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HandlerOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<Banner>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_prediction: Option<Observation>,
}

impl HandlerOutput {
    pub fn no_update() -> Self {
        Self::default()
    }

    fn banner_only(banner: Banner) -> Self {
        Self {
            banner: Some(banner),
            ..Self::default()
        }
    }

    fn system_error(err: &Error) -> Self {
        Self::banner_only(Banner::new(
            format!("System Error: {}", err),
            BannerColor::Danger,
        ))
    }
}

/// Success message for a prediction
pub fn result_message(prediction: &PredictionResult, sex_provided: bool) -> String {
    let mut msg = format!(
        "Species: {} --- Confidence: {:?}%",
        prediction.species,
        prediction.confidence_percent()
    );
    if !sex_provided {
        msg.push_str(NO_SEX_NOTE);
    }
    msg
}

/// Dispatches triggers against the history store and classifier
pub struct RequestHandler {
    store: HistoryStore,
    classifier: Arc<dyn Classifier>,
    table_row_limit: Option<usize>,
}

impl RequestHandler {
    pub fn new(
        store: HistoryStore,
        classifier: Arc<dyn Classifier>,
        table_row_limit: Option<usize>,
    ) -> Self {
        Self {
            store,
            classifier,
            table_row_limit,
        }
    }

    /// Handle one trigger to completion
    ///
    /// Never fails: errors become a danger banner (or, for axis changes, a
    /// no-op) so one failed action cannot disturb later ones.
    pub fn dispatch(&self, trigger: Trigger, input: &HandlerInput) -> HandlerOutput {
        match trigger {
            Trigger::InitialLoad => self.initial_render(input),
            Trigger::AxisChanged => self.change_axes(input),
            Trigger::ClassifyClicked => self.classify(input),
            Trigger::Unhandled => HandlerOutput::no_update(),
        }
    }

    fn initial_render(&self, input: &HandlerInput) -> HandlerOutput {
        let result = self.store.load().map(|history| {
            let (x, y) = input.axes_or_default();
            HandlerOutput {
                banner: Some(Banner::new(INITIAL_MESSAGE, BannerColor::Info)),
                chart: Some(build_scatter(&history, x, y, Some(SIZE_FEATURE), None)),
                table: Some(build_table(&history, self.table_row_limit)),
                latest_prediction: None,
            }
        });

        match result {
            Ok(output) => {
                info!("Initial render complete");
                output
            }
            Err(e) => {
                error!("Initial render failed: {}", e);
                HandlerOutput::system_error(&e)
            }
        }
    }

    fn change_axes(&self, input: &HandlerInput) -> HandlerOutput {
        let (x, y) = match input.axes() {
            Some(axes) => axes,
            None => {
                warn!(x_axis = ?input.x_axis, y_axis = ?input.y_axis, "Ignoring unknown plot axis");
                return HandlerOutput::no_update();
            }
        };
        let history = match self.store.load() {
            Ok(history) => history,
            Err(e) => {
                error!("Could not reload history for axis change: {}", e);
                return HandlerOutput::no_update();
            }
        };

        let chart = build_scatter(
            &history,
            x,
            y,
            Some(SIZE_FEATURE),
            input.latest_prediction.as_ref(),
        );
        info!(x_axis = %x, y_axis = %y, "Plot axes updated");

        HandlerOutput {
            chart: Some(chart),
            ..HandlerOutput::default()
        }
    }

    fn classify(&self, input: &HandlerInput) -> HandlerOutput {
        let observation = match validate(&input.form) {
            Ok(observation) => observation,
            Err(rejection) => {
                warn!(field = rejection.field(), "Rejected classify input: {}", rejection);
                return HandlerOutput::banner_only(Banner::new(
                    rejection.to_string(),
                    BannerColor::Danger,
                ));
            }
        };

        match self.classify_and_record(observation, input) {
            Ok(output) => output,
            Err(e) => {
                error!("Error in classification: {:#}", e);
                HandlerOutput::system_error(&e)
            }
        }
    }

    fn classify_and_record(
        &self,
        observation: Observation,
        input: &HandlerInput,
    ) -> Result<HandlerOutput> {
        let prediction = self.classifier.classify(&observation)?;
        if !(0.0..=1.0).contains(&prediction.confidence) {
            return Err(Error::Model(format!(
                "confidence {} outside [0, 1]",
                prediction.confidence
            )));
        }

        let message = result_message(&prediction, observation.sex.is_some());
        info!(
            species = %prediction.species,
            confidence = prediction.confidence,
            "Successful prediction"
        );

        let record = observation.with_species(prediction.species);
        self.store.append(&record)?;
        let history = self.store.load()?;

        let (x, y) = input.axes_or_default();
        Ok(HandlerOutput {
            banner: Some(Banner::new(message, BannerColor::Success)),
            chart: Some(build_scatter(
                &history,
                x,
                y,
                Some(SIZE_FEATURE),
                Some(&record),
            )),
            table: Some(build_table(&history, self.table_row_limit)),
            latest_prediction: Some(record),
        })
    }
}
