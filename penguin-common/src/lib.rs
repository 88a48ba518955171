//! # Penguin Classifier Common Library
//!
//! Shared code for the penguin classifier binaries including:
//! - Categorical vocabularies and the numeric feature catalogue
//! - Observation and prediction records
//! - Training metrics records
//! - Configuration loading and data folder layout
//! - Common error types

pub mod config;
pub mod error;
pub mod features;
pub mod metrics;
pub mod observation;

pub use error::{Error, Result};
pub use features::{FeatureConstraint, Island, NumericFeature, Sex, Species};
pub use observation::{Observation, PredictionResult};
