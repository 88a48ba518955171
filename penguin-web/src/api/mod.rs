//! HTTP API handlers for penguin-web

pub mod dispatch;
pub mod form;
pub mod health;
pub mod metrics;
pub mod ui;

pub use dispatch::dispatch;
pub use form::get_form;
pub use health::health_routes;
pub use metrics::get_metrics;
pub use ui::{serve_app_js, serve_index};
