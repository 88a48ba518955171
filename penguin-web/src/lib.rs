//! penguin-web library - penguin species classifier service
//!
//! Serves a single-page UI where a user enters penguin measurements,
//! receives a species prediction with a confidence score, and explores the
//! accumulated history on a scatter chart and a table.

use axum::Router;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use penguin_common::config::DataPaths;

pub mod api;
pub mod error;
pub mod fetch;
pub mod handler;
pub mod history;
pub mod pipeline;
pub mod training;
pub mod validator;
pub mod views;

use handler::RequestHandler;
use history::HistoryStore;
use pipeline::{ArtifactClassifier, Classifier};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<RequestHandler>,
    /// Data file locations under the root folder
    pub paths: DataPaths,
    /// Held for the duration of each dispatched event
    pub dispatch_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// State backed by the model artifact under `paths`
    pub fn new(paths: DataPaths, table_row_limit: Option<usize>) -> Self {
        let classifier = Arc::new(ArtifactClassifier::new(&paths.model));
        Self::with_classifier(paths, classifier, table_row_limit)
    }

    pub fn with_classifier(
        paths: DataPaths,
        classifier: Arc<dyn Classifier>,
        table_row_limit: Option<usize>,
    ) -> Self {
        let store = HistoryStore::from_paths(&paths);
        Self {
            handler: Arc::new(RequestHandler::new(store, classifier, table_row_limit)),
            paths,
            dispatch_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let api = Router::new()
        .route("/api/form", get(api::get_form))
        .route("/api/dispatch", post(api::dispatch))
        .route("/api/metrics", get(api::get_metrics));

    let public = Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .merge(api::health_routes());

    Router::new()
        .merge(api)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
