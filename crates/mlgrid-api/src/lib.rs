//! mlgrid-api — REST API for the mlgrid coordinator.
//!
//! Provides axum route handlers for the time-series and classifier
//! workflows plus an admin view of the engine pool.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/api/time-series-analysis/forecast` | Forecast the next values |
//! | POST | `/api/time-series-analysis/forecast-vs-actual` | Forecast over held-back rows |
//! | POST | `/api/time-series-analysis/forecast-accuracy` | Score the forecast |
//! | POST | `/api/time-series-analysis/predict` | Predict via regression |
//! | POST | `/api/classifier/decision-tree/start` | Open a classifier session |
//! | POST | `/api/classifier/decision-tree/data` | Push a training column |
//! | POST | `/api/classifier/decision-tree/predict` | Predict and close the session |
//! | POST | `/api/classifier/decision-tree/predict-accuracy` | Score and close the session |
//! | GET | `/api/admin/engines` | Engine states, pids, and live requests |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use mlgrid_orchestrator::Orchestrator;
use mlgrid_service::{ClassifierService, TimeSeriesService};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub timeseries: Arc<TimeSeriesService>,
    pub classifier: Arc<ClassifierService>,
}

impl ApiState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            timeseries: Arc::new(TimeSeriesService::new(Arc::clone(&orchestrator))),
            classifier: Arc::new(ClassifierService::new(Arc::clone(&orchestrator))),
            orchestrator,
        }
    }
}

/// Build the complete API router.
pub fn build_router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = ApiState::new(orchestrator);

    let timeseries_routes = Router::new()
        .route("/forecast", post(handlers::forecast))
        .route("/forecast-vs-actual", post(handlers::forecast_vs_actual))
        .route("/forecast-accuracy", post(handlers::forecast_accuracy))
        .route("/predict", post(handlers::predict));

    let classifier_routes = Router::new()
        .route("/decision-tree/start", post(handlers::classifier_start))
        .route("/decision-tree/data", post(handlers::classifier_data))
        .route("/decision-tree/predict", post(handlers::classifier_predict))
        .route(
            "/decision-tree/predict-accuracy",
            post(handlers::classifier_predict_accuracy),
        );

    let api_routes = Router::new()
        .nest("/time-series-analysis", timeseries_routes)
        .nest("/classifier", classifier_routes)
        .route("/admin/engines", get(handlers::engine_status));

    Router::new().nest("/api", api_routes).with_state(state)
}
