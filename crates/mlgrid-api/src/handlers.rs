//! REST API handlers.
//!
//! Each handler forwards to a workflow service and maps the failure
//! taxonomy onto HTTP statuses: admission rejections are 503 so clients
//! know to retry, unknown sessions are 404, engine-side failures are 502.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use mlgrid_core::model::{
    ClassifierDataRequest, ClassifierRequest, ClassifierStartRequest, ClassifierType,
    TimeSeriesAnalysisRequest,
};
use mlgrid_engine::EngineError;
use mlgrid_orchestrator::OrchestratorError;
use mlgrid_service::ServiceError;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(error: &ServiceError) -> impl IntoResponse {
    let status = match error {
        ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ServiceError::Orchestrator(OrchestratorError::NoAvailableEngine(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ServiceError::Orchestrator(OrchestratorError::NoBookedEngine { .. }) => {
            StatusCode::NOT_FOUND
        }
        ServiceError::Orchestrator(OrchestratorError::Engine(EngineError::Remote { .. })) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }),
    )
}

// ── Time-series analysis ───────────────────────────────────────

/// POST /api/time-series-analysis/forecast
pub async fn forecast(
    State(state): State<ApiState>,
    Json(request): Json<TimeSeriesAnalysisRequest>,
) -> impl IntoResponse {
    match state.timeseries.forecast(request).await {
        Ok(series) => ApiResponse::ok(series).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /api/time-series-analysis/forecast-vs-actual
pub async fn forecast_vs_actual(
    State(state): State<ApiState>,
    Json(request): Json<TimeSeriesAnalysisRequest>,
) -> impl IntoResponse {
    match state.timeseries.forecast_vs_actual(request).await {
        Ok(series) => ApiResponse::ok(series).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /api/time-series-analysis/forecast-accuracy
pub async fn forecast_accuracy(
    State(state): State<ApiState>,
    Json(request): Json<TimeSeriesAnalysisRequest>,
) -> impl IntoResponse {
    match state.timeseries.compute_forecast_accuracy(request).await {
        Ok(accuracy) => ApiResponse::ok(accuracy).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /api/time-series-analysis/predict
pub async fn predict(
    State(state): State<ApiState>,
    Json(request): Json<TimeSeriesAnalysisRequest>,
) -> impl IntoResponse {
    match state.timeseries.predict(request).await {
        Ok(series) => ApiResponse::ok(series).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

// ── Classifier sessions ────────────────────────────────────────

/// POST /api/classifier/decision-tree/start
pub async fn classifier_start(
    State(state): State<ApiState>,
    Json(request): Json<ClassifierStartRequest>,
) -> impl IntoResponse {
    match state
        .classifier
        .start(request, ClassifierType::DecisionTree)
        .await
    {
        Ok(request_id) => {
            ApiResponse::ok(serde_json::json!({ "requestId": request_id })).into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /api/classifier/decision-tree/data
pub async fn classifier_data(
    State(state): State<ApiState>,
    Json(request): Json<ClassifierDataRequest>,
) -> impl IntoResponse {
    match state
        .classifier
        .data(request, ClassifierType::DecisionTree)
        .await
    {
        Ok(()) => ApiResponse::ok("accepted").into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /api/classifier/decision-tree/predict
pub async fn classifier_predict(
    State(state): State<ApiState>,
    Json(request): Json<ClassifierRequest>,
) -> impl IntoResponse {
    match state
        .classifier
        .predict(request, ClassifierType::DecisionTree)
        .await
    {
        Ok(prediction) => ApiResponse::ok(prediction).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /api/classifier/decision-tree/predict-accuracy
pub async fn classifier_predict_accuracy(
    State(state): State<ApiState>,
    Json(request): Json<ClassifierRequest>,
) -> impl IntoResponse {
    match state
        .classifier
        .compute_predict_accuracy(request, ClassifierType::DecisionTree)
        .await
    {
        Ok(accuracy) => ApiResponse::ok(accuracy).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

// ── Admin ──────────────────────────────────────────────────────

/// GET /api/admin/engines
pub async fn engine_status(State(state): State<ApiState>) -> impl IntoResponse {
    let engines: Vec<_> = state
        .orchestrator
        .engines()
        .iter()
        .map(|engine| {
            serde_json::json!({
                "endpoint": engine.endpoint().to_string(),
                "state": engine.state(),
                "pid": engine.pid(),
            })
        })
        .collect();
    let requests: Vec<_> = state
        .orchestrator
        .requests()
        .into_iter()
        .map(|record| {
            serde_json::json!({
                "requestId": record.request_id,
                "action": record.action,
                "endpoint": record.endpoint.to_string(),
            })
        })
        .collect();

    ApiResponse::ok(serde_json::json!({
        "engines": engines,
        "requests": requests,
    }))
    .into_response()
}
