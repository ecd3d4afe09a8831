//! Domain payloads exchanged with the engine processes.
//!
//! The coordinator never interprets these beyond (de)serialization — they
//! travel from the REST surface through the orchestrator to the engine
//! client unchanged. Action names double as log labels and as the path
//! suffix of the engine's HTTP endpoint for that action.

use serde::{Deserialize, Serialize};

use crate::types::RequestId;

// ── Time-series analysis ───────────────────────────────────────

/// One observation of a univariate time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRow {
    pub date: String,
    pub value: f64,
}

/// A univariate time series plus the column metadata the engine needs to
/// parse and label it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub rows: Vec<TimeSeriesRow>,
    pub date_column_name: String,
    pub value_column_name: String,
    pub date_format: String,
}

/// Request body for every time-series action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesAnalysisRequest {
    pub time_series: TimeSeries,
    pub number_of_values: u32,
}

/// Time-series action names (log labels) and engine endpoint paths.
pub mod timeseries {
    pub const FORECAST: &str = "time-series-forecast";
    pub const FORECAST_VS_ACTUAL: &str = "time-series-forecast-vs-actual";
    pub const FORECAST_ACCURACY: &str = "time-series-compute-accuracy";
    pub const PREDICT: &str = "time-series-predict";

    pub const FORECAST_URL: &str = "/time-series-analysis/forecast";
    pub const FORECAST_ACCURACY_URL: &str = "/time-series-analysis/forecast-accuracy";
    pub const PREDICT_URL: &str = "/time-series-analysis/predict";
}

// ── Classifier sessions ────────────────────────────────────────

/// Opens a classifier session: which column to predict from which action
/// columns, and how many values each data push will carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierStartRequest {
    pub prediction_column_name: String,
    pub action_column_names: Vec<String>,
    pub number_of_values: u32,
}

/// One column of training data pushed into an open session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierDataRequest {
    pub request_id: RequestId,
    pub column_name: String,
    pub values: Vec<i32>,
}

/// Predicted values for the prediction column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierDataResponse {
    pub column_name: String,
    pub values: Vec<i32>,
}

/// Identifies the session for request-only actions (predict, accuracy,
/// cancel).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierRequest {
    pub request_id: RequestId,
}

/// Engine-bound start payload: the start request tagged with the booked
/// request id so the engine can track the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierStartCommand {
    pub request_id: RequestId,
    #[serde(flatten)]
    pub start: ClassifierStartRequest,
}

/// The classifier algorithm backing a session.
///
/// Each variant knows its own action names and engine endpoint paths, so
/// the workflow layer stays algorithm-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifierType {
    DecisionTree,
}

impl ClassifierType {
    pub fn start_action(&self) -> &'static str {
        match self {
            ClassifierType::DecisionTree => "decision-tree-start",
        }
    }

    pub fn data_action(&self) -> &'static str {
        match self {
            ClassifierType::DecisionTree => "decision-tree-data",
        }
    }

    pub fn predict_action(&self) -> &'static str {
        match self {
            ClassifierType::DecisionTree => "decision-tree-predict",
        }
    }

    pub fn predict_accuracy_action(&self) -> &'static str {
        match self {
            ClassifierType::DecisionTree => "decision-tree-compute-predict-accuracy",
        }
    }

    pub fn cancel_action(&self) -> &'static str {
        match self {
            ClassifierType::DecisionTree => "decision-tree-cancel",
        }
    }

    pub fn start_url(&self) -> &'static str {
        match self {
            ClassifierType::DecisionTree => "/decision-tree/start",
        }
    }

    pub fn data_url(&self) -> &'static str {
        match self {
            ClassifierType::DecisionTree => "/decision-tree/data",
        }
    }

    pub fn predict_url(&self) -> &'static str {
        match self {
            ClassifierType::DecisionTree => "/decision-tree/predict",
        }
    }

    pub fn predict_accuracy_url(&self) -> &'static str {
        match self {
            ClassifierType::DecisionTree => "/decision-tree/predict-accuracy",
        }
    }

    pub fn cancel_url(&self) -> &'static str {
        match self {
            ClassifierType::DecisionTree => "/decision-tree/cancel",
        }
    }
}
