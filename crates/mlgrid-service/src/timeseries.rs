//! One-shot time-series workflows.
//!
//! Every action books an idle engine, runs exactly one remote call, and
//! releases the engine regardless of outcome — the orchestrator's one-shot
//! form does the bookkeeping, this layer only shapes the requests.

use std::sync::Arc;

use tracing::info;

use mlgrid_core::model::{TimeSeries, TimeSeriesAnalysisRequest, timeseries};
use mlgrid_orchestrator::Orchestrator;

use crate::error::{ServiceError, ServiceResult};

pub struct TimeSeriesService {
    orchestrator: Arc<Orchestrator>,
}

impl TimeSeriesService {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    pub async fn forecast(&self, request: TimeSeriesAnalysisRequest) -> ServiceResult<TimeSeries> {
        info!(action = timeseries::FORECAST, "forecast request");
        let result = self
            .orchestrator
            .run_on_engine(
                move |engine| async move { engine.forecast(&request).await },
                timeseries::FORECAST,
            )
            .await?;
        Ok(result)
    }

    /// Forecast against rows the engine has never seen: the last
    /// `number_of_values` rows are held back, so the caller can compare
    /// the forecast with what actually happened.
    pub async fn forecast_vs_actual(
        &self,
        request: TimeSeriesAnalysisRequest,
    ) -> ServiceResult<TimeSeries> {
        info!(action = timeseries::FORECAST_VS_ACTUAL, "forecast vs actual request");
        let trimmed = hold_back_last_rows(request)?;
        let result = self
            .orchestrator
            .run_on_engine(
                move |engine| async move { engine.forecast(&trimmed).await },
                timeseries::FORECAST_VS_ACTUAL,
            )
            .await?;
        Ok(result)
    }

    pub async fn compute_forecast_accuracy(
        &self,
        request: TimeSeriesAnalysisRequest,
    ) -> ServiceResult<f64> {
        info!(action = timeseries::FORECAST_ACCURACY, "forecast accuracy request");
        let result = self
            .orchestrator
            .run_on_engine(
                move |engine| async move { engine.compute_forecast_accuracy(&request).await },
                timeseries::FORECAST_ACCURACY,
            )
            .await?;
        Ok(result)
    }

    pub async fn predict(&self, request: TimeSeriesAnalysisRequest) -> ServiceResult<TimeSeries> {
        info!(action = timeseries::PREDICT, "predict request");
        let result = self
            .orchestrator
            .run_on_engine(
                move |engine| async move { engine.predict(&request).await },
                timeseries::PREDICT,
            )
            .await?;
        Ok(result)
    }
}

/// Drop the trailing `number_of_values` rows from the request's series.
fn hold_back_last_rows(
    mut request: TimeSeriesAnalysisRequest,
) -> ServiceResult<TimeSeriesAnalysisRequest> {
    let keep = request
        .time_series
        .rows
        .len()
        .checked_sub(request.number_of_values as usize)
        .ok_or_else(|| {
            ServiceError::InvalidRequest(format!(
                "cannot hold back {} rows from a series of {}",
                request.number_of_values,
                request.time_series.rows.len()
            ))
        })?;
    request.time_series.rows.truncate(keep);
    Ok(request)
}
