//! Classifier sessions: book an engine, feed it data over several calls,
//! then predict and release.
//!
//! A session pins one engine for its whole lifetime. Any step failing
//! after `start` triggers compensation: a best-effort cancel on the engine
//! followed by an unconditional release, so an aborted session never
//! leaks a booked engine or a stale ledger record.

use std::sync::Arc;

use tracing::{info, warn};

use mlgrid_core::RequestId;
use mlgrid_core::model::{
    ClassifierDataRequest, ClassifierDataResponse, ClassifierRequest, ClassifierStartCommand,
    ClassifierStartRequest, ClassifierType,
};
use mlgrid_orchestrator::{Orchestrator, OrchestratorError};

use crate::error::ServiceResult;

pub struct ClassifierService {
    orchestrator: Arc<Orchestrator>,
}

impl ClassifierService {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Open a session: book an engine, then tell it a classifier run is
    /// starting. The returned id names the session in every later call.
    pub async fn start(
        &self,
        request: ClassifierStartRequest,
        classifier: ClassifierType,
    ) -> ServiceResult<RequestId> {
        let action = classifier.start_action();
        info!(action, "classifier start request");

        let request_id = self.orchestrator.book_engine(action).await?;
        let command = ClassifierStartCommand {
            request_id,
            start: request,
        };

        let started = self
            .orchestrator
            .run_on_booked_engine(
                request_id,
                move |engine| async move { engine.classifier_start(&command, classifier).await },
                action,
            )
            .await;

        if let Err(error) = started {
            self.cleanup(request_id, classifier, action).await;
            return Err(error.into());
        }
        Ok(request_id)
    }

    /// Push one column of training data into an open session.
    pub async fn data(
        &self,
        request: ClassifierDataRequest,
        classifier: ClassifierType,
    ) -> ServiceResult<()> {
        let action = classifier.data_action();
        let request_id = request.request_id;
        info!(%request_id, action, "classifier data request");

        let pushed = self
            .orchestrator
            .run_on_booked_engine(
                request_id,
                move |engine| async move { engine.classifier_data(&request, classifier).await },
                action,
            )
            .await;

        if let Err(error) = pushed {
            self.cleanup(request_id, classifier, action).await;
            return Err(error.into());
        }
        Ok(())
    }

    /// Predict the configured column and close the session.
    pub async fn predict(
        &self,
        request: ClassifierRequest,
        classifier: ClassifierType,
    ) -> ServiceResult<ClassifierDataResponse> {
        let action = classifier.predict_action();
        self.terminal_step(
            request.request_id,
            action,
            move |engine| async move { engine.classifier_predict(&request, classifier).await },
            classifier,
        )
        .await
    }

    /// Score the classifier against held-back values and close the session.
    pub async fn compute_predict_accuracy(
        &self,
        request: ClassifierRequest,
        classifier: ClassifierType,
    ) -> ServiceResult<f64> {
        let action = classifier.predict_accuracy_action();
        self.terminal_step(
            request.request_id,
            action,
            move |engine| async move {
                engine.classifier_predict_accuracy(&request, classifier).await
            },
            classifier,
        )
        .await
    }

    /// Last call of a session: on success release the engine, on failure
    /// compensate. Either way the session is over when this returns.
    async fn terminal_step<T, F, Fut>(
        &self,
        request_id: RequestId,
        action: &str,
        step: F,
        classifier: ClassifierType,
    ) -> ServiceResult<T>
    where
        F: FnOnce(Arc<mlgrid_engine::Engine>) -> Fut,
        Fut: Future<Output = mlgrid_engine::EngineResult<T>>,
    {
        info!(%request_id, action, "classifier terminal request");

        match self
            .orchestrator
            .run_on_booked_engine(request_id, step, action)
            .await
        {
            Ok(value) => {
                self.orchestrator.release_engine(request_id, action).await?;
                Ok(value)
            }
            Err(error) => {
                self.cleanup(request_id, classifier, action).await;
                Err(error.into())
            }
        }
    }

    /// Compensate a failed session step.
    ///
    /// Cancel is best-effort — the engine may be mid-crash and unable to
    /// answer — but release always runs so the engine rejoins the pool.
    /// Errors here are logged and swallowed; the caller surfaces the
    /// original step failure.
    async fn cleanup(&self, request_id: RequestId, classifier: ClassifierType, failed_action: &str) {
        let cancel = ClassifierRequest { request_id };
        if let Err(error) = self
            .orchestrator
            .run_on_booked_engine(
                request_id,
                move |engine| async move { engine.classifier_cancel(&cancel, classifier).await },
                classifier.cancel_action(),
            )
            .await
        {
            warn!(%request_id, failed_action, %error, "classifier cancel failed during cleanup");
        }

        match self.orchestrator.release_engine(request_id, failed_action).await {
            Ok(()) => {}
            // The session may already be gone, e.g. when cleanup races a
            // concurrent release of the same id.
            Err(OrchestratorError::NoBookedEngine { .. }) => {}
            Err(error) => {
                warn!(%request_id, failed_action, %error, "release failed during cleanup");
            }
        }
    }
}
