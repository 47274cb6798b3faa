//! Submission dispatcher
//!
//! Sends the final selection to the backend as a manual or automatic
//! assignment command, or escalates an exam to cross-department approval.
//! Every successful command triggers a refresh of the exam list.

use crate::error::AssignmentError;
use crate::exam_list::ExamListRefresher;
use crate::models::{AssignmentMode, AssignmentRequest, ExamId, ExamStatus, TaId};
use crate::services::backend::ProctorBackend;
use std::sync::Arc;

#[derive(Clone)]
pub struct SubmissionDispatcher {
    backend: Arc<dyn ProctorBackend>,
    refresher: Option<Arc<dyn ExamListRefresher>>,
}

impl SubmissionDispatcher {
    pub fn new(backend: Arc<dyn ProctorBackend>) -> Self {
        Self {
            backend,
            refresher: None,
        }
    }

    /// Refresh `refresher` after every successful command
    pub fn with_refresher(mut self, refresher: Arc<dyn ExamListRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub async fn submit_manual(
        &self,
        exam_id: ExamId,
        selected: Vec<TaId>,
        replace_existing: bool,
        is_paid: bool,
    ) -> Result<(), AssignmentError> {
        let request = AssignmentRequest::new(AssignmentMode::Manual, selected, replace_existing, is_paid);
        self.dispatch(exam_id, &request).await
    }

    pub async fn submit_automatic(
        &self,
        exam_id: ExamId,
        selected: Vec<TaId>,
        replace_existing: bool,
        is_paid: bool,
    ) -> Result<(), AssignmentError> {
        let request =
            AssignmentRequest::new(AssignmentMode::Automatic, selected, replace_existing, is_paid);
        self.dispatch(exam_id, &request).await
    }

    /// Send a prepared assignment command
    pub async fn dispatch(
        &self,
        exam_id: ExamId,
        request: &AssignmentRequest,
    ) -> Result<(), AssignmentError> {
        tracing::info!(
            exam_id,
            mode = ?request.mode(),
            proctors = request.proctors().len(),
            replace_existing = request.replace_existing(),
            is_paid = request.is_paid(),
            "Submitting proctor assignment"
        );

        match self.backend.submit_assignment(exam_id, request).await {
            Ok(()) => {
                tracing::info!(exam_id, "Proctor assignment accepted");
                self.refresh_exam_list().await;
                Ok(())
            }
            Err(e) => {
                let err = AssignmentError::from(e);
                tracing::warn!(exam_id, error = %err, "Proctor assignment rejected");
                Err(err)
            }
        }
    }

    /// Ask for proctors from other departments instead of assigning directly
    pub async fn request_cross_department(&self, exam_id: ExamId) -> Result<(), AssignmentError> {
        let status = ExamStatus::AwaitingCrossDepartmentApproval;
        tracing::info!(exam_id, status = %status, "Requesting cross-department proctors");

        match self.backend.update_exam_status(exam_id, status).await {
            Ok(()) => {
                self.refresh_exam_list().await;
                Ok(())
            }
            Err(e) => {
                let err = AssignmentError::from_status_change(e);
                tracing::warn!(exam_id, error = %err, "Cross-department request rejected");
                Err(err)
            }
        }
    }

    async fn refresh_exam_list(&self) {
        if let Some(refresher) = &self.refresher {
            if let Err(e) = refresher.refresh().await {
                // Command already applied; only the list view is stale
                tracing::warn!(error = %e, "Exam list refresh failed");
            }
        }
    }
}
