//! TAMS REST API client
//!
//! Routes follow the backend's Django REST conventions (trailing slashes).
//! List endpoints must answer with the `{"results": [...]}` envelope; any
//! other shape fails with a decode error.

use crate::models::{
    AssignmentRequest, EligibleProctor, Exam, ExamId, ExamStatus, OverrideFlags, StatusUpdate,
};
use crate::services::backend::ProctorBackend;
use async_trait::async_trait;
use std::sync::Arc;
use tams_common::api::{ApiTransport, ListEnvelope, SessionContext, TransportError};
use tams_common::config::BackendConfig;

fn exam_path(exam_id: ExamId) -> String {
    format!("/exams/{}/", exam_id)
}

fn eligible_proctors_path(exam_id: ExamId) -> String {
    format!("/exams/{}/eligible-proctors/", exam_id)
}

fn assign_path(exam_id: ExamId) -> String {
    format!("/exams/{}/assign-proctors/", exam_id)
}

fn status_path(exam_id: ExamId) -> String {
    format!("/exams/{}/status/", exam_id)
}

/// [`ProctorBackend`] over the authenticated REST transport
pub struct RestBackend {
    transport: ApiTransport,
}

impl RestBackend {
    pub fn new(transport: ApiTransport) -> Self {
        Self { transport }
    }

    /// Build transport and backend from configuration
    pub fn from_config(
        config: &BackendConfig,
        session: Arc<SessionContext>,
    ) -> Result<Self, TransportError> {
        Ok(Self::new(ApiTransport::new(config, session)?))
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        self.transport.session()
    }
}

#[async_trait]
impl ProctorBackend for RestBackend {
    async fn fetch_exam(&self, exam_id: ExamId) -> Result<Exam, TransportError> {
        tracing::debug!(exam_id, "Fetching exam");
        self.transport.get_json(&exam_path(exam_id), &[]).await
    }

    async fn list_exams(&self, status: Option<ExamStatus>) -> Result<Vec<Exam>, TransportError> {
        let query: Vec<(&str, String)> = status
            .map(|s| vec![("status", s.as_str().to_string())])
            .unwrap_or_default();

        let envelope: ListEnvelope<Exam> = self.transport.get_json("/exams/", &query).await?;
        Ok(envelope.results)
    }

    async fn fetch_eligible_proctors(
        &self,
        exam_id: ExamId,
        overrides: OverrideFlags,
    ) -> Result<Vec<EligibleProctor>, TransportError> {
        tracing::debug!(
            exam_id,
            override_academic_level = overrides.academic_level,
            override_consecutive_proctoring = overrides.consecutive_proctoring,
            "Fetching eligible proctors"
        );

        let envelope: ListEnvelope<EligibleProctor> = self
            .transport
            .get_json(&eligible_proctors_path(exam_id), &overrides.to_query())
            .await?;
        Ok(envelope.results)
    }

    async fn submit_assignment(
        &self,
        exam_id: ExamId,
        request: &AssignmentRequest,
    ) -> Result<(), TransportError> {
        self.transport.post_json(&assign_path(exam_id), request).await?;
        Ok(())
    }

    async fn update_exam_status(
        &self,
        exam_id: ExamId,
        status: ExamStatus,
    ) -> Result<(), TransportError> {
        self.transport
            .patch_json(&status_path(exam_id), &StatusUpdate { status })
            .await?;
        Ok(())
    }
}
