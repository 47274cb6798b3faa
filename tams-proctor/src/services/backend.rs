//! Backend seam for the proctor workflow
//!
//! The workflow talks to the TAMS REST API only through [`ProctorBackend`].
//! [`RestBackend`](crate::services::RestBackend) is the production
//! implementation; tests substitute an in-memory backend.

use crate::models::{AssignmentRequest, EligibleProctor, Exam, ExamId, ExamStatus, OverrideFlags};
use async_trait::async_trait;
use tams_common::api::TransportError;

/// Logical backend operations used by the workflow
#[async_trait]
pub trait ProctorBackend: Send + Sync {
    /// Fetch one exam
    async fn fetch_exam(&self, exam_id: ExamId) -> Result<Exam, TransportError>;

    /// List exams, optionally filtered by status
    async fn list_exams(&self, status: Option<ExamStatus>) -> Result<Vec<Exam>, TransportError>;

    /// Eligible proctors for an exam, with relaxed rules where `overrides` asks
    async fn fetch_eligible_proctors(
        &self,
        exam_id: ExamId,
        overrides: OverrideFlags,
    ) -> Result<Vec<EligibleProctor>, TransportError>;

    /// Submit a manual or automatic assignment
    async fn submit_assignment(
        &self,
        exam_id: ExamId,
        request: &AssignmentRequest,
    ) -> Result<(), TransportError>;

    /// Move an exam to a new status
    async fn update_exam_status(
        &self,
        exam_id: ExamId,
        status: ExamStatus,
    ) -> Result<(), TransportError>;
}
