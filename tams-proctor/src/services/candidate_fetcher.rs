//! Exam and eligible-candidate fetcher
//!
//! Each fetch returns a fresh [`CandidateList`]; callers replace their list
//! wholesale and never merge with a previous fetch.

use crate::error::FetchError;
use crate::models::{EligibleProctor, Exam, ExamId, OverrideFlags, TaId};
use crate::services::backend::ProctorBackend;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Candidates for one exam, as computed by the backend for one set of flags
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateList {
    pub exam_id: ExamId,
    pub overrides: OverrideFlags,
    pub candidates: Vec<EligibleProctor>,
    pub fetched_at: DateTime<Utc>,
}

impl CandidateList {
    pub fn new(exam_id: ExamId, overrides: OverrideFlags, candidates: Vec<EligibleProctor>) -> Self {
        Self {
            exam_id,
            overrides,
            candidates,
            fetched_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, id: TaId) -> Option<&EligibleProctor> {
        self.candidates.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: TaId) -> bool {
        self.get(id).is_some()
    }

    /// All candidate ids in backend order
    pub fn ids(&self) -> Vec<TaId> {
        self.candidates.iter().map(|c| c.id).collect()
    }

    /// Ids of candidates already assigned to this exam, in backend order
    pub fn assigned_ids(&self) -> Vec<TaId> {
        self.candidates
            .iter()
            .filter(|c| c.is_assigned_to_current_exam)
            .map(|c| c.id)
            .collect()
    }

    /// Candidates carrying at least one constraint violation
    pub fn flagged_count(&self) -> usize {
        self.candidates.iter().filter(|c| c.has_violations()).count()
    }

    pub fn cross_department_count(&self) -> usize {
        self.candidates
            .iter()
            .filter(|c| c.eligibility.is_cross_department)
            .count()
    }
}

/// Leaf service retrieving exams and eligible proctors
#[derive(Clone)]
pub struct CandidateFetcher {
    backend: Arc<dyn ProctorBackend>,
}

impl CandidateFetcher {
    pub fn new(backend: Arc<dyn ProctorBackend>) -> Self {
        Self { backend }
    }

    pub async fn fetch_exam(&self, exam_id: ExamId) -> Result<Exam, FetchError> {
        let exam = self.backend.fetch_exam(exam_id).await.map_err(|e| {
            tracing::warn!(exam_id, error = %e, "Failed to fetch exam");
            FetchError::from(e)
        })?;

        tracing::debug!(
            exam_id,
            course = %exam.course.code,
            required = exam.required_proctors,
            assigned = exam.assigned_proctors,
            status = %exam.status,
            "Fetched exam"
        );
        Ok(exam)
    }

    /// Fetch the eligible candidates for `exam_id`
    pub async fn fetch_candidates(
        &self,
        exam_id: ExamId,
        overrides: OverrideFlags,
    ) -> Result<CandidateList, FetchError> {
        let candidates = self
            .backend
            .fetch_eligible_proctors(exam_id, overrides)
            .await
            .map_err(|e| {
                tracing::warn!(exam_id, error = %e, "Failed to fetch eligible proctors");
                FetchError::from(e)
            })?;

        let list = CandidateList::new(exam_id, overrides, candidates);

        tracing::info!(
            exam_id,
            candidates = list.len(),
            already_assigned = list.assigned_ids().len(),
            with_violations = list.flagged_count(),
            cross_department = list.cross_department_count(),
            overrides = overrides.any(),
            "Fetched eligible proctors"
        );

        Ok(list)
    }
}
