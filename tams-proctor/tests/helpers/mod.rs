//! Test Helper Utilities
//!
//! In-memory `ProctorBackend` for driving the assignment workflow without
//! a network.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tams_common::api::{ApiErrorBody, TransportError};
use tams_proctor::error::{FetchError, ALREADY_ASSIGNED_CODE};
use tams_proctor::exam_list::ExamListRefresher;
use tams_proctor::models::{
    AcademicLevel, AssignmentRequest, CourseRef, EligibleProctor, Eligibility, EmploymentType,
    Exam, ExamId, ExamStatus, OverrideFlags, TaId,
};
use tams_proctor::services::ProctorBackend;
use tokio::sync::Notify;

pub fn exam(id: ExamId, required: u32, status: ExamStatus) -> Exam {
    Exam {
        id,
        course: CourseRef {
            id: 10,
            code: "CS 315".to_string(),
            name: Some("Algorithms".to_string()),
        },
        date: NaiveDate::from_ymd_opt(2026, 12, 14).unwrap(),
        start_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(11, 30, 0),
        required_proctors: required,
        assigned_proctors: 0,
        status,
    }
}

pub fn candidate(id: TaId, workload: f64, assigned: bool, teaching: bool) -> EligibleProctor {
    EligibleProctor {
        id,
        name: format!("TA {}", id),
        email: format!("ta{}@example.edu", id),
        academic_level: AcademicLevel::Masters,
        employment_type: EmploymentType::PartTime,
        current_workload: workload,
        is_assigned_to_current_exam: assigned,
        is_teaching_course_section: teaching,
        eligibility: Eligibility::default(),
    }
}

/// Four candidates ranking as [1, 2, 3, 4]
pub fn ranked_scenario() -> Vec<EligibleProctor> {
    vec![
        candidate(1, 5.0, true, false),
        candidate(2, 1.0, false, true),
        candidate(3, 0.0, false, false),
        candidate(4, 2.0, false, false),
    ]
}

/// Backend holding one exam and scripted responses
#[derive(Default)]
pub struct FakeBackend {
    pub exam: Mutex<Option<Exam>>,
    pub candidates: Mutex<Vec<EligibleProctor>>,
    /// Added to the candidates whenever any override flag is set
    pub overridden_extras: Mutex<Vec<EligibleProctor>>,

    pub seen_flags: Mutex<Vec<OverrideFlags>>,
    pub submissions: Mutex<Vec<(ExamId, AssignmentRequest)>>,
    pub status_updates: Mutex<Vec<(ExamId, ExamStatus)>>,
    pub candidate_fetches: AtomicUsize,

    /// Reject submissions without `replace_existing` as already assigned
    pub has_existing_assignments: AtomicBool,
    pub fail_next_candidate_fetch: AtomicBool,
    pub fail_status_update: AtomicBool,
    /// Answer every assignment and status command with 409
    pub conflict_on_every_command: AtomicBool,

    /// Next candidate fetch signals `entered`, then waits for `release`
    gate: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
    /// Same for the next assignment or status command
    command_gate: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
}

fn conflict(message: &str) -> TransportError {
    TransportError::Status {
        status: 409,
        body: ApiErrorBody {
            code: Some(ALREADY_ASSIGNED_CODE.to_string()),
            message: Some(message.to_string()),
        },
    }
}

async fn pass_gate(gate: &Mutex<Option<(Arc<Notify>, Arc<Notify>)>>) {
    let gate = gate.lock().unwrap().take();
    if let Some((entered, release)) = gate {
        entered.notify_one();
        release.notified().await;
    }
}

impl FakeBackend {
    pub fn new(exam: Exam, candidates: Vec<EligibleProctor>) -> Self {
        Self {
            exam: Mutex::new(Some(exam)),
            candidates: Mutex::new(candidates),
            ..Self::default()
        }
    }

    pub fn with_overridden_extras(self, extras: Vec<EligibleProctor>) -> Self {
        *self.overridden_extras.lock().unwrap() = extras;
        self
    }

    /// Hold the next candidate fetch; returns (entered, release)
    pub fn gate_next_fetch(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some((Arc::clone(&entered), Arc::clone(&release)));
        (entered, release)
    }

    /// Hold the next assignment or status command; returns (entered, release)
    pub fn gate_next_command(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.command_gate.lock().unwrap() = Some((Arc::clone(&entered), Arc::clone(&release)));
        (entered, release)
    }

    pub fn submissions(&self) -> Vec<(ExamId, AssignmentRequest)> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn status_updates(&self) -> Vec<(ExamId, ExamStatus)> {
        self.status_updates.lock().unwrap().clone()
    }

    pub fn seen_flags(&self) -> Vec<OverrideFlags> {
        self.seen_flags.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProctorBackend for FakeBackend {
    async fn fetch_exam(&self, exam_id: ExamId) -> Result<Exam, TransportError> {
        match self.exam.lock().unwrap().clone() {
            Some(exam) if exam.id == exam_id => Ok(exam),
            _ => Err(TransportError::Status {
                status: 404,
                body: ApiErrorBody::default(),
            }),
        }
    }

    async fn list_exams(&self, status: Option<ExamStatus>) -> Result<Vec<Exam>, TransportError> {
        let exams: Vec<Exam> = self.exam.lock().unwrap().clone().into_iter().collect();
        Ok(exams
            .into_iter()
            .filter(|e| status.map_or(true, |s| e.status == s))
            .collect())
    }

    async fn fetch_eligible_proctors(
        &self,
        _exam_id: ExamId,
        overrides: OverrideFlags,
    ) -> Result<Vec<EligibleProctor>, TransportError> {
        self.candidate_fetches.fetch_add(1, Ordering::SeqCst);
        self.seen_flags.lock().unwrap().push(overrides);

        pass_gate(&self.gate).await;

        if self.fail_next_candidate_fetch.swap(false, Ordering::SeqCst) {
            return Err(TransportError::Network("connection reset".to_string()));
        }

        let mut candidates = self.candidates.lock().unwrap().clone();
        if overrides.any() {
            candidates.extend(self.overridden_extras.lock().unwrap().iter().cloned());
        }
        Ok(candidates)
    }

    async fn submit_assignment(
        &self,
        exam_id: ExamId,
        request: &AssignmentRequest,
    ) -> Result<(), TransportError> {
        self.submissions
            .lock()
            .unwrap()
            .push((exam_id, request.clone()));
        pass_gate(&self.command_gate).await;

        if self.conflict_on_every_command.load(Ordering::SeqCst)
            || (self.has_existing_assignments.load(Ordering::SeqCst) && !request.replace_existing())
        {
            return Err(conflict("Exam already has assigned proctors"));
        }
        self.has_existing_assignments.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn update_exam_status(
        &self,
        exam_id: ExamId,
        status: ExamStatus,
    ) -> Result<(), TransportError> {
        pass_gate(&self.command_gate).await;
        if self.conflict_on_every_command.load(Ordering::SeqCst) {
            return Err(conflict("status already changed"));
        }
        if self.fail_status_update.load(Ordering::SeqCst) {
            return Err(TransportError::Status {
                status: 500,
                body: ApiErrorBody {
                    code: None,
                    message: Some("status update failed".to_string()),
                },
            });
        }
        self.status_updates.lock().unwrap().push((exam_id, status));
        if let Some(exam) = self.exam.lock().unwrap().as_mut() {
            exam.status = status;
        }
        Ok(())
    }
}

/// Refresher counting how often the exam list was reloaded
#[derive(Default)]
pub struct CountingRefresher {
    pub calls: AtomicUsize,
}

impl CountingRefresher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExamListRefresher for CountingRefresher {
    async fn refresh(&self) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
