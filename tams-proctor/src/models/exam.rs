//! Exam model and status lifecycle
//!
//! Exams are created through the backend's CRUD screens. This workflow only
//! reads them, changes their assigned-proctor count through assignments, and
//! moves them to `AWAITING_CROSS_DEPARTMENT_APPROVAL` on escalation.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type ExamId = u64;

/// Exam status as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExamStatus {
    /// Fewer proctors assigned than required
    AwaitingProctors,
    /// Fully staffed
    Ready,
    /// Escalated; waiting for the other department to approve
    AwaitingCrossDepartmentApproval,
    /// Approved; waiting for cross-department proctors to be assigned
    AwaitingCrossDepartmentProctors,
    Completed,
    Cancelled,
}

impl ExamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamStatus::AwaitingProctors => "AWAITING_PROCTORS",
            ExamStatus::Ready => "READY",
            ExamStatus::AwaitingCrossDepartmentApproval => "AWAITING_CROSS_DEPARTMENT_APPROVAL",
            ExamStatus::AwaitingCrossDepartmentProctors => "AWAITING_CROSS_DEPARTMENT_PROCTORS",
            ExamStatus::Completed => "COMPLETED",
            ExamStatus::Cancelled => "CANCELLED",
        }
    }

    /// Status is part of the cross-department escalation path
    pub fn is_cross_department(&self) -> bool {
        matches!(
            self,
            ExamStatus::AwaitingCrossDepartmentApproval | ExamStatus::AwaitingCrossDepartmentProctors
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExamStatus::Completed | ExamStatus::Cancelled)
    }
}

impl fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Course an exam belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRef {
    pub id: u64,
    /// Course code (e.g. "CS 101")
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Exam as returned by `GET /exams/{id}/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: ExamId,
    pub course: CourseRef,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    pub required_proctors: u32,
    #[serde(default)]
    pub assigned_proctors: u32,
    pub status: ExamStatus,
}

impl Exam {
    /// Proctors still missing to reach the required count
    pub fn missing_proctors(&self) -> u32 {
        self.required_proctors.saturating_sub(self.assigned_proctors)
    }

    pub fn is_fully_staffed(&self) -> bool {
        self.missing_proctors() == 0
    }
}

/// Body of `PATCH /exams/{id}/status/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: ExamStatus,
}
