//! # TAMS Proctor Assignment
//!
//! Client-side workflow for assigning teaching assistants to proctor exams:
//! - Eligible-candidate fetching with optional eligibility overrides
//! - Priority ranking and auto-suggestion
//! - Manual selection with paid/replace flags
//! - Insufficient-candidates fallback (override re-query, partial
//!   assignment, cross-department escalation)
//! - Manual and automatic assignment submission
//!
//! The backend is reached through [`services::ProctorBackend`];
//! [`services::RestBackend`] is the REST implementation.

pub mod error;
pub mod exam_list;
pub mod models;
pub mod services;
pub mod workflow;

pub use error::{AssignmentError, FetchError, PreconditionError, WorkflowError};
pub use exam_list::{ExamList, ExamListRefresher, ExamTab, SharedExamList};
pub use workflow::AssignmentWorkflow;
