//! Data models for the proctor assignment workflow

pub mod assignment;
pub mod exam;
pub mod overrides;
pub mod proctor;

pub use assignment::{AssignmentMode, AssignmentRequest};
pub use exam::{CourseRef, Exam, ExamId, ExamStatus, StatusUpdate};
pub use overrides::{OverrideFlags, OverrideRule};
pub use proctor::{AcademicLevel, EligibleProctor, Eligibility, EmploymentType, TaId};
