//! Eligible proctor projection
//!
//! Computed by the backend on every fetch and never persisted client-side.

use serde::{Deserialize, Serialize};

pub type TaId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcademicLevel {
    Bachelors,
    Masters,
    Phd,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    #[serde(other)]
    Unknown,
}

/// Constraint violations and department affiliation for one candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Eligibility {
    /// Rules the candidate breaks (only possible with override flags set)
    #[serde(default)]
    pub violations: Vec<String>,

    #[serde(default)]
    pub is_cross_department: bool,
}

/// A TA the backend currently considers assignable to an exam
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibleProctor {
    pub id: TaId,
    pub name: String,
    pub email: String,
    pub academic_level: AcademicLevel,
    pub employment_type: EmploymentType,
    /// Current load units
    pub current_workload: f64,
    #[serde(default)]
    pub is_assigned_to_current_exam: bool,
    #[serde(default)]
    pub is_teaching_course_section: bool,
    #[serde(default)]
    pub eligibility: Eligibility,
}

impl EligibleProctor {
    pub fn has_violations(&self) -> bool {
        !self.eligibility.violations.is_empty()
    }

    /// Workload as a percentage of the busiest candidate's workload
    ///
    /// Returns 0.0 when `busiest` is not positive.
    pub fn workload_percentage(&self, busiest: f64) -> f64 {
        if busiest <= 0.0 || !busiest.is_finite() {
            return 0.0;
        }
        (self.current_workload / busiest * 100.0).clamp(0.0, 100.0)
    }
}

/// Highest workload among `candidates` (0.0 for an empty list)
pub fn busiest_workload(candidates: &[EligibleProctor]) -> f64 {
    candidates
        .iter()
        .map(|c| c.current_workload)
        .filter(|w| w.is_finite())
        .fold(0.0, f64::max)
}
