//! Candidate ranking for auto-suggestion
//!
//! # Algorithm
//!
//! 1. Partition candidates into tiers:
//!    - Tier A: already assigned to this exam
//!    - Tier B: teaching a section of the exam's course (and not in A)
//!    - Tier C: everyone else
//! 2. Within each tier, order by ascending current workload
//! 3. Ties keep the backend's order (stable sort)
//!
//! Keeping already-assigned and course-affiliated TAs first minimizes churn;
//! ascending workload approximates load balancing. This is an assistive
//! suggestion, not a constraint solver.

use crate::models::{EligibleProctor, TaId};
use std::cmp::Ordering;

/// Priority tier, lowest value ranks first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    AssignedToExam,
    TeachesCourse,
    Other,
}

pub fn tier_of(candidate: &EligibleProctor) -> Tier {
    if candidate.is_assigned_to_current_exam {
        Tier::AssignedToExam
    } else if candidate.is_teaching_course_section {
        Tier::TeachesCourse
    } else {
        Tier::Other
    }
}

fn compare(a: &EligibleProctor, b: &EligibleProctor) -> Ordering {
    tier_of(a)
        .cmp(&tier_of(b))
        .then_with(|| a.current_workload.total_cmp(&b.current_workload))
}

/// Rank every candidate; the input slice is not modified
pub fn rank(candidates: &[EligibleProctor]) -> Vec<TaId> {
    let mut ordered: Vec<&EligibleProctor> = candidates.iter().collect();
    // sort_by is stable: equal (tier, workload) keeps input order
    ordered.sort_by(|a, b| compare(a, b));
    ordered.into_iter().map(|c| c.id).collect()
}

/// Auto-suggestion for an exam
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// First `min(required, total)` ranked ids
    pub ids: Vec<TaId>,
    pub required: u32,
    /// `required - total` when fewer candidates exist than required
    pub shortfall: u32,
}

impl Suggestion {
    pub fn is_short(&self) -> bool {
        self.shortfall > 0
    }
}

/// Suggest `required` proctors from `candidates`
pub fn suggest(candidates: &[EligibleProctor], required: u32) -> Suggestion {
    let mut ids = rank(candidates);
    ids.truncate(required as usize);

    let total = u32::try_from(candidates.len()).unwrap_or(u32::MAX);
    Suggestion {
        ids,
        required,
        shortfall: required.saturating_sub(total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AcademicLevel, Eligibility, EmploymentType};

    fn candidate(id: TaId, workload: f64, assigned: bool, teaching: bool) -> EligibleProctor {
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

    fn scenario() -> Vec<EligibleProctor> {
        vec![
            candidate(1, 5.0, true, false),
            candidate(2, 1.0, false, true),
            candidate(3, 0.0, false, false),
            candidate(4, 2.0, false, false),
        ]
    }

    #[test]
    fn test_tiers_then_workload() {
        assert_eq!(rank(&scenario()), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_suggestion_truncates_to_required() {
        let suggestion = suggest(&scenario(), 3);
        assert_eq!(suggestion.ids, vec![1, 2, 3]);
        assert_eq!(suggestion.shortfall, 0);
        assert!(!suggestion.is_short());
    }

    #[test]
    fn test_assigned_and_teaching_counts_as_tier_a() {
        let candidates = vec![
            candidate(1, 0.0, false, true),
            candidate(2, 9.0, true, true),
        ];
        assert_eq!(tier_of(&candidates[1]), Tier::AssignedToExam);
        assert_eq!(rank(&candidates), vec![2, 1]);
    }

    #[test]
    fn test_workload_ties_keep_input_order() {
        let candidates = vec![
            candidate(10, 3.0, false, false),
            candidate(4, 3.0, false, false),
            candidate(7, 3.0, false, false),
            candidate(1, 1.0, false, false),
        ];
        assert_eq!(rank(&candidates), vec![1, 10, 4, 7]);
    }

    #[test]
    fn test_rank_is_deterministic_and_does_not_mutate() {
        let candidates = vec![
            candidate(5, 2.0, false, true),
            candidate(6, 2.0, false, true),
            candidate(7, 0.5, true, false),
            candidate(8, 2.0, false, false),
            candidate(9, 2.0, false, true),
        ];
        let before = candidates.clone();

        let first = rank(&candidates);
        let second = rank(&candidates);

        assert_eq!(first, second);
        assert_eq!(first, vec![7, 5, 6, 9, 8]);
        assert_eq!(candidates, before);
    }

    #[test]
    fn test_tier_a_precedes_b_precedes_c() {
        let candidates = vec![
            candidate(1, 0.0, false, false),
            candidate(2, 0.0, false, true),
            candidate(3, 100.0, true, false),
            candidate(4, 50.0, false, true),
            candidate(5, 75.0, true, false),
        ];
        let ranked = rank(&candidates);
        let position = |id: TaId| ranked.iter().position(|&x| x == id).unwrap();

        for c in &candidates {
            for d in &candidates {
                if tier_of(c) < tier_of(d) {
                    assert!(position(c.id) < position(d.id), "{} should precede {}", c.id, d.id);
                }
            }
        }
    }

    #[test]
    fn test_shortfall_when_too_few_candidates() {
        let candidates = vec![candidate(1, 1.0, false, false), candidate(2, 0.0, false, false)];
        let suggestion = suggest(&candidates, 5);

        assert_eq!(suggestion.ids, vec![2, 1]);
        assert_eq!(suggestion.shortfall, 3);
        assert!(suggestion.is_short());
    }

    #[test]
    fn test_suggestion_length_is_min_of_required_and_total() {
        let candidates = scenario();
        for required in 0..8u32 {
            let suggestion = suggest(&candidates, required);
            assert_eq!(
                suggestion.ids.len(),
                (required as usize).min(candidates.len())
            );
            assert_eq!(
                suggestion.shortfall,
                required.saturating_sub(candidates.len() as u32)
            );
        }
    }

    #[test]
    fn test_empty_candidates() {
        assert!(rank(&[]).is_empty());
        let suggestion = suggest(&[], 2);
        assert!(suggestion.ids.is_empty());
        assert_eq!(suggestion.shortfall, 2);
    }
}
