//! Selection state manager
//!
//! Holds the chosen TA ids plus the paid/replace flags and mediates between
//! manual toggling and auto-suggestion. Ids reference the last fetched
//! candidate list; the selection keeps insertion order for display.

use crate::error::PreconditionError;
use crate::models::{AssignmentMode, AssignmentRequest, EligibleProctor, TaId};

/// Selection size relative to the exam's required proctor count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionCount {
    Exact,
    Below { missing: u32 },
    Above { excess: u32 },
}

impl SelectionCount {
    pub fn of(selected: usize, required: u32) -> Self {
        let selected = u32::try_from(selected).unwrap_or(u32::MAX);
        match selected.cmp(&required) {
            std::cmp::Ordering::Equal => SelectionCount::Exact,
            std::cmp::Ordering::Less => SelectionCount::Below {
                missing: required - selected,
            },
            std::cmp::Ordering::Greater => SelectionCount::Above {
                excess: selected - required,
            },
        }
    }

    /// Soft warning shown next to the selection, if any
    pub fn warning(&self) -> Option<String> {
        match self {
            SelectionCount::Exact => None,
            SelectionCount::Below { missing } => Some(format!("{} more proctor(s) needed", missing)),
            SelectionCount::Above { excess } => {
                Some(format!("{} proctor(s) over the required count", excess))
            }
        }
    }
}

/// Snapshot handed to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalSelection {
    pub ids: Vec<TaId>,
    pub is_paid: bool,
    pub replace_existing: bool,
    pub mode: AssignmentMode,
}

impl FinalSelection {
    /// Check the selection against `required` before submission
    ///
    /// Over-selection is rejected; under-selection needs `confirm_short`.
    pub fn validate(&self, required: u32, confirm_short: bool) -> Result<(), PreconditionError> {
        if self.ids.is_empty() {
            return Err(PreconditionError::EmptySelection);
        }
        match SelectionCount::of(self.ids.len(), required) {
            SelectionCount::Exact => Ok(()),
            SelectionCount::Above { .. } => Err(PreconditionError::SelectionExceedsRequired {
                selected: self.ids.len(),
                required,
            }),
            SelectionCount::Below { .. } if confirm_short => Ok(()),
            SelectionCount::Below { .. } => Err(PreconditionError::SelectionBelowRequired {
                selected: self.ids.len(),
                required,
            }),
        }
    }

    pub fn into_request(self) -> AssignmentRequest {
        AssignmentRequest::new(self.mode, self.ids, self.replace_existing, self.is_paid)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: Vec<TaId>,
    is_paid: bool,
    replace_existing: bool,
    in_review: bool,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial selection: the candidates already assigned to the exam
    pub fn seeded(candidates: &[EligibleProctor]) -> Self {
        let mut state = Self::new();
        state.reset_to_assigned(candidates);
        state
    }

    /// Add `id` if absent, remove it if present; returns whether it is now selected
    pub fn toggle(&mut self, id: TaId) -> bool {
        if let Some(pos) = self.selected.iter().position(|&s| s == id) {
            self.selected.remove(pos);
            false
        } else {
            self.selected.push(id);
            true
        }
    }

    pub fn contains(&self, id: TaId) -> bool {
        self.selected.contains(&id)
    }

    pub fn selected(&self) -> &[TaId] {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn set_paid(&mut self, paid: bool) {
        self.is_paid = paid;
    }

    pub fn replace_existing(&self) -> bool {
        self.replace_existing
    }

    pub fn set_replace_existing(&mut self, replace: bool) {
        self.replace_existing = replace;
    }

    /// Auto-suggest review phase
    pub fn in_review(&self) -> bool {
        self.in_review
    }

    /// Replace the selection with a suggestion and enter review
    pub fn apply_suggestion(&mut self, ids: &[TaId], required: u32) -> Result<(), PreconditionError> {
        if required == 0 {
            return Err(PreconditionError::NoProctorsRequired);
        }
        if ids.is_empty() {
            return Err(PreconditionError::NoCandidates);
        }

        self.selected.clear();
        for &id in ids {
            if !self.selected.contains(&id) {
                self.selected.push(id);
            }
        }
        self.in_review = true;
        Ok(())
    }

    /// Leave review and reset to the already-assigned candidates
    ///
    /// No undo history is kept; the reset point is always the assigned set.
    pub fn cancel_suggestion(&mut self, candidates: &[EligibleProctor]) {
        self.reset_to_assigned(candidates);
        self.in_review = false;
    }

    /// Drop ids no longer present in `candidates`
    pub fn retain_candidates(&mut self, candidates: &[EligibleProctor]) -> usize {
        let before = self.selected.len();
        self.selected
            .retain(|id| candidates.iter().any(|c| c.id == *id));
        before - self.selected.len()
    }

    pub fn count_against(&self, required: u32) -> SelectionCount {
        SelectionCount::of(self.selected.len(), required)
    }

    /// Current selection and flags; state is not cleared
    pub fn finalize(&self) -> FinalSelection {
        FinalSelection {
            ids: self.selected.clone(),
            is_paid: self.is_paid,
            replace_existing: self.replace_existing,
            mode: if self.in_review {
                AssignmentMode::Automatic
            } else {
                AssignmentMode::Manual
            },
        }
    }

    fn reset_to_assigned(&mut self, candidates: &[EligibleProctor]) {
        self.selected = candidates
            .iter()
            .filter(|c| c.is_assigned_to_current_exam)
            .map(|c| c.id)
            .collect();
    }
}
