//! Assignment command sent to `POST /exams/{id}/assign-proctors/`

use crate::models::TaId;
use serde::{Deserialize, Serialize};

/// Which path produced an assignment; the backend audits this
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentMode {
    Manual,
    Automatic,
}

/// Assignment command body
///
/// Serializes as
/// `{"assignment_type": "MANUAL", "manual_proctors": [..], "replace_existing": .., "is_paid": ..}`
/// or
/// `{"assignment_type": "AUTOMATIC", "proctor_ids": [..], "replace_existing": .., "is_paid": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "assignment_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentRequest {
    Manual {
        manual_proctors: Vec<TaId>,
        replace_existing: bool,
        is_paid: bool,
    },
    Automatic {
        proctor_ids: Vec<TaId>,
        replace_existing: bool,
        is_paid: bool,
    },
}

impl AssignmentRequest {
    pub fn new(mode: AssignmentMode, proctors: Vec<TaId>, replace_existing: bool, is_paid: bool) -> Self {
        match mode {
            AssignmentMode::Manual => AssignmentRequest::Manual {
                manual_proctors: proctors,
                replace_existing,
                is_paid,
            },
            AssignmentMode::Automatic => AssignmentRequest::Automatic {
                proctor_ids: proctors,
                replace_existing,
                is_paid,
            },
        }
    }

    pub fn mode(&self) -> AssignmentMode {
        match self {
            AssignmentRequest::Manual { .. } => AssignmentMode::Manual,
            AssignmentRequest::Automatic { .. } => AssignmentMode::Automatic,
        }
    }

    pub fn proctors(&self) -> &[TaId] {
        match self {
            AssignmentRequest::Manual { manual_proctors, .. } => manual_proctors,
            AssignmentRequest::Automatic { proctor_ids, .. } => proctor_ids,
        }
    }

    pub fn replace_existing(&self) -> bool {
        match self {
            AssignmentRequest::Manual { replace_existing, .. }
            | AssignmentRequest::Automatic { replace_existing, .. } => *replace_existing,
        }
    }

    pub fn is_paid(&self) -> bool {
        match self {
            AssignmentRequest::Manual { is_paid, .. } | AssignmentRequest::Automatic { is_paid, .. } => {
                *is_paid
            }
        }
    }

    /// Same command with `replace_existing = true`
    pub fn with_replace_existing(self) -> Self {
        let mode = self.mode();
        let is_paid = self.is_paid();
        let proctors = match self {
            AssignmentRequest::Manual { manual_proctors, .. } => manual_proctors,
            AssignmentRequest::Automatic { proctor_ids, .. } => proctor_ids,
        };
        Self::new(mode, proctors, true, is_paid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_manual_wire_format() {
        let request = AssignmentRequest::new(AssignmentMode::Manual, vec![3, 1], false, true);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "assignment_type": "MANUAL",
                "manual_proctors": [3, 1],
                "replace_existing": false,
                "is_paid": true
            })
        );
    }

    #[test]
    fn test_automatic_wire_format() {
        let request = AssignmentRequest::new(AssignmentMode::Automatic, vec![5], true, false);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "assignment_type": "AUTOMATIC",
                "proctor_ids": [5],
                "replace_existing": true,
                "is_paid": false
            })
        );
    }

    #[test]
    fn test_with_replace_existing_keeps_mode_and_proctors() {
        let request = AssignmentRequest::new(AssignmentMode::Automatic, vec![4, 2], false, true);
        let retry = request.clone().with_replace_existing();

        assert_eq!(retry.mode(), AssignmentMode::Automatic);
        assert_eq!(retry.proctors(), request.proctors());
        assert!(retry.replace_existing());
        assert!(retry.is_paid());
    }
}
