//! Error types for tams-proctor
//!
//! Three kinds of failure, all caught at the workflow boundary and surfaced
//! as dismissible notifications:
//! - [`FetchError`]: exam or candidate retrieval failed
//! - [`AssignmentError`]: the backend rejected a submission or status change
//! - [`PreconditionError`]: the operation is not allowed in the current state

use crate::models::{ExamStatus, TaId};
use crate::workflow::insufficient::InsufficientState;
use tams_common::api::TransportError;
use thiserror::Error;

/// Backend error code for the "exam already has assignments" conflict
pub const ALREADY_ASSIGNED_CODE: &str = "already_assigned";

/// Exam or candidate retrieval failed
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Exam not found")]
    NotFound,

    #[error("Backend error {status}: {message}")]
    Backend { status: u16, message: String },

    /// Response did not match the expected envelope or model
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl From<TransportError> for FetchError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Network(msg) => FetchError::Network(msg),
            TransportError::Unauthorized(msg) => FetchError::Unauthorized(msg),
            TransportError::Status { status: 404, .. } => FetchError::NotFound,
            TransportError::Status { status, body } => FetchError::Backend {
                status,
                message: body.message_or_default().to_string(),
            },
            TransportError::Decode(msg) => FetchError::MalformedResponse(msg),
        }
    }
}

/// Backend rejected an assignment or status change
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AssignmentError {
    /// Exam already has proctors and `replace_existing` was false
    #[error("Exam already has assigned proctors: {0}")]
    AlreadyAssigned(String),

    #[error("Backend rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl AssignmentError {
    /// Classify a failed exam status change
    ///
    /// A conflict here is a status conflict, never an assignment conflict.
    pub fn from_status_change(err: TransportError) -> Self {
        match err {
            TransportError::Status { status, body } => AssignmentError::Rejected {
                status,
                message: body.message_or_default().to_string(),
            },
            other => AssignmentError::from(other),
        }
    }
}

impl From<TransportError> for AssignmentError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status { status, body }
                if status == 409 || body.has_code(ALREADY_ASSIGNED_CODE) =>
            {
                AssignmentError::AlreadyAssigned(body.message_or_default().to_string())
            }
            TransportError::Status { status, body } => AssignmentError::Rejected {
                status,
                message: body.message_or_default().to_string(),
            },
            TransportError::Network(msg) => AssignmentError::Network(msg),
            TransportError::Unauthorized(msg) => AssignmentError::Unauthorized(msg),
            TransportError::Decode(msg) => AssignmentError::MalformedResponse(msg),
        }
    }
}

/// Operation attempted in a state that forbids it
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PreconditionError {
    #[error("Exam requires no proctors")]
    NoProctorsRequired,

    #[error("No eligible candidates available")]
    NoCandidates,

    #[error("No proctors selected")]
    EmptySelection,

    #[error("TA {0} is not an eligible candidate for this exam")]
    UnknownCandidate(TaId),

    #[error("{selected} proctors selected but the exam requires only {required}")]
    SelectionExceedsRequired { selected: usize, required: u32 },

    /// Fewer than required; submitting needs explicit confirmation
    #[error("Only {selected} of {required} required proctors selected; confirm to submit anyway")]
    SelectionBelowRequired { selected: usize, required: u32 },

    #[error("A request for this exam is already in progress")]
    RequestInFlight,

    #[error("Assignment dialog is not open")]
    DialogClosed,

    #[error("Exam details have not been loaded")]
    ExamNotLoaded,

    #[error("Cannot {event} while {from:?}")]
    IllegalTransition {
        from: InsufficientState,
        event: &'static str,
    },

    #[error("No rejected submission to retry")]
    NoPendingRetry,

    #[error("Exam is {0} and cannot be escalated")]
    CannotEscalate(ExamStatus),
}

/// Any failure surfaced by the assignment workflow
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),
}

impl WorkflowError {
    /// The "already assigned" conflict
    pub fn is_already_assigned(&self) -> bool {
        matches!(
            self,
            WorkflowError::Assignment(AssignmentError::AlreadyAssigned(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tams_common::api::ApiErrorBody;

    fn status(status: u16, code: Option<&str>) -> TransportError {
        TransportError::Status {
            status,
            body: ApiErrorBody {
                code: code.map(str::to_string),
                message: Some("rejected".to_string()),
            },
        }
    }

    #[test]
    fn test_fetch_error_mapping() {
        assert_eq!(FetchError::from(status(404, None)), FetchError::NotFound);
        assert_eq!(
            FetchError::from(status(500, None)),
            FetchError::Backend {
                status: 500,
                message: "rejected".to_string()
            }
        );
        assert!(matches!(
            FetchError::from(TransportError::Decode("expected results".to_string())),
            FetchError::MalformedResponse(_)
        ));
    }

    #[test]
    fn test_conflict_maps_to_already_assigned() {
        assert!(matches!(
            AssignmentError::from(status(409, None)),
            AssignmentError::AlreadyAssigned(_)
        ));
        // Older endpoints answer 400 with the error code
        assert!(matches!(
            AssignmentError::from(status(400, Some(ALREADY_ASSIGNED_CODE))),
            AssignmentError::AlreadyAssigned(_)
        ));
        assert!(matches!(
            AssignmentError::from(status(400, Some("invalid_proctor"))),
            AssignmentError::Rejected { status: 400, .. }
        ));
    }

    #[test]
    fn test_status_change_conflict_is_plain_rejection() {
        assert_eq!(
            AssignmentError::from_status_change(status(409, Some(ALREADY_ASSIGNED_CODE))),
            AssignmentError::Rejected {
                status: 409,
                message: "rejected".to_string()
            }
        );
        assert!(matches!(
            AssignmentError::from_status_change(TransportError::Network("reset".to_string())),
            AssignmentError::Network(_)
        ));
    }

    #[test]
    fn test_is_already_assigned() {
        let err: WorkflowError = AssignmentError::AlreadyAssigned("x".to_string()).into();
        assert!(err.is_already_assigned());

        let err: WorkflowError = PreconditionError::NoCandidates.into();
        assert!(!err.is_already_assigned());
    }
}
