//! Proctor assignment workflow: selection, insufficient-candidates fallback
//! and the controller that sequences them against the backend

pub mod controller;
pub mod insufficient;
pub mod notification;
pub mod selection;

pub use controller::{AssignmentWorkflow, DialogView, RequeryResult, RequestOutcome, SuggestionOutcome};
pub use insufficient::{InsufficientHandler, InsufficientState, Resolution, StateTransition};
pub use notification::{Notification, NotificationAction, NotificationCenter, Severity};
pub use selection::{FinalSelection, SelectionCount, SelectionState};
