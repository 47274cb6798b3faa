//! Dismissible user-facing notifications
//!
//! Every error raised by a workflow operation lands here instead of
//! propagating further. Only the workflow attaches actions, and only when
//! it can honour them.

use crate::error::WorkflowError;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// In-place recovery offered alongside a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    /// Resubmit the rejected assignment with `replace_existing = true`
    RetryWithReplace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub severity: Severity,
    pub message: String,
    pub action: Option<NotificationAction>,
    pub raised_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(id: u64, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id,
            severity,
            message: message.into(),
            action: None,
            raised_at: Utc::now(),
        }
    }

    pub fn from_error(id: u64, err: &WorkflowError) -> Self {
        let severity = match err {
            WorkflowError::Precondition(_) => Severity::Warning,
            WorkflowError::Fetch(_) | WorkflowError::Assignment(_) => Severity::Error,
        };

        Self::new(id, severity, err.to_string())
    }

    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.action = Some(action);
        self
    }
}

/// Ordered list of pending notifications
#[derive(Debug, Default)]
pub struct NotificationCenter {
    next_id: u64,
    items: Vec<Notification>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_error(&mut self, err: &WorkflowError) -> u64 {
        let id = self.allocate_id();
        self.items.push(Notification::from_error(id, err));
        id
    }

    pub fn push_error_with_action(&mut self, err: &WorkflowError, action: NotificationAction) -> u64 {
        let id = self.allocate_id();
        self.items.push(Notification::from_error(id, err).with_action(action));
        id
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) -> u64 {
        let id = self.allocate_id();
        self.items.push(Notification::new(id, severity, message));
        id
    }

    /// Remove one notification; false if it was already gone
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    /// Remove every notification offering `action`
    pub fn dismiss_action(&mut self, action: NotificationAction) {
        self.items.retain(|n| n.action != Some(action));
    }

    pub fn list(&self) -> &[Notification] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AssignmentError, FetchError, PreconditionError};

    #[test]
    fn test_conflict_carries_no_action_by_itself() {
        let err: WorkflowError = AssignmentError::AlreadyAssigned("exam 4 has proctors".into()).into();
        let notification = Notification::from_error(1, &err);

        assert_eq!(notification.severity, Severity::Error);
        assert!(notification.action.is_none());

        let notification = notification.with_action(NotificationAction::RetryWithReplace);
        assert_eq!(notification.action, Some(NotificationAction::RetryWithReplace));
    }

    #[test]
    fn test_precondition_is_warning_without_action() {
        let err: WorkflowError = PreconditionError::NoProctorsRequired.into();
        let notification = Notification::from_error(1, &err);

        assert_eq!(notification.severity, Severity::Warning);
        assert!(notification.action.is_none());
        assert_eq!(notification.message, "Exam requires no proctors");
    }

    #[test]
    fn test_center_dismiss() {
        let mut center = NotificationCenter::new();
        let a = center.push_error(&FetchError::NotFound.into());
        let b = center.push_error_with_action(
            &AssignmentError::AlreadyAssigned("x".into()).into(),
            NotificationAction::RetryWithReplace,
        );
        let c = center.push(Severity::Info, "Assigned 2 proctors");
        assert_ne!(a, b);

        assert!(center.dismiss(a));
        assert!(!center.dismiss(a));

        center.dismiss_action(NotificationAction::RetryWithReplace);
        let ids: Vec<u64> = center.list().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![c]);
    }
}
