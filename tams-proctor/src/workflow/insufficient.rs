//! Insufficient-candidates state machine
//!
//! NORMAL → INSUFFICIENT_DETECTED → OVERRIDE_REQUERY (re-entrant) → RESOLVED
//!
//! Closing the dialog from INSUFFICIENT_DETECTED or OVERRIDE_REQUERY returns
//! to NORMAL. Every other transition is rejected with
//! [`PreconditionError::IllegalTransition`] and leaves the handler unchanged.

use crate::error::PreconditionError;
use crate::models::{OverrideFlags, OverrideRule};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsufficientState {
    /// No insufficient-candidates dialog
    Normal,
    /// Fewer candidates than required at suggestion time
    InsufficientDetected,
    /// Candidates re-fetched with relaxed rules
    OverrideRequery,
    /// Exited through assignment or escalation
    Resolved,
}

impl InsufficientState {
    /// Insufficient-candidates dialog is showing
    pub fn is_dialog_open(&self) -> bool {
        matches!(
            self,
            InsufficientState::InsufficientDetected | InsufficientState::OverrideRequery
        )
    }
}

/// Backend-calling exits of the dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// All current candidates submitted with `replace_existing = true`
    AssignedFound,
    /// Exam moved to cross-department approval
    CrossDepartmentRequested,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateTransition {
    pub from: InsufficientState,
    pub to: InsufficientState,
    pub event: &'static str,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsufficientHandler {
    state: InsufficientState,
    flags: OverrideFlags,
    shortfall: u32,
    available: usize,
    last_error: Option<String>,
    resolution: Option<Resolution>,
}

impl Default for InsufficientHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl InsufficientHandler {
    pub fn new() -> Self {
        Self {
            state: InsufficientState::Normal,
            flags: OverrideFlags::default(),
            shortfall: 0,
            available: 0,
            last_error: None,
            resolution: None,
        }
    }

    pub fn state(&self) -> InsufficientState {
        self.state
    }

    pub fn flags(&self) -> OverrideFlags {
        self.flags
    }

    pub fn shortfall(&self) -> u32 {
        self.shortfall
    }

    /// Candidates found by the latest fetch
    pub fn available(&self) -> usize {
        self.available
    }

    /// Error from the latest failed requery or exit
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    /// Suggestion found `available` candidates for `required` slots
    pub fn detect(&mut self, available: usize, required: u32) -> Result<StateTransition, PreconditionError> {
        self.expect(&[InsufficientState::Normal], "detect insufficient candidates")?;
        self.record_counts(available, required);
        self.last_error = None;
        Ok(self.transition(InsufficientState::InsufficientDetected, "detect insufficient candidates"))
    }

    /// Flags to re-fetch with after toggling `rule`
    ///
    /// The handler is not changed until [`Self::complete_requery`]; a failed
    /// fetch keeps the previous flags and candidates.
    pub fn begin_requery(&self, rule: OverrideRule) -> Result<OverrideFlags, PreconditionError> {
        self.expect(
            &[InsufficientState::InsufficientDetected, InsufficientState::OverrideRequery],
            "toggle override",
        )?;
        let mut flags = self.flags;
        flags.toggle(rule);
        Ok(flags)
    }

    /// Re-fetch with `flags` succeeded with `available` candidates
    pub fn complete_requery(
        &mut self,
        flags: OverrideFlags,
        available: usize,
        required: u32,
    ) -> Result<StateTransition, PreconditionError> {
        self.expect(
            &[InsufficientState::InsufficientDetected, InsufficientState::OverrideRequery],
            "toggle override",
        )?;
        self.flags = flags;
        self.record_counts(available, required);
        self.last_error = None;
        Ok(self.transition(InsufficientState::OverrideRequery, "toggle override"))
    }

    /// Fail early if `event` cannot resolve the dialog
    pub fn ensure_can_resolve(&self, event: &'static str) -> Result<(), PreconditionError> {
        self.expect(
            &[InsufficientState::InsufficientDetected, InsufficientState::OverrideRequery],
            event,
        )
    }

    pub fn resolve(&mut self, resolution: Resolution) -> Result<StateTransition, PreconditionError> {
        let event = match resolution {
            Resolution::AssignedFound => "assign found candidates",
            Resolution::CrossDepartmentRequested => "request cross-department proctors",
        };
        self.ensure_can_resolve(event)?;
        self.resolution = Some(resolution);
        self.last_error = None;
        Ok(self.transition(InsufficientState::Resolved, event))
    }

    /// Close the dialog without side effects
    pub fn dismiss(&mut self) -> Result<StateTransition, PreconditionError> {
        self.expect(
            &[InsufficientState::InsufficientDetected, InsufficientState::OverrideRequery],
            "close insufficient-candidates dialog",
        )?;
        self.flags = OverrideFlags::default();
        self.shortfall = 0;
        self.available = 0;
        self.last_error = None;
        Ok(self.transition(InsufficientState::Normal, "close insufficient-candidates dialog"))
    }

    /// Keep the dialog in place with an error message
    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    fn record_counts(&mut self, available: usize, required: u32) {
        let available_u32 = u32::try_from(available).unwrap_or(u32::MAX);
        self.available = available;
        self.shortfall = required.saturating_sub(available_u32);
    }

    fn expect(&self, allowed: &[InsufficientState], event: &'static str) -> Result<(), PreconditionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(PreconditionError::IllegalTransition {
                from: self.state,
                event,
            })
        }
    }

    fn transition(&mut self, to: InsufficientState, event: &'static str) -> StateTransition {
        let transition = StateTransition {
            from: self.state,
            to,
            event,
            at: Utc::now(),
        };
        tracing::debug!(from = ?transition.from, to = ?to, event, "Insufficient-candidates transition");
        self.state = to;
        transition
    }
}
