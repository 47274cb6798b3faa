//! Proctor assignment workflow controller
//!
//! Owns at most one assignment dialog. Dialog state sits behind a mutex that
//! is never held across a backend call. Each call carries a [`Ticket`]
//! (dialog epoch + exam id); when the response arrives for a dialog that was
//! closed or reopened in the meantime, the result is abandoned without
//! touching state.
//!
//! While a request is in flight every other operation on the dialog fails
//! with [`PreconditionError::RequestInFlight`]. Every error returned by a
//! public operation is also recorded as a [`Notification`].

use crate::error::{AssignmentError, PreconditionError, WorkflowError};
use crate::exam_list::ExamListRefresher;
use crate::models::{
    AssignmentMode, AssignmentRequest, EligibleProctor, Exam, ExamId, OverrideFlags, OverrideRule,
    TaId,
};
use crate::services::{suggest, CandidateFetcher, CandidateList, ProctorBackend, SubmissionDispatcher, Suggestion};
use crate::workflow::insufficient::{InsufficientHandler, InsufficientState, Resolution};
use crate::workflow::notification::{Notification, NotificationAction, NotificationCenter, Severity};
use crate::workflow::selection::{SelectionCount, SelectionState};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Result of a backend-calling operation
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome<T> {
    Applied(T),
    /// Dialog closed or reopened before the response arrived
    Abandoned,
}

impl<T> RequestOutcome<T> {
    pub fn is_abandoned(&self) -> bool {
        matches!(self, RequestOutcome::Abandoned)
    }

    pub fn applied(self) -> Option<T> {
        match self {
            RequestOutcome::Applied(value) => Some(value),
            RequestOutcome::Abandoned => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionOutcome {
    /// Selection replaced by the suggestion; review phase entered
    Applied(Suggestion),
    /// Fewer candidates than required; insufficient-candidates dialog opened
    Insufficient {
        available: usize,
        required: u32,
        shortfall: u32,
    },
}

/// Candidates after an override re-fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequeryResult {
    pub available: usize,
    pub shortfall: u32,
    /// Selected ids dropped because the new list no longer contains them
    pub pruned: usize,
}

/// Read-only snapshot of the dialog for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct DialogView {
    pub session_id: Uuid,
    pub exam_id: ExamId,
    pub exam: Option<Exam>,
    pub candidates: Vec<EligibleProctor>,
    pub selected: Vec<TaId>,
    pub is_paid: bool,
    pub replace_existing: bool,
    pub in_review: bool,
    pub selection_count: Option<SelectionCount>,
    pub insufficient: InsufficientState,
    pub overrides: OverrideFlags,
    pub shortfall: u32,
    pub insufficient_error: Option<String>,
    pub in_flight: bool,
    pub retry_available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ticket {
    epoch: u64,
    exam_id: ExamId,
}

struct DialogState {
    session_id: Uuid,
    epoch: u64,
    exam_id: ExamId,
    exam: Option<Exam>,
    candidates: Option<CandidateList>,
    selection: SelectionState,
    insufficient: InsufficientHandler,
    in_flight: bool,
    /// Submission rejected by the "already assigned" conflict
    pending_retry: Option<AssignmentRequest>,
}

impl DialogState {
    fn new(epoch: u64, exam_id: ExamId) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            epoch,
            exam_id,
            exam: None,
            candidates: None,
            selection: SelectionState::new(),
            insufficient: InsufficientHandler::new(),
            in_flight: false,
            pending_retry: None,
        }
    }

    fn ticket(&self) -> Ticket {
        Ticket {
            epoch: self.epoch,
            exam_id: self.exam_id,
        }
    }

    fn required(&self) -> Result<u32, PreconditionError> {
        self.exam
            .as_ref()
            .map(|e| e.required_proctors)
            .ok_or(PreconditionError::ExamNotLoaded)
    }

    fn expect_normal(&self, event: &'static str) -> Result<(), PreconditionError> {
        match self.insufficient.state() {
            InsufficientState::Normal => Ok(()),
            from => Err(PreconditionError::IllegalTransition { from, event }),
        }
    }

    fn clear_pending_retry(&mut self, notices: &mut NotificationCenter) {
        if self.pending_retry.take().is_some() {
            notices.dismiss_action(NotificationAction::RetryWithReplace);
        }
    }

    fn view(&self) -> DialogView {
        DialogView {
            session_id: self.session_id,
            exam_id: self.exam_id,
            exam: self.exam.clone(),
            candidates: self
                .candidates
                .as_ref()
                .map(|l| l.candidates.clone())
                .unwrap_or_default(),
            selected: self.selection.selected().to_vec(),
            is_paid: self.selection.is_paid(),
            replace_existing: self.selection.replace_existing(),
            in_review: self.selection.in_review(),
            selection_count: self.required().ok().map(|r| self.selection.count_against(r)),
            insufficient: self.insufficient.state(),
            overrides: self.insufficient.flags(),
            shortfall: self.insufficient.shortfall(),
            insufficient_error: self.insufficient.last_error().map(str::to_string),
            in_flight: self.in_flight,
            retry_available: self.pending_retry.is_some(),
        }
    }
}

#[derive(Default)]
struct WorkflowState {
    dialog: Option<DialogState>,
    notices: NotificationCenter,
}

/// Open dialog with no request in flight
fn ready(slot: &mut Option<DialogState>) -> Result<&mut DialogState, PreconditionError> {
    let dialog = slot.as_mut().ok_or(PreconditionError::DialogClosed)?;
    if dialog.in_flight {
        return Err(PreconditionError::RequestInFlight);
    }
    Ok(dialog)
}

/// Dialog that issued `ticket`, if it is still open
fn live(slot: &mut Option<DialogState>, ticket: Ticket) -> Option<&mut DialogState> {
    slot.as_mut()
        .filter(|d| d.epoch == ticket.epoch && d.exam_id == ticket.exam_id)
}

pub struct AssignmentWorkflow {
    fetcher: CandidateFetcher,
    dispatcher: SubmissionDispatcher,
    state: Mutex<WorkflowState>,
    next_epoch: AtomicU64,
}

impl AssignmentWorkflow {
    pub fn new(fetcher: CandidateFetcher, dispatcher: SubmissionDispatcher) -> Self {
        Self {
            fetcher,
            dispatcher,
            state: Mutex::new(WorkflowState::default()),
            next_epoch: AtomicU64::new(0),
        }
    }

    /// Wire fetcher and dispatcher to one backend
    pub fn from_backend(
        backend: Arc<dyn ProctorBackend>,
        refresher: Option<Arc<dyn ExamListRefresher>>,
    ) -> Self {
        let mut dispatcher = SubmissionDispatcher::new(Arc::clone(&backend));
        if let Some(refresher) = refresher {
            dispatcher = dispatcher.with_refresher(refresher);
        }
        Self::new(CandidateFetcher::new(backend), dispatcher)
    }

    // ----- Dialog lifecycle -----

    /// Open the assignment dialog for `exam_id`, replacing any open dialog
    ///
    /// Loads the exam and its eligible candidates; the selection starts with
    /// the candidates already assigned to the exam.
    pub async fn open(&self, exam_id: ExamId) -> Result<RequestOutcome<DialogView>, WorkflowError> {
        let ticket = {
            let mut state = self.state.lock().await;
            let epoch = self.next_epoch.fetch_add(1, Ordering::SeqCst) + 1;
            let mut dialog = DialogState::new(epoch, exam_id);
            dialog.in_flight = true;

            if let Some(previous) = &state.dialog {
                tracing::debug!(
                    session_id = %previous.session_id,
                    exam_id = previous.exam_id,
                    "Replacing open assignment dialog"
                );
            }
            tracing::info!(exam_id, session_id = %dialog.session_id, epoch, "Opening assignment dialog");

            let ticket = dialog.ticket();
            state.dialog = Some(dialog);
            ticket
        };

        let result = self.load(ticket).await;
        self.track(result).await
    }

    /// Re-fetch exam and candidates with default eligibility rules
    pub async fn reload(&self) -> Result<RequestOutcome<DialogView>, WorkflowError> {
        let result = match self.begin(|dialog, _| Ok(dialog.expect_normal("reload")?)).await {
            Ok((ticket, ())) => self.load(ticket).await,
            Err(e) => Err(e),
        };
        self.track(result).await
    }

    /// Close the dialog; in-flight responses for it are discarded
    pub async fn close(&self) -> bool {
        let mut state = self.state.lock().await;
        match state.dialog.take() {
            Some(dialog) => {
                tracing::info!(
                    exam_id = dialog.exam_id,
                    session_id = %dialog.session_id,
                    in_flight = dialog.in_flight,
                    "Assignment dialog closed"
                );
                true
            }
            None => false,
        }
    }

    pub async fn is_open(&self) -> bool {
        self.state.lock().await.dialog.is_some()
    }

    pub async fn view(&self) -> Option<DialogView> {
        self.state.lock().await.dialog.as_ref().map(DialogState::view)
    }

    // ----- Selection -----

    /// Toggle one candidate; returns the selection size against the required count
    ///
    /// Over-selection is allowed here and only rejected at submission.
    pub async fn toggle(&self, id: TaId) -> Result<SelectionCount, WorkflowError> {
        self.with_ready(|dialog, notices| {
            let known = dialog
                .candidates
                .as_ref()
                .ok_or(PreconditionError::ExamNotLoaded)?
                .contains(id);
            if !known {
                return Err(PreconditionError::UnknownCandidate(id).into());
            }
            let required = dialog.required()?;

            let selected = dialog.selection.toggle(id);
            dialog.clear_pending_retry(notices);

            let count = dialog.selection.count_against(required);
            tracing::debug!(exam_id = dialog.exam_id, ta_id = id, selected, ?count, "Selection toggled");
            Ok(count)
        })
        .await
    }

    pub async fn set_paid(&self, paid: bool) -> Result<(), WorkflowError> {
        self.with_ready(|dialog, notices| {
            dialog.selection.set_paid(paid);
            dialog.clear_pending_retry(notices);
            Ok(())
        })
        .await
    }

    pub async fn set_replace_existing(&self, replace: bool) -> Result<(), WorkflowError> {
        self.with_ready(|dialog, notices| {
            dialog.selection.set_replace_existing(replace);
            dialog.clear_pending_retry(notices);
            Ok(())
        })
        .await
    }

    /// Replace the selection with the ranked suggestion
    ///
    /// With fewer candidates than required the selection is left alone and
    /// the insufficient-candidates dialog opens instead.
    pub async fn request_suggestion(&self) -> Result<SuggestionOutcome, WorkflowError> {
        self.with_ready(|dialog, notices| {
            dialog.expect_normal("request suggestion")?;
            let required = dialog.required()?;
            if required == 0 {
                return Err(PreconditionError::NoProctorsRequired.into());
            }

            let list = dialog.candidates.as_ref().ok_or(PreconditionError::ExamNotLoaded)?;
            let available = list.len();
            if available < required as usize {
                dialog.insufficient.detect(available, required)?;
                dialog.clear_pending_retry(notices);
                tracing::warn!(
                    exam_id = dialog.exam_id,
                    available,
                    required,
                    "Not enough eligible candidates for a suggestion"
                );
                return Ok(SuggestionOutcome::Insufficient {
                    available,
                    required,
                    shortfall: dialog.insufficient.shortfall(),
                });
            }

            let suggestion = suggest(&list.candidates, required);
            dialog.selection.apply_suggestion(&suggestion.ids, required)?;
            dialog.clear_pending_retry(notices);

            tracing::info!(exam_id = dialog.exam_id, suggested = ?suggestion.ids, "Suggestion applied");
            Ok(SuggestionOutcome::Applied(suggestion))
        })
        .await
    }

    /// Leave review; selection resets to the already-assigned candidates
    pub async fn cancel_suggestion(&self) -> Result<Vec<TaId>, WorkflowError> {
        self.with_ready(|dialog, notices| {
            let list = dialog.candidates.as_ref().ok_or(PreconditionError::ExamNotLoaded)?;
            dialog.selection.cancel_suggestion(&list.candidates);
            dialog.clear_pending_retry(notices);
            Ok(dialog.selection.selected().to_vec())
        })
        .await
    }

    // ----- Insufficient-candidates dialog -----

    /// Flip one override flag and re-fetch candidates with the new flags
    ///
    /// On failure the previous flags, candidates and selection are kept and
    /// the error is shown in the insufficient-candidates dialog.
    pub async fn toggle_override(
        &self,
        rule: OverrideRule,
    ) -> Result<RequestOutcome<RequeryResult>, WorkflowError> {
        let result = self.toggle_override_inner(rule).await;
        self.track(result).await
    }

    async fn toggle_override_inner(
        &self,
        rule: OverrideRule,
    ) -> Result<RequestOutcome<RequeryResult>, WorkflowError> {
        let (ticket, flags) = self
            .begin(|dialog, _| Ok(dialog.insufficient.begin_requery(rule)?))
            .await?;
        tracing::info!(exam_id = ticket.exam_id, rule = %rule, ?flags, "Re-fetching candidates with overrides");

        let fetched = self.fetcher.fetch_candidates(ticket.exam_id, flags).await;

        let mut state = self.state.lock().await;
        let WorkflowState { dialog: slot, notices } = &mut *state;
        let Some(dialog) = live(slot, ticket) else {
            tracing::debug!(exam_id = ticket.exam_id, epoch = ticket.epoch, "Discarding requery for closed dialog");
            return Ok(RequestOutcome::Abandoned);
        };
        dialog.in_flight = false;

        match fetched {
            Ok(list) => {
                let required = dialog.required()?;
                dialog.insufficient.complete_requery(flags, list.len(), required)?;
                let pruned = dialog.selection.retain_candidates(&list.candidates);
                let available = list.len();
                dialog.candidates = Some(list);
                dialog.clear_pending_retry(notices);

                Ok(RequestOutcome::Applied(RequeryResult {
                    available,
                    shortfall: dialog.insufficient.shortfall(),
                    pruned,
                }))
            }
            Err(err) => {
                dialog.insufficient.record_failure(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Submit every current candidate as a manual assignment replacing existing ones
    ///
    /// Closes the dialog on success.
    pub async fn assign_found_candidates(
        &self,
    ) -> Result<RequestOutcome<AssignmentRequest>, WorkflowError> {
        let result = self.assign_found_inner().await;
        self.track(result).await
    }

    async fn assign_found_inner(&self) -> Result<RequestOutcome<AssignmentRequest>, WorkflowError> {
        let (ticket, request) = self
            .begin(|dialog, _| {
                dialog.insufficient.ensure_can_resolve("assign found candidates")?;
                let list = dialog.candidates.as_ref().ok_or(PreconditionError::ExamNotLoaded)?;
                if list.is_empty() {
                    return Err(PreconditionError::NoCandidates.into());
                }
                Ok(AssignmentRequest::new(
                    AssignmentMode::Manual,
                    list.ids(),
                    true,
                    dialog.selection.is_paid(),
                ))
            })
            .await?;

        let result = self.dispatcher.dispatch(ticket.exam_id, &request).await;
        self.finish_resolution(ticket, Resolution::AssignedFound, result)
            .await
            .map(|outcome| match outcome {
                RequestOutcome::Applied(()) => RequestOutcome::Applied(request),
                RequestOutcome::Abandoned => RequestOutcome::Abandoned,
            })
    }

    /// Escalate the exam to cross-department approval instead of assigning
    ///
    /// Closes the dialog on success.
    pub async fn request_cross_department(&self) -> Result<RequestOutcome<()>, WorkflowError> {
        let result = self.request_cross_department_inner().await;
        self.track(result).await
    }

    async fn request_cross_department_inner(&self) -> Result<RequestOutcome<()>, WorkflowError> {
        let (ticket, ()) = self
            .begin(|dialog, _| {
                dialog
                    .insufficient
                    .ensure_can_resolve("request cross-department proctors")?;
                let exam = dialog.exam.as_ref().ok_or(PreconditionError::ExamNotLoaded)?;
                if exam.status.is_cross_department() || exam.status.is_terminal() {
                    return Err(PreconditionError::CannotEscalate(exam.status).into());
                }
                Ok(())
            })
            .await?;

        let result = self.dispatcher.request_cross_department(ticket.exam_id).await;
        self.finish_resolution(ticket, Resolution::CrossDepartmentRequested, result)
            .await
    }

    /// Close the insufficient-candidates dialog without side effects
    pub async fn dismiss_insufficient(&self) -> Result<(), WorkflowError> {
        self.with_ready(|dialog, _| {
            dialog.insufficient.dismiss()?;
            Ok(())
        })
        .await
    }

    async fn finish_resolution(
        &self,
        ticket: Ticket,
        resolution: Resolution,
        result: Result<(), AssignmentError>,
    ) -> Result<RequestOutcome<()>, WorkflowError> {
        let mut state = self.state.lock().await;
        let WorkflowState { dialog: slot, notices } = &mut *state;
        let Some(dialog) = live(slot, ticket) else {
            tracing::debug!(exam_id = ticket.exam_id, ?resolution, "Discarding resolution for closed dialog");
            return Ok(RequestOutcome::Abandoned);
        };
        dialog.in_flight = false;

        match result {
            Ok(()) => {
                dialog.insufficient.resolve(resolution)?;
                let message = match resolution {
                    Resolution::AssignedFound => format!(
                        "Assigned {} found candidate(s) to exam {}",
                        dialog.candidates.as_ref().map(CandidateList::len).unwrap_or(0),
                        ticket.exam_id
                    ),
                    Resolution::CrossDepartmentRequested => {
                        format!("Requested cross-department proctors for exam {}", ticket.exam_id)
                    }
                };
                tracing::info!(session_id = %dialog.session_id, exam_id = ticket.exam_id, ?resolution, "Insufficient-candidates dialog resolved");
                notices.push(Severity::Info, message);
                *slot = None;
                Ok(RequestOutcome::Applied(()))
            }
            Err(err) => {
                dialog.insufficient.record_failure(err.to_string());
                Err(err.into())
            }
        }
    }

    // ----- Submission -----

    /// Submit the current selection
    ///
    /// Manual unless the selection came from a suggestion. Selecting more
    /// than required is rejected; fewer needs `confirm_short`. Closes the
    /// dialog on success. The "already assigned" conflict arms
    /// [`Self::retry_with_replace`].
    pub async fn submit(
        &self,
        confirm_short: bool,
    ) -> Result<RequestOutcome<AssignmentRequest>, WorkflowError> {
        let begun = self
            .begin(|dialog, _| {
                dialog.expect_normal("submit")?;
                let required = dialog.required()?;
                let selection = dialog.selection.finalize();
                selection.validate(required, confirm_short)?;
                Ok(selection.into_request())
            })
            .await;
        let (ticket, request) = self.track(begun).await?;

        let result = self.dispatcher.dispatch(ticket.exam_id, &request).await;
        self.finish_submission(ticket, request, result).await
    }

    /// Resubmit the conflicting request with `replace_existing = true`
    ///
    /// Only available after an "already assigned" rejection and until the
    /// selection or candidate list changes; calling it is the user's explicit
    /// consent to replace existing proctors.
    pub async fn retry_with_replace(&self) -> Result<RequestOutcome<AssignmentRequest>, WorkflowError> {
        let begun = self
            .begin(|dialog, notices| {
                dialog.expect_normal("retry with replace")?;
                let pending = dialog
                    .pending_retry
                    .take()
                    .ok_or(PreconditionError::NoPendingRetry)?;
                notices.dismiss_action(NotificationAction::RetryWithReplace);
                dialog.selection.set_replace_existing(true);
                Ok(pending.with_replace_existing())
            })
            .await;
        let (ticket, request) = self.track(begun).await?;

        tracing::info!(exam_id = ticket.exam_id, "Retrying assignment with replace_existing");
        let result = self.dispatcher.dispatch(ticket.exam_id, &request).await;
        self.finish_submission(ticket, request, result).await
    }

    /// Apply a submission response; records its own error notification
    async fn finish_submission(
        &self,
        ticket: Ticket,
        request: AssignmentRequest,
        result: Result<(), AssignmentError>,
    ) -> Result<RequestOutcome<AssignmentRequest>, WorkflowError> {
        let mut state = self.state.lock().await;
        let WorkflowState { dialog: slot, notices } = &mut *state;
        let Some(dialog) = live(slot, ticket) else {
            tracing::debug!(exam_id = ticket.exam_id, epoch = ticket.epoch, "Discarding submission result for closed dialog");
            return Ok(RequestOutcome::Abandoned);
        };
        dialog.in_flight = false;

        match result {
            Ok(()) => {
                tracing::info!(
                    session_id = %dialog.session_id,
                    exam_id = ticket.exam_id,
                    mode = ?request.mode(),
                    "Assignment submitted; closing dialog"
                );
                notices.push(
                    Severity::Info,
                    format!(
                        "Assigned {} proctor(s) to exam {}",
                        request.proctors().len(),
                        ticket.exam_id
                    ),
                );
                *slot = None;
                Ok(RequestOutcome::Applied(request))
            }
            Err(err) => {
                let retryable =
                    matches!(err, AssignmentError::AlreadyAssigned(_)) && !request.replace_existing();
                let err = WorkflowError::from(err);
                if retryable {
                    dialog.pending_retry = Some(request);
                    notices.push_error_with_action(&err, NotificationAction::RetryWithReplace);
                } else {
                    notices.push_error(&err);
                }
                Err(err)
            }
        }
    }

    // ----- Notifications -----

    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.lock().await.notices.list().to_vec()
    }

    pub async fn dismiss_notification(&self, id: u64) -> bool {
        self.state.lock().await.notices.dismiss(id)
    }

    // ----- Internals -----

    async fn load(&self, ticket: Ticket) -> Result<RequestOutcome<DialogView>, WorkflowError> {
        let fetched = tokio::try_join!(
            self.fetcher.fetch_exam(ticket.exam_id),
            self.fetcher
                .fetch_candidates(ticket.exam_id, OverrideFlags::default()),
        );

        let mut state = self.state.lock().await;
        let WorkflowState { dialog: slot, notices } = &mut *state;
        let Some(dialog) = live(slot, ticket) else {
            tracing::debug!(exam_id = ticket.exam_id, epoch = ticket.epoch, "Discarding fetch for closed dialog");
            return Ok(RequestOutcome::Abandoned);
        };
        dialog.in_flight = false;
        let (exam, list) = fetched?;

        if dialog.candidates.is_some() {
            let pruned = dialog.selection.retain_candidates(&list.candidates);
            tracing::debug!(exam_id = ticket.exam_id, pruned, "Selection pruned after reload");
            dialog.clear_pending_retry(notices);
        } else {
            dialog.selection = SelectionState::seeded(&list.candidates);
        }
        dialog.exam = Some(exam);
        dialog.candidates = Some(list);

        Ok(RequestOutcome::Applied(dialog.view()))
    }

    /// Run a synchronous operation on the ready dialog, recording any error
    async fn with_ready<T>(
        &self,
        op: impl FnOnce(&mut DialogState, &mut NotificationCenter) -> Result<T, WorkflowError>,
    ) -> Result<T, WorkflowError> {
        let mut state = self.state.lock().await;
        let WorkflowState { dialog, notices } = &mut *state;
        let result = match ready(dialog) {
            Ok(dialog) => op(dialog, notices),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = &result {
            notices.push_error(e);
        }
        result
    }

    /// Check preconditions and mark the dialog busy for one backend call
    async fn begin<T>(
        &self,
        op: impl FnOnce(&mut DialogState, &mut NotificationCenter) -> Result<T, WorkflowError>,
    ) -> Result<(Ticket, T), WorkflowError> {
        let mut state = self.state.lock().await;
        let WorkflowState { dialog, notices } = &mut *state;
        let dialog = ready(dialog)?;
        let value = op(dialog, notices)?;
        dialog.in_flight = true;
        Ok((dialog.ticket(), value))
    }

    async fn track<T>(&self, result: Result<T, WorkflowError>) -> Result<T, WorkflowError> {
        if let Err(e) = &result {
            self.state.lock().await.notices.push_error(e);
        }
        result
    }
}
