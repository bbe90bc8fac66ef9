use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::model::ids::{EventId, ItemId, SessionId};
use crate::model::item::{Item, ItemKind};
use crate::model::response::{Answer, Response, ResponseOutcome};
use crate::model::summary::{ItemReport, ReportEntry, ResultsSummary, SessionSummary};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Contract violations raised by the session state machine.
///
/// None of these are fatal: callers surface them as a message or ignore them
/// (e.g. a second submit click is a no-op at the view boundary).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no items available for session")]
    Empty,

    #[error("session already completed")]
    Completed,

    #[error("current item was already submitted")]
    AlreadySubmitted,

    #[error("no answer selected for the current item")]
    NothingSelected,

    #[error("current item has not been submitted yet")]
    NotSubmitted,

    #[error("choice index {index} is out of range for {available} choices")]
    ChoiceOutOfRange { index: usize, available: usize },

    #[error("answer kind does not match the current item")]
    AnswerKindMismatch,
}

//
// ─── SESSION STATES ────────────────────────────────────────────────────────────
//

/// What kind of run this session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// A shuffled draw of up to `practice_size` items.
    Practice,
    /// The full bank in stable order.
    Test,
    /// Open-ended prompts, recorded but not graded.
    Roleplay,
}

impl SessionMode {
    /// Stable string form used for persistence.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Practice => "practice",
            SessionMode::Test => "test",
            SessionMode::Roleplay => "roleplay",
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    InProgress,
    Complete,
}

/// Answer lifecycle for the current item.
///
/// A selection highlights a candidate answer; submitting grades it and locks
/// it in. The explicit tag replaces the pair of booleans a UI would otherwise
/// juggle and makes double-submit unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerPhase {
    Unanswered,
    Selected(Answer),
    Submitted,
}

/// Aggregated view of session progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One run through an ordered, fixed sequence of items.
///
/// The session steps through its items one at a time, collecting exactly one
/// response per item in order: select an answer, submit it for grading, then
/// advance. All operations are synchronous, in-memory state transitions;
/// timestamps come from the caller so the machine stays deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    event_id: EventId,
    mode: SessionMode,
    items: Vec<Item>,
    current: usize,
    phase: AnswerPhase,
    responses: Vec<Response>,
    status: SessionStatus,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Starts a session over the given items.
    ///
    /// `started_at` should come from the services-layer clock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no items are provided; the caller
    /// renders a "nothing available" state instead of creating a session.
    pub fn start(
        id: SessionId,
        event_id: EventId,
        mode: SessionMode,
        items: Vec<Item>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if items.is_empty() {
            return Err(SessionError::Empty);
        }

        Ok(Self {
            id,
            event_id,
            mode,
            items,
            current: 0,
            phase: AnswerPhase::Unanswered,
            responses: Vec::new(),
            status: SessionStatus::InProgress,
            started_at,
            completed_at: None,
        })
    }

    /// Records a pending selection for the current item without grading it.
    ///
    /// Re-selecting before submit replaces the previous selection; this is how
    /// the user changes their mind while the answer is merely highlighted.
    ///
    /// # Errors
    ///
    /// Returns `Completed` after the session is over, `AlreadySubmitted` once
    /// feedback for the current item is showing, `ChoiceOutOfRange` for a
    /// choice index past the item's choices (a user error the caller ignores),
    /// and `AnswerKindMismatch` for a text answer to a quiz item or vice versa.
    pub fn select_answer(&mut self, answer: Answer) -> Result<(), SessionError> {
        if self.status == SessionStatus::Complete {
            return Err(SessionError::Completed);
        }
        if matches!(self.phase, AnswerPhase::Submitted) {
            return Err(SessionError::AlreadySubmitted);
        }

        match (&self.items[self.current].kind(), &answer) {
            (ItemKind::MultipleChoice { choices, .. }, Answer::Choice(index)) => {
                if *index >= choices.len() {
                    return Err(SessionError::ChoiceOutOfRange {
                        index: *index,
                        available: choices.len(),
                    });
                }
            }
            (ItemKind::OpenEnded { .. }, Answer::Text(_)) => {}
            _ => return Err(SessionError::AnswerKindMismatch),
        }

        self.phase = AnswerPhase::Selected(answer);
        Ok(())
    }

    /// Grades the pending selection and appends the response.
    ///
    /// Quiz answers are compared with the item's correct choice; open-ended
    /// answers are recorded as ungraded. The phase moves to `Submitted`, which
    /// is the cue for the caller to show feedback.
    ///
    /// # Errors
    ///
    /// Returns `Completed` after the session is over, `NothingSelected` when
    /// no pending selection exists, and `AlreadySubmitted` on a second submit
    /// for the same item — the response list is left untouched in that case.
    pub fn submit_answer(&mut self) -> Result<&Response, SessionError> {
        if self.status == SessionStatus::Complete {
            return Err(SessionError::Completed);
        }

        let answer = match std::mem::replace(&mut self.phase, AnswerPhase::Submitted) {
            AnswerPhase::Selected(answer) => answer,
            AnswerPhase::Unanswered => {
                self.phase = AnswerPhase::Unanswered;
                return Err(SessionError::NothingSelected);
            }
            AnswerPhase::Submitted => return Err(SessionError::AlreadySubmitted),
        };

        let item = &self.items[self.current];
        let outcome = match (item.kind(), &answer) {
            (ItemKind::MultipleChoice { correct, .. }, Answer::Choice(index)) => {
                if index == correct {
                    ResponseOutcome::Correct
                } else {
                    ResponseOutcome::Incorrect
                }
            }
            _ => ResponseOutcome::Ungraded,
        };

        self.responses.push(Response::new(item.id(), answer, outcome));
        self.responses.last().ok_or(SessionError::NothingSelected)
    }

    /// Moves to the next item, or completes the session on the last one.
    ///
    /// This is the only transition to `Complete` besides an early `finish`.
    ///
    /// # Errors
    ///
    /// Returns `Completed` after the session is over and `NotSubmitted` when
    /// feedback for the current item has not been shown yet.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<SessionStatus, SessionError> {
        if self.status == SessionStatus::Complete {
            return Err(SessionError::Completed);
        }
        if !matches!(self.phase, AnswerPhase::Submitted) {
            return Err(SessionError::NotSubmitted);
        }

        if self.current + 1 < self.items.len() {
            self.current += 1;
            self.phase = AnswerPhase::Unanswered;
        } else {
            self.status = SessionStatus::Complete;
            self.completed_at = Some(now);
        }

        Ok(self.status)
    }

    /// Ends the session and produces the results summary.
    ///
    /// Allowed at any time: an in-progress session is force-completed, any
    /// unsubmitted selection is discarded, and remaining items are listed as
    /// unanswered in the breakdown while staying out of the counts.
    ///
    /// Idempotent: a second call returns an identical summary, using the
    /// completion timestamp recorded by the first.
    pub fn finish(&mut self, now: DateTime<Utc>) -> ResultsSummary {
        if self.status != SessionStatus::Complete {
            self.status = SessionStatus::Complete;
            self.completed_at = Some(now);
            self.phase = AnswerPhase::Unanswered;
        }

        let completed_at = self.completed_at.unwrap_or(now);
        let summary = SessionSummary::from_responses(
            self.id,
            self.event_id,
            self.mode,
            self.started_at,
            completed_at,
            self.items.len(),
            &self.responses,
        );

        let breakdown = self
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| self.report_for(index, item))
            .collect();

        ResultsSummary::new(summary, breakdown)
    }

    fn report_for(&self, index: usize, item: &Item) -> ItemReport {
        // Responses are appended in item order, so index i answers item i.
        let entry = match self.responses.get(index) {
            Some(response) => ReportEntry::Answered {
                answer: response.answer().clone(),
                outcome: response.outcome(),
                correct_choice: item.correct_choice(),
                explanation: item.explanation().map(ToOwned::to_owned),
            },
            None => ReportEntry::Unanswered,
        };

        ItemReport {
            item_id: item.id(),
            prompt: item.prompt().to_owned(),
            entry,
        }
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Complete
    }

    /// The item awaiting an answer, or `None` once the session is complete.
    #[must_use]
    pub fn current_item(&self) -> Option<&Item> {
        if self.status == SessionStatus::Complete {
            None
        } else {
            self.items.get(self.current)
        }
    }

    /// Answer lifecycle state for the current item.
    #[must_use]
    pub fn phase(&self) -> &AnswerPhase {
        &self.phase
    }

    #[must_use]
    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.items.len(),
            answered: self.responses.len(),
            remaining: self.items.len().saturating_sub(self.responses.len()),
            is_complete: self.is_complete(),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::ItemId;
    use crate::time::fixed_now;

    fn quiz_item(id: u64, correct: usize) -> Item {
        Item::multiple_choice(
            ItemId::new(id),
            format!("Q{id}"),
            vec!["A".into(), "B".into(), "C".into()],
            correct,
            Some(format!("Because {correct}")),
        )
        .unwrap()
    }

    fn roleplay_item(id: u64) -> Item {
        Item::open_ended(
            ItemId::new(id),
            format!("Scenario {id}"),
            vec!["Covers pricing".into()],
        )
        .unwrap()
    }

    fn start_quiz(items: Vec<Item>) -> Session {
        Session::start(
            SessionId::random(),
            EventId::new(1),
            SessionMode::Practice,
            items,
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn start_rejects_empty_items() {
        let err = Session::start(
            SessionId::random(),
            EventId::new(1),
            SessionMode::Practice,
            Vec::new(),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, SessionError::Empty);
    }

    #[test]
    fn start_initializes_in_progress() {
        let session = start_quiz(vec![quiz_item(1, 0)]);
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(session.phase(), &AnswerPhase::Unanswered);
        assert!(session.responses().is_empty());
        assert_eq!(session.current_item().unwrap().id(), ItemId::new(1));
    }

    #[test]
    fn select_validates_choice_range() {
        let mut session = start_quiz(vec![quiz_item(1, 0)]);
        let err = session.select_answer(Answer::Choice(3)).unwrap_err();
        assert_eq!(
            err,
            SessionError::ChoiceOutOfRange {
                index: 3,
                available: 3
            }
        );
        // An out-of-range selection leaves the phase untouched.
        assert_eq!(session.phase(), &AnswerPhase::Unanswered);
    }

    #[test]
    fn select_rejects_kind_mismatch() {
        let mut session = start_quiz(vec![quiz_item(1, 0)]);
        let err = session
            .select_answer(Answer::Text("hello".into()))
            .unwrap_err();
        assert_eq!(err, SessionError::AnswerKindMismatch);

        let mut roleplay = Session::start(
            SessionId::random(),
            EventId::new(1),
            SessionMode::Roleplay,
            vec![roleplay_item(1)],
            fixed_now(),
        )
        .unwrap();
        let err = roleplay.select_answer(Answer::Choice(0)).unwrap_err();
        assert_eq!(err, SessionError::AnswerKindMismatch);
    }

    #[test]
    fn reselect_replaces_pending_selection() {
        let mut session = start_quiz(vec![quiz_item(1, 1)]);
        session.select_answer(Answer::Choice(0)).unwrap();
        session.select_answer(Answer::Choice(1)).unwrap();

        let response = session.submit_answer().unwrap();
        assert_eq!(response.answer(), &Answer::Choice(1));
        assert!(response.outcome().is_correct());
    }

    #[test]
    fn submit_requires_selection() {
        let mut session = start_quiz(vec![quiz_item(1, 0)]);
        let err = session.submit_answer().unwrap_err();
        assert_eq!(err, SessionError::NothingSelected);
        assert_eq!(session.phase(), &AnswerPhase::Unanswered);
    }

    #[test]
    fn submit_grades_against_correct_choice() {
        let mut session = start_quiz(vec![quiz_item(1, 2)]);
        session.select_answer(Answer::Choice(0)).unwrap();
        let response = session.submit_answer().unwrap();
        assert_eq!(response.outcome(), ResponseOutcome::Incorrect);
        assert_eq!(session.responses().len(), 1);
    }

    #[test]
    fn double_submit_leaves_responses_unchanged() {
        let mut session = start_quiz(vec![quiz_item(1, 0)]);
        session.select_answer(Answer::Choice(0)).unwrap();
        session.submit_answer().unwrap();

        let err = session.submit_answer().unwrap_err();
        assert_eq!(err, SessionError::AlreadySubmitted);
        assert_eq!(session.responses().len(), 1);
    }

    #[test]
    fn select_after_submit_is_rejected() {
        let mut session = start_quiz(vec![quiz_item(1, 0), quiz_item(2, 0)]);
        session.select_answer(Answer::Choice(0)).unwrap();
        session.submit_answer().unwrap();

        let err = session.select_answer(Answer::Choice(1)).unwrap_err();
        assert_eq!(err, SessionError::AlreadySubmitted);
    }

    #[test]
    fn advance_requires_submitted_phase() {
        let mut session = start_quiz(vec![quiz_item(1, 0)]);
        let err = session.advance(fixed_now()).unwrap_err();
        assert_eq!(err, SessionError::NotSubmitted);

        session.select_answer(Answer::Choice(0)).unwrap();
        let err = session.advance(fixed_now()).unwrap_err();
        assert_eq!(err, SessionError::NotSubmitted);
    }

    #[test]
    fn advance_steps_through_and_completes() {
        let mut session = start_quiz(vec![quiz_item(1, 0), quiz_item(2, 1)]);

        session.select_answer(Answer::Choice(0)).unwrap();
        session.submit_answer().unwrap();
        assert_eq!(session.advance(fixed_now()).unwrap(), SessionStatus::InProgress);
        assert_eq!(session.current_item().unwrap().id(), ItemId::new(2));
        assert_eq!(session.phase(), &AnswerPhase::Unanswered);

        session.select_answer(Answer::Choice(1)).unwrap();
        session.submit_answer().unwrap();
        let done_at = fixed_now() + chrono::Duration::minutes(3);
        assert_eq!(session.advance(done_at).unwrap(), SessionStatus::Complete);
        assert!(session.is_complete());
        assert_eq!(session.completed_at(), Some(done_at));
        assert_eq!(session.current_item(), None);
    }

    #[test]
    fn operations_rejected_after_completion() {
        let mut session = start_quiz(vec![quiz_item(1, 0)]);
        session.select_answer(Answer::Choice(0)).unwrap();
        session.submit_answer().unwrap();
        session.advance(fixed_now()).unwrap();

        assert_eq!(
            session.select_answer(Answer::Choice(0)).unwrap_err(),
            SessionError::Completed
        );
        assert_eq!(session.submit_answer().unwrap_err(), SessionError::Completed);
        assert_eq!(session.advance(fixed_now()).unwrap_err(), SessionError::Completed);
    }

    #[test]
    fn progress_tracks_answered_counts() {
        let mut session = start_quiz(vec![quiz_item(1, 0), quiz_item(2, 0), quiz_item(3, 0)]);
        session.select_answer(Answer::Choice(0)).unwrap();
        session.submit_answer().unwrap();
        session.advance(fixed_now()).unwrap();

        let progress = session.progress();
        assert_eq!(progress.total, 3);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.remaining, 2);
        assert!(!progress.is_complete);
    }

    #[test]
    fn roleplay_answers_are_ungraded() {
        let mut session = Session::start(
            SessionId::random(),
            EventId::new(1),
            SessionMode::Roleplay,
            vec![roleplay_item(1)],
            fixed_now(),
        )
        .unwrap();

        session
            .select_answer(Answer::Text("I would open by greeting the customer.".into()))
            .unwrap();
        let response = session.submit_answer().unwrap();
        assert_eq!(response.outcome(), ResponseOutcome::Ungraded);
    }

    #[test]
    fn early_finish_reports_unanswered_items() {
        // Q1 answered correctly, Q2 answered incorrectly, Q3 left unanswered.
        let mut session = start_quiz(vec![quiz_item(1, 0), quiz_item(2, 1), quiz_item(3, 2)]);

        session.select_answer(Answer::Choice(0)).unwrap();
        session.submit_answer().unwrap();
        session.advance(fixed_now()).unwrap();

        session.select_answer(Answer::Choice(0)).unwrap();
        session.submit_answer().unwrap();
        session.advance(fixed_now()).unwrap();

        let results = session.finish(fixed_now());
        let summary = results.summary();
        assert_eq!(summary.total_items(), 3);
        assert_eq!(summary.answered(), 2);
        assert_eq!(summary.correct(), 1);
        assert_eq!(summary.percentage(), 50);

        assert_eq!(results.breakdown().len(), 3);
        assert_eq!(results.breakdown()[2].item_id, ItemId::new(3));
        assert!(matches!(
            results.breakdown()[2].entry,
            ReportEntry::Unanswered
        ));
    }

    #[test]
    fn finish_discards_pending_selection() {
        let mut session = start_quiz(vec![quiz_item(1, 0)]);
        session.select_answer(Answer::Choice(0)).unwrap();

        let results = session.finish(fixed_now());
        assert_eq!(results.summary().answered(), 0);
        assert_eq!(results.summary().percentage(), 0);
        assert!(session.is_complete());
    }

    #[test]
    fn finish_is_idempotent() {
        let mut session = start_quiz(vec![quiz_item(1, 0), quiz_item(2, 0)]);
        session.select_answer(Answer::Choice(0)).unwrap();
        session.submit_answer().unwrap();

        let first = session.finish(fixed_now());
        let later = fixed_now() + chrono::Duration::hours(1);
        let second = session.finish(later);

        assert_eq!(first, second);
        assert_eq!(second.summary().completed_at(), fixed_now());
    }

    #[test]
    fn finish_after_natural_completion_keeps_completion_time() {
        let mut session = start_quiz(vec![quiz_item(1, 0)]);
        session.select_answer(Answer::Choice(0)).unwrap();
        session.submit_answer().unwrap();
        let done_at = fixed_now() + chrono::Duration::minutes(2);
        session.advance(done_at).unwrap();

        let results = session.finish(fixed_now() + chrono::Duration::hours(2));
        assert_eq!(results.summary().completed_at(), done_at);
        assert_eq!(results.summary().percentage(), 100);
    }

    #[test]
    fn mode_strings_are_stable() {
        assert_eq!(SessionMode::Practice.as_str(), "practice");
        assert_eq!(SessionMode::Test.as_str(), "test");
        assert_eq!(SessionMode::Roleplay.as_str(), "roleplay");
    }
}
