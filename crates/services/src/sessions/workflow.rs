use std::sync::Arc;

use prep_core::Clock;
use prep_core::model::{AccountId, EventId, Session, SessionId, SessionMode, SessionSummary};
use storage::repository::{
    AccountRepository, EventRepository, QuestionRepository, RoleplayRepository, SummaryRepository,
};

use super::queries::SessionQueries;
use crate::error::StudyError;
use crate::handoff::ResultsMailbox;

/// Result of persisting a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishOutcome {
    pub session_id: SessionId,
    pub summary_id: i64,
    pub points_awarded: u32,
    /// False when the results mailbox was unavailable; the caller falls back
    /// to the persisted summary.
    pub results_delivered: bool,
}

/// Orchestrates session starts and the finish pipeline.
#[derive(Clone)]
pub struct StudyFlowService {
    clock: Clock,
    events: Arc<dyn EventRepository>,
    questions: Arc<dyn QuestionRepository>,
    roleplays: Arc<dyn RoleplayRepository>,
    summaries: Arc<dyn SummaryRepository>,
    accounts: Arc<dyn AccountRepository>,
    mailbox: ResultsMailbox,
}

impl StudyFlowService {
    #[must_use]
    pub fn new(
        clock: Clock,
        events: Arc<dyn EventRepository>,
        questions: Arc<dyn QuestionRepository>,
        roleplays: Arc<dyn RoleplayRepository>,
        summaries: Arc<dyn SummaryRepository>,
        accounts: Arc<dyn AccountRepository>,
        mailbox: ResultsMailbox,
    ) -> Self {
        Self {
            clock,
            events,
            questions,
            roleplays,
            summaries,
            accounts,
            mailbox,
        }
    }

    /// The mailbox finished results are delivered to.
    #[must_use]
    pub fn mailbox(&self) -> ResultsMailbox {
        self.mailbox.clone()
    }

    /// Start a practice session for the given event.
    ///
    /// # Errors
    ///
    /// Returns `StudyError` for storage or session start failures.
    pub async fn start_practice(&self, event_id: EventId) -> Result<Session, StudyError> {
        let now = self.clock.now();
        let (_event, session) =
            SessionQueries::start_practice(event_id, self.events.as_ref(), self.questions.as_ref(), now)
                .await?;
        tracing::debug!(%event_id, session_id = %session.id(), "practice session started");
        Ok(session)
    }

    /// Start a test session over the event's full bank.
    ///
    /// # Errors
    ///
    /// Returns `StudyError` for storage or session start failures.
    pub async fn start_test(&self, event_id: EventId) -> Result<Session, StudyError> {
        let now = self.clock.now();
        let (_event, session) =
            SessionQueries::start_test(event_id, self.events.as_ref(), self.questions.as_ref(), now)
                .await?;
        tracing::debug!(%event_id, session_id = %session.id(), "test session started");
        Ok(session)
    }

    /// Start a roleplay session over the event's prompt bank.
    ///
    /// # Errors
    ///
    /// Returns `StudyError` for storage or session start failures.
    pub async fn start_roleplay(&self, event_id: EventId) -> Result<Session, StudyError> {
        let now = self.clock.now();
        let (_event, session) =
            SessionQueries::start_roleplay(event_id, self.events.as_ref(), self.roleplays.as_ref(), now)
                .await?;
        tracing::debug!(%event_id, session_id = %session.id(), "roleplay session started");
        Ok(session)
    }

    /// Finish a session: persist the aggregate summary, award leaderboard
    /// points, and hand the full results to the mailbox.
    ///
    /// Taking the session by value means a session can only be finished, and
    /// therefore persisted, once.
    ///
    /// A mailbox failure does not fail the finish; the caller sees
    /// `results_delivered == false` and renders from the persisted summary.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Storage` when the summary append or the points
    /// award fails.
    pub async fn finish(
        &self,
        mut session: Session,
        account: Option<AccountId>,
    ) -> Result<FinishOutcome, StudyError> {
        let now = self.clock.now();
        let results = session.finish(now);
        let summary = results.summary().clone();
        let session_id = summary.session_id();

        let summary_id = self.summaries.append_summary(&summary).await?;
        let points_awarded = self.award_for(&summary, account).await?;

        let results_delivered = match self.mailbox.put(results) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%session_id, error = %err, "results mailbox unavailable");
                false
            }
        };

        tracing::info!(
            %session_id,
            summary_id,
            points_awarded,
            percentage = summary.percentage(),
            "session finished"
        );

        Ok(FinishOutcome {
            session_id,
            summary_id,
            points_awarded,
            results_delivered,
        })
    }

    /// Award `correct x points_per_correct` for graded modes.
    ///
    /// Roleplay runs are ungraded and award nothing, as does a finish with no
    /// signed-in account.
    async fn award_for(
        &self,
        summary: &SessionSummary,
        account: Option<AccountId>,
    ) -> Result<u32, StudyError> {
        let Some(account_id) = account else {
            return Ok(0);
        };
        if summary.mode() == SessionMode::Roleplay {
            return Ok(0);
        }

        let Some(event) = self.events.get_event(summary.event_id()).await? else {
            // The event vanished mid-session; the summary is already saved,
            // so skip the award rather than fail the finish.
            tracing::warn!(event_id = %summary.event_id(), "event missing at award time");
            return Ok(0);
        };

        let points = summary
            .correct()
            .saturating_mul(event.settings().points_per_correct());
        if points == 0 {
            return Ok(0);
        }

        self.accounts.add_points(account_id, points).await?;
        Ok(points)
    }
}
