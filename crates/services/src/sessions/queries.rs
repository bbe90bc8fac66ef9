use chrono::{DateTime, Utc};

use prep_core::model::{Event, EventId, Session, SessionId, SessionMode, SessionSummary};
use storage::repository::{
    EventRepository, QuestionRepository, RoleplayRepository, SummaryRepository, SummaryRow,
};

use super::plan::SessionBuilder;
use crate::error::StudyError;

/// Storage-backed session starts and summary lookups.
pub(crate) struct SessionQueries;

impl SessionQueries {
    /// Start a practice session over an event's question bank.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Storage` when the event is missing or repository
    /// access fails, and `StudyError::Session` for an empty bank.
    pub async fn start_practice(
        event_id: EventId,
        events: &dyn EventRepository,
        questions: &dyn QuestionRepository,
        now: DateTime<Utc>,
    ) -> Result<(Event, Session), StudyError> {
        let event = events
            .get_event(event_id)
            .await?
            .ok_or(storage::repository::StorageError::NotFound)?;
        let bank = questions.list_questions(event_id, u32::MAX).await?;

        let plan = SessionBuilder::new(&event).build_practice(bank);
        let session = Session::start(
            SessionId::random(),
            event_id,
            SessionMode::Practice,
            plan.items,
            now,
        )?;
        Ok((event, session))
    }

    /// Start a test session over an event's full question bank.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Storage` when the event is missing or repository
    /// access fails, and `StudyError::Session` for an empty bank.
    pub async fn start_test(
        event_id: EventId,
        events: &dyn EventRepository,
        questions: &dyn QuestionRepository,
        now: DateTime<Utc>,
    ) -> Result<(Event, Session), StudyError> {
        let event = events
            .get_event(event_id)
            .await?
            .ok_or(storage::repository::StorageError::NotFound)?;
        let bank = questions.list_questions(event_id, u32::MAX).await?;

        let plan = SessionBuilder::new(&event).build_test(bank);
        let session = Session::start(
            SessionId::random(),
            event_id,
            SessionMode::Test,
            plan.items,
            now,
        )?;
        Ok((event, session))
    }

    /// Start a roleplay session over an event's prompt bank.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Storage` when the event is missing or repository
    /// access fails, and `StudyError::Session` for an empty prompt bank.
    pub async fn start_roleplay(
        event_id: EventId,
        events: &dyn EventRepository,
        roleplays: &dyn RoleplayRepository,
        now: DateTime<Utc>,
    ) -> Result<(Event, Session), StudyError> {
        let event = events
            .get_event(event_id)
            .await?
            .ok_or(storage::repository::StorageError::NotFound)?;
        let prompts = roleplays.list_prompts(event_id, u32::MAX).await?;

        let plan = SessionBuilder::new(&event).build_roleplay(&prompts)?;
        let session = Session::start(
            SessionId::random(),
            event_id,
            SessionMode::Roleplay,
            plan.items,
            now,
        )?;
        Ok((event, session))
    }

    /// List persisted summaries for an event within an optional time range.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Storage` on repository failures.
    pub async fn list_summaries(
        event_id: EventId,
        summaries: &dyn SummaryRepository,
        completed_from: Option<DateTime<Utc>>,
        completed_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<SummaryRow>, StudyError> {
        let rows = summaries
            .list_summaries(event_id, completed_from, completed_until, limit)
            .await?;
        Ok(rows)
    }

    /// List recent summaries for an event with a default time window.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Storage` on repository failures.
    pub async fn list_recent_summaries(
        event_id: EventId,
        summaries: &dyn SummaryRepository,
        now: DateTime<Utc>,
        days: i64,
        limit: u32,
    ) -> Result<Vec<SummaryRow>, StudyError> {
        let from = now - chrono::Duration::days(days);
        Self::list_summaries(event_id, summaries, Some(from), Some(now), limit).await
    }

    /// The latest summary row for each listed event.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Storage` on repository failures.
    pub async fn latest_summaries(
        event_ids: &[EventId],
        summaries: &dyn SummaryRepository,
    ) -> Result<Vec<SummaryRow>, StudyError> {
        let rows = summaries.latest_summaries(event_ids).await?;
        Ok(rows)
    }

    /// Fetch a persisted summary by row id.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Storage` if the summary is missing or storage
    /// fails.
    pub async fn get_summary(
        id: i64,
        summaries: &dyn SummaryRepository,
    ) -> Result<SessionSummary, StudyError> {
        let summary = summaries.get_summary(id).await?;
        Ok(summary)
    }
}
