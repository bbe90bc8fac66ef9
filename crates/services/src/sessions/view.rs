use chrono::{DateTime, Utc};
use std::sync::Arc;

use prep_core::Clock;
use prep_core::model::{EventId, SessionId, SessionMode, SessionSummary};
use storage::repository::{SummaryRepository, SummaryRow};

use super::queries::SessionQueries;
use crate::error::StudyError;

/// Storage identifier for a persisted session summary.
///
/// NOTE: This is currently `i64` to match `SQLite` row IDs.
pub type SummaryId = i64;

/// Presentation-agnostic list item for a finished session.
///
/// This is intentionally **not** a UI view-model:
/// - no pre-formatted strings
/// - no localization assumptions
///
/// The view may format timestamps and scores as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryListItem {
    pub id: SummaryId,
    pub session_id: SessionId,
    pub mode: SessionMode,
    pub completed_at: DateTime<Utc>,

    pub total_items: u32,
    pub answered: u32,
    pub correct: u32,
    pub percentage: u8,
}

impl SummaryListItem {
    #[must_use]
    pub fn from_summary(id: SummaryId, summary: &SessionSummary) -> Self {
        Self {
            id,
            session_id: summary.session_id(),
            mode: summary.mode(),
            completed_at: summary.completed_at(),
            total_items: summary.total_items(),
            answered: summary.answered(),
            correct: summary.correct(),
            percentage: summary.percentage(),
        }
    }
}

/// Latest summary per event, preserving event identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSummaryItem {
    pub event_id: EventId,
    pub id: SummaryId,
    pub mode: SessionMode,
    pub completed_at: DateTime<Utc>,

    pub answered: u32,
    pub correct: u32,
    pub percentage: u8,
}

impl EventSummaryItem {
    #[must_use]
    pub fn from_row(row: &SummaryRow) -> Self {
        let summary = &row.summary;
        Self {
            event_id: summary.event_id(),
            id: row.id,
            mode: summary.mode(),
            completed_at: summary.completed_at(),
            answered: summary.answered(),
            correct: summary.correct(),
            percentage: summary.percentage(),
        }
    }
}

/// Presentation-facing summary facade that hides repositories and time from
/// the view.
///
/// This service owns:
/// - the time source (`Clock`)
/// - repository access
///
/// It does **not** own UI formatting.
#[derive(Clone)]
pub struct SummaryHistoryService {
    clock: Clock,
    summaries: Arc<dyn SummaryRepository>,
}

impl SummaryHistoryService {
    #[must_use]
    pub fn new(clock: Clock, summaries: Arc<dyn SummaryRepository>) -> Self {
        Self { clock, summaries }
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::new(
            clock,
            Arc::new(storage::repository::InMemoryRepository::new()),
        )
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Load recent summaries for an event, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Storage` on repository failures.
    pub async fn list_recent(
        &self,
        event_id: EventId,
        days: i64,
        limit: u32,
    ) -> Result<Vec<SummaryListItem>, StudyError> {
        let now = self.clock.now();
        let rows = SessionQueries::list_recent_summaries(
            event_id,
            self.summaries.as_ref(),
            now,
            days,
            limit,
        )
        .await?;

        Ok(rows
            .iter()
            .map(|row| SummaryListItem::from_summary(row.id, &row.summary))
            .collect())
    }

    /// Load the latest summary per event.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Storage` on repository failures.
    pub async fn latest_by_event(
        &self,
        event_ids: &[EventId],
    ) -> Result<Vec<EventSummaryItem>, StudyError> {
        let rows = SessionQueries::latest_summaries(event_ids, self.summaries.as_ref()).await?;
        Ok(rows.iter().map(EventSummaryItem::from_row).collect())
    }

    /// Fetch a session summary by ID.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Storage` when the summary is missing or
    /// repository access fails.
    pub async fn get(&self, id: SummaryId) -> Result<SessionSummary, StudyError> {
        SessionQueries::get_summary(id, self.summaries.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use prep_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn build_summary(event: u64, completed_at: DateTime<Utc>) -> SessionSummary {
        SessionSummary::from_persisted(
            SessionId::random(),
            EventId::new(event),
            SessionMode::Practice,
            completed_at - chrono::Duration::minutes(10),
            completed_at,
            5,
            4,
            3,
            75,
        )
        .unwrap()
    }

    #[test]
    fn list_item_is_presentation_agnostic() {
        let now = fixed_now();
        let summary = build_summary(1, now);

        let item = SummaryListItem::from_summary(42, &summary);

        assert_eq!(item.id, 42);
        assert_eq!(item.session_id, summary.session_id());
        assert_eq!(item.completed_at, now);
        assert_eq!(item.answered, 4);
        assert_eq!(item.correct, 3);
        assert_eq!(item.percentage, 75);
    }

    #[tokio::test]
    async fn list_recent_filters_by_range() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        let event_id = EventId::new(1);

        let recent = build_summary(1, now - chrono::Duration::days(1));
        let old = build_summary(1, now - chrono::Duration::days(10));
        repo.append_summary(&recent).await.unwrap();
        repo.append_summary(&old).await.unwrap();

        let svc = SummaryHistoryService::new(Clock::fixed(now), Arc::new(repo));
        let items = svc.list_recent(event_id, 7, 10).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].completed_at, recent.completed_at());
    }

    #[tokio::test]
    async fn latest_by_event_returns_one_row_per_event() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        let event_a = EventId::new(1);
        let event_b = EventId::new(2);

        let a_old = build_summary(1, now - chrono::Duration::days(2));
        let a_new = build_summary(1, now);
        let b_only = build_summary(2, now - chrono::Duration::days(5));

        repo.append_summary(&a_old).await.unwrap();
        let id_a_new = repo.append_summary(&a_new).await.unwrap();
        let id_b = repo.append_summary(&b_only).await.unwrap();

        let svc = SummaryHistoryService::new(Clock::fixed(now), Arc::new(repo));
        let items = svc.latest_by_event(&[event_a, event_b]).await.unwrap();

        let mut by_event = std::collections::HashMap::new();
        for item in items {
            by_event.insert(item.event_id, item.id);
        }

        assert_eq!(by_event.get(&event_a), Some(&id_a_new));
        assert_eq!(by_event.get(&event_b), Some(&id_b));
    }

    #[tokio::test]
    async fn get_round_trips_a_summary() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        let summary = build_summary(1, now);
        let id = repo.append_summary(&summary).await.unwrap();

        let svc = SummaryHistoryService::new(Clock::fixed(now), Arc::new(repo));
        let loaded = svc.get(id).await.unwrap();

        assert_eq!(loaded, summary);
    }
}
