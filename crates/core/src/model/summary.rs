use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{Answer, EventId, ItemId, Response, ResponseOutcome, SessionId, SessionMode};

// ─── ERRORS ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("counts out of order: {correct} correct, {answered} answered, {total_items} items")]
    CountMismatch {
        total_items: u32,
        answered: u32,
        correct: u32,
    },

    #[error("stored percentage ({stored}) does not match the counts ({derived})")]
    PercentageMismatch { stored: u8, derived: u8 },
}

// ─── SESSION SUMMARY ───────────────────────────────────────────────────────────

/// Aggregate outcome of a finished study session.
///
/// `answered` counts submitted responses, including ungraded ones; `correct`
/// counts graded hits. Items skipped by an early finish appear in
/// `total_items` but in neither count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    session_id: SessionId,
    event_id: EventId,
    mode: SessionMode,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    total_items: u32,
    answered: u32,
    correct: u32,
    percentage: u8,
}

impl SessionSummary {
    /// Build a summary from the responses recorded during a session.
    ///
    /// Counts saturate instead of failing: a session large enough to overflow
    /// `u32` is not representable upstream.
    #[must_use]
    pub fn from_responses(
        session_id: SessionId,
        event_id: EventId,
        mode: SessionMode,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        total_items: usize,
        responses: &[Response],
    ) -> Self {
        let mut correct = 0_u32;
        for response in responses {
            if response.outcome().is_correct() {
                correct = correct.saturating_add(1);
            }
        }

        let total_items = u32::try_from(total_items).unwrap_or(u32::MAX);
        let answered = u32::try_from(responses.len()).unwrap_or(u32::MAX);

        Self {
            session_id,
            event_id,
            mode,
            started_at,
            completed_at,
            total_items,
            answered,
            correct,
            percentage: percentage_of(correct, answered),
        }
    }

    /// Rehydrate a summary from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SummaryError::InvalidTimeRange` if `completed_at` is before
    /// `started_at`, `SummaryError::CountMismatch` if the counts are out of
    /// order, and `SummaryError::PercentageMismatch` if the stored percentage
    /// does not agree with them.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        session_id: SessionId,
        event_id: EventId,
        mode: SessionMode,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        total_items: u32,
        answered: u32,
        correct: u32,
        percentage: u8,
    ) -> Result<Self, SummaryError> {
        if completed_at < started_at {
            return Err(SummaryError::InvalidTimeRange);
        }
        if answered > total_items || correct > answered {
            return Err(SummaryError::CountMismatch {
                total_items,
                answered,
                correct,
            });
        }
        let derived = percentage_of(correct, answered);
        if percentage != derived {
            return Err(SummaryError::PercentageMismatch {
                stored: percentage,
                derived,
            });
        }

        Ok(Self {
            session_id,
            event_id,
            mode,
            started_at,
            completed_at,
            total_items,
            answered,
            correct,
            percentage,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
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
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.total_items
    }

    #[must_use]
    pub fn answered(&self) -> u32 {
        self.answered
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        self.percentage
    }
}

/// Share of correct answers among answered items, rounded half up.
fn percentage_of(correct: u32, answered: u32) -> u8 {
    if answered == 0 {
        return 0;
    }
    let scaled = (200 * u64::from(correct) + u64::from(answered)) / (2 * u64::from(answered));
    u8::try_from(scaled.min(100)).unwrap_or(100)
}

// ─── RESULTS BREAKDOWN ─────────────────────────────────────────────────────────

/// One line of the per-item results breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub item_id: ItemId,
    pub prompt: String,
    pub entry: ReportEntry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEntry {
    Answered {
        answer: Answer,
        outcome: ResponseOutcome,
        correct_choice: Option<usize>,
        explanation: Option<String>,
    },
    Unanswered,
}

/// Everything the results screen needs: the aggregate plus the breakdown,
/// listed in item order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsSummary {
    summary: SessionSummary,
    breakdown: Vec<ItemReport>,
}

impl ResultsSummary {
    #[must_use]
    pub fn new(summary: SessionSummary, breakdown: Vec<ItemReport>) -> Self {
        Self { summary, breakdown }
    }

    #[must_use]
    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    #[must_use]
    pub fn breakdown(&self) -> &[ItemReport] {
        &self.breakdown
    }
}

// ─── TESTS ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn build_responses(outcomes: &[ResponseOutcome]) -> Vec<Response> {
        outcomes
            .iter()
            .enumerate()
            .map(|(i, outcome)| {
                Response::new(
                    ItemId::new(i as u64 + 1),
                    Answer::Choice(0),
                    *outcome,
                )
            })
            .collect()
    }

    #[test]
    fn from_responses_counts_outcomes() {
        let now = fixed_now();
        let responses = build_responses(&[
            ResponseOutcome::Correct,
            ResponseOutcome::Incorrect,
            ResponseOutcome::Correct,
            ResponseOutcome::Ungraded,
        ]);

        let summary = SessionSummary::from_responses(
            SessionId::random(),
            EventId::new(7),
            SessionMode::Practice,
            now,
            now,
            5,
            &responses,
        );

        assert_eq!(summary.total_items(), 5);
        assert_eq!(summary.answered(), 4);
        assert_eq!(summary.correct(), 2);
        assert_eq!(summary.percentage(), 50);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage_of(1, 2), 50);
        assert_eq!(percentage_of(1, 3), 33);
        assert_eq!(percentage_of(2, 3), 67);
        assert_eq!(percentage_of(1, 8), 13);
        assert_eq!(percentage_of(7, 7), 100);
    }

    #[test]
    fn percentage_is_zero_with_nothing_answered() {
        assert_eq!(percentage_of(0, 0), 0);

        let summary = SessionSummary::from_responses(
            SessionId::random(),
            EventId::new(1),
            SessionMode::Test,
            fixed_now(),
            fixed_now(),
            10,
            &[],
        );
        assert_eq!(summary.percentage(), 0);
    }

    #[test]
    fn from_persisted_accepts_derived_values() {
        let now = fixed_now();
        let built = SessionSummary::from_responses(
            SessionId::random(),
            EventId::new(3),
            SessionMode::Test,
            now,
            now + chrono::Duration::minutes(12),
            3,
            &build_responses(&[ResponseOutcome::Correct, ResponseOutcome::Incorrect]),
        );

        let restored = SessionSummary::from_persisted(
            built.session_id(),
            built.event_id(),
            built.mode(),
            built.started_at(),
            built.completed_at(),
            built.total_items(),
            built.answered(),
            built.correct(),
            built.percentage(),
        )
        .unwrap();

        assert_eq!(restored, built);
    }

    #[test]
    fn from_persisted_rejects_inverted_time_range() {
        let now = fixed_now();
        let err = SessionSummary::from_persisted(
            SessionId::random(),
            EventId::new(1),
            SessionMode::Practice,
            now,
            now - chrono::Duration::seconds(1),
            1,
            1,
            1,
            100,
        )
        .unwrap_err();

        assert_eq!(err, SummaryError::InvalidTimeRange);
    }

    #[test]
    fn from_persisted_rejects_count_mismatch() {
        let now = fixed_now();
        let err = SessionSummary::from_persisted(
            SessionId::random(),
            EventId::new(1),
            SessionMode::Practice,
            now,
            now,
            2,
            3,
            1,
            33,
        )
        .unwrap_err();

        assert!(matches!(err, SummaryError::CountMismatch { .. }));
    }

    #[test]
    fn from_persisted_rejects_percentage_mismatch() {
        let now = fixed_now();
        let err = SessionSummary::from_persisted(
            SessionId::random(),
            EventId::new(1),
            SessionMode::Practice,
            now,
            now,
            4,
            4,
            2,
            49,
        )
        .unwrap_err();

        assert_eq!(
            err,
            SummaryError::PercentageMismatch {
                stored: 49,
                derived: 50
            }
        );
    }
}
