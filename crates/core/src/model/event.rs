use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::EventId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EventError {
    #[error("event name cannot be empty")]
    EmptyName,

    #[error("practice size must be > 0")]
    InvalidPracticeSize,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Per-event knobs for session building and scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSettings {
    practice_size: u32,
    shuffle_practice: bool,
    points_per_correct: u32,
}

impl EventSettings {
    /// Standard settings for a competitive event:
    /// 10 questions per practice round, shuffled draw, 10 points per correct
    /// answer on the leaderboard.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            practice_size: 10,
            shuffle_practice: true,
            points_per_correct: 10,
        }
    }

    /// Creates custom event settings.
    ///
    /// # Errors
    ///
    /// Returns `EventError::InvalidPracticeSize` if `practice_size` is zero.
    pub fn new(
        practice_size: u32,
        shuffle_practice: bool,
        points_per_correct: u32,
    ) -> Result<Self, EventError> {
        if practice_size == 0 {
            return Err(EventError::InvalidPracticeSize);
        }

        Ok(Self {
            practice_size,
            shuffle_practice,
            points_per_correct,
        })
    }

    /// Maximum number of items drawn into a practice session.
    ///
    /// Test sessions ignore this and use the full bank.
    #[must_use]
    pub fn practice_size(&self) -> u32 {
        self.practice_size
    }

    #[must_use]
    pub fn shuffle_practice(&self) -> bool {
        self.shuffle_practice
    }

    /// Leaderboard points awarded per correctly answered item.
    #[must_use]
    pub fn points_per_correct(&self) -> u32 {
        self.points_per_correct
    }
}

//
// ─── EVENT ─────────────────────────────────────────────────────────────────────
//

/// A competitive event with its question bank settings.
///
/// Events group study items by topic (e.g. an objective test subject) and
/// control how sessions over that bank are built and scored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    id: EventId,
    name: String,
    category: Option<String>,
    settings: EventSettings,
    created_at: DateTime<Utc>,
}

impl Event {
    /// Creates a new Event.
    ///
    /// # Errors
    ///
    /// Returns `EventError::EmptyName` if name is empty or whitespace-only.
    pub fn new(
        id: EventId,
        name: impl Into<String>,
        category: Option<String>,
        settings: EventSettings,
        created_at: DateTime<Utc>,
    ) -> Result<Self, EventError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(EventError::EmptyName);
        }

        let category = category
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());

        Ok(Self {
            id,
            name: name.trim().to_owned(),
            category,
            settings,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> EventId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[must_use]
    pub fn settings(&self) -> &EventSettings {
        &self.settings
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn event_new_rejects_empty_name() {
        let settings = EventSettings::standard();
        let err = Event::new(EventId::new(1), "   ", None, settings, fixed_now()).unwrap_err();
        assert_eq!(err, EventError::EmptyName);
    }

    #[test]
    fn settings_new_rejects_zero_practice_size() {
        let err = EventSettings::new(0, true, 10).unwrap_err();
        assert_eq!(err, EventError::InvalidPracticeSize);
    }

    #[test]
    fn settings_standard_defaults() {
        let settings = EventSettings::standard();
        assert_eq!(settings.practice_size(), 10);
        assert!(settings.shuffle_practice());
        assert_eq!(settings.points_per_correct(), 10);
    }

    #[test]
    fn settings_allows_zero_points() {
        let settings = EventSettings::new(5, false, 0).unwrap();
        assert_eq!(settings.points_per_correct(), 0);
    }

    #[test]
    fn event_new_happy_path() {
        let settings = EventSettings::standard();
        let event = Event::new(
            EventId::new(10),
            "Business Management",
            Some("Objective Test".into()),
            settings,
            fixed_now(),
        )
        .unwrap();

        assert_eq!(event.id(), EventId::new(10));
        assert_eq!(event.name(), "Business Management");
        assert_eq!(event.category(), Some("Objective Test"));
        assert_eq!(event.settings().practice_size(), 10);
    }

    #[test]
    fn event_trims_name_and_category() {
        let settings = EventSettings::standard();
        let event = Event::new(
            EventId::new(1),
            "  Marketing  ",
            Some("  Roleplay  ".into()),
            settings,
            fixed_now(),
        )
        .unwrap();

        assert_eq!(event.name(), "Marketing");
        assert_eq!(event.category(), Some("Roleplay"));
    }

    #[test]
    fn event_filters_blank_category() {
        let settings = EventSettings::standard();
        let event = Event::new(
            EventId::new(1),
            "Accounting",
            Some("   ".into()),
            settings,
            fixed_now(),
        )
        .unwrap();

        assert_eq!(event.category(), None);
    }
}
