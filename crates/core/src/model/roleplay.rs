use thiserror::Error;

use crate::model::{EventId, Item, ItemError, ItemId};

/// Upper bound on performance indicators per prompt.
pub const MAX_INDICATORS: usize = 16;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RoleplayError {
    #[error("prompt title cannot be empty")]
    EmptyTitle,

    #[error("prompt scenario cannot be empty")]
    EmptyScenario,

    #[error("performance indicator cannot be blank")]
    BlankIndicator,

    #[error("performance indicator is already listed")]
    DuplicateIndicator,

    #[error("a prompt holds at most {MAX_INDICATORS} indicators")]
    TooManyIndicators,

    #[error("no indicator at index {index}")]
    IndicatorOutOfRange { index: usize },
}

//
// ─── ROLEPLAY PROMPT ───────────────────────────────────────────────────────────
//

/// A judged scenario prompt: a title, the scenario text, and the performance
/// indicators graders look for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleplayPrompt {
    id: ItemId,
    event_id: EventId,
    title: String,
    scenario: String,
    indicators: Vec<String>,
}

impl RoleplayPrompt {
    /// Creates a new prompt.
    ///
    /// # Errors
    ///
    /// Returns `RoleplayError::EmptyTitle` or `RoleplayError::EmptyScenario`
    /// for blank text, and the indicator errors for blank, duplicate, or
    /// too many indicators.
    pub fn new(
        id: ItemId,
        event_id: EventId,
        title: impl Into<String>,
        scenario: impl Into<String>,
        indicators: Vec<String>,
    ) -> Result<Self, RoleplayError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(RoleplayError::EmptyTitle);
        }

        let scenario = scenario.into().trim().to_owned();
        if scenario.is_empty() {
            return Err(RoleplayError::EmptyScenario);
        }

        let mut accepted = Vec::with_capacity(indicators.len());
        for indicator in indicators {
            push_indicator(&mut accepted, indicator)?;
        }

        Ok(Self {
            id,
            event_id,
            title,
            scenario,
            indicators: accepted,
        })
    }

    /// Appends a performance indicator.
    ///
    /// # Errors
    ///
    /// Returns `RoleplayError::BlankIndicator`, `DuplicateIndicator`, or
    /// `TooManyIndicators` when the indicator cannot be added.
    pub fn add_indicator(&mut self, indicator: impl Into<String>) -> Result<(), RoleplayError> {
        push_indicator(&mut self.indicators, indicator.into())
    }

    /// Removes and returns the indicator at `index`.
    ///
    /// # Errors
    ///
    /// Returns `RoleplayError::IndicatorOutOfRange` if `index` is past the end.
    pub fn remove_indicator(&mut self, index: usize) -> Result<String, RoleplayError> {
        if index >= self.indicators.len() {
            return Err(RoleplayError::IndicatorOutOfRange { index });
        }
        Ok(self.indicators.remove(index))
    }

    /// Renders the prompt as an open-ended item for a roleplay session.
    ///
    /// # Errors
    ///
    /// Passes through `ItemError`, though a constructed prompt always
    /// satisfies the item rules.
    pub fn to_item(&self) -> Result<Item, ItemError> {
        Item::open_ended(
            self.id,
            format!("{}: {}", self.title, self.scenario),
            self.indicators.clone(),
        )
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    #[must_use]
    pub fn indicators(&self) -> &[String] {
        &self.indicators
    }
}

fn push_indicator(indicators: &mut Vec<String>, indicator: String) -> Result<(), RoleplayError> {
    let indicator = indicator.trim().to_owned();
    if indicator.is_empty() {
        return Err(RoleplayError::BlankIndicator);
    }
    if indicators.iter().any(|existing| existing == &indicator) {
        return Err(RoleplayError::DuplicateIndicator);
    }
    if indicators.len() >= MAX_INDICATORS {
        return Err(RoleplayError::TooManyIndicators);
    }
    indicators.push(indicator);
    Ok(())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn build_prompt() -> RoleplayPrompt {
        RoleplayPrompt::new(
            ItemId::new(1),
            EventId::new(7),
            "Client pitch",
            "Convince a skeptical client to renew their contract.",
            vec!["Opens with a greeting".into(), "States the value".into()],
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_blank_title() {
        let err = RoleplayPrompt::new(ItemId::new(1), EventId::new(1), "  ", "scenario", vec![])
            .unwrap_err();
        assert_eq!(err, RoleplayError::EmptyTitle);
    }

    #[test]
    fn new_rejects_blank_scenario() {
        let err = RoleplayPrompt::new(ItemId::new(1), EventId::new(1), "title", " \n ", vec![])
            .unwrap_err();
        assert_eq!(err, RoleplayError::EmptyScenario);
    }

    #[test]
    fn new_trims_text_fields() {
        let prompt = RoleplayPrompt::new(
            ItemId::new(1),
            EventId::new(1),
            "  Sales call  ",
            "  Handle an objection.  ",
            vec!["  Asks questions  ".into()],
        )
        .unwrap();

        assert_eq!(prompt.title(), "Sales call");
        assert_eq!(prompt.scenario(), "Handle an objection.");
        assert_eq!(prompt.indicators(), ["Asks questions"]);
    }

    #[test]
    fn add_indicator_rejects_duplicates() {
        let mut prompt = build_prompt();
        let err = prompt.add_indicator("States the value").unwrap_err();
        assert_eq!(err, RoleplayError::DuplicateIndicator);
        assert_eq!(prompt.indicators().len(), 2);
    }

    #[test]
    fn add_indicator_enforces_cap() {
        let mut prompt = build_prompt();
        for i in prompt.indicators().len()..MAX_INDICATORS {
            prompt.add_indicator(format!("indicator {i}")).unwrap();
        }

        let err = prompt.add_indicator("one more").unwrap_err();
        assert_eq!(err, RoleplayError::TooManyIndicators);
        assert_eq!(prompt.indicators().len(), MAX_INDICATORS);
    }

    #[test]
    fn remove_indicator_rejects_out_of_range() {
        let mut prompt = build_prompt();
        let err = prompt.remove_indicator(2).unwrap_err();
        assert_eq!(err, RoleplayError::IndicatorOutOfRange { index: 2 });

        let removed = prompt.remove_indicator(0).unwrap();
        assert_eq!(removed, "Opens with a greeting");
        assert_eq!(prompt.indicators(), ["States the value"]);
    }

    #[test]
    fn to_item_renders_an_open_ended_item() {
        let prompt = build_prompt();
        let item = prompt.to_item().unwrap();

        assert_eq!(item.id(), ItemId::new(1));
        assert_eq!(
            item.prompt(),
            "Client pitch: Convince a skeptical client to renew their contract."
        );
        assert!(!item.is_gradable());
        assert_eq!(item.choices(), None);
    }
}
