use thiserror::Error;

use crate::model::ids::ItemId;

/// Minimum number of answer choices on a multiple-choice item.
pub const MIN_CHOICES: usize = 2;

/// Maximum number of answer choices on a multiple-choice item.
pub const MAX_CHOICES: usize = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ItemError {
    #[error("item prompt cannot be empty")]
    EmptyPrompt,

    #[error("choice {index} is blank")]
    BlankChoice { index: usize },

    #[error("multiple-choice item needs at least {MIN_CHOICES} choices, got {len}")]
    TooFewChoices { len: usize },

    #[error("multiple-choice item allows at most {MAX_CHOICES} choices, got {len}")]
    TooManyChoices { len: usize },

    #[error("correct choice index {index} is out of range for {len} choices")]
    CorrectChoiceOutOfRange { index: usize, len: usize },

    #[error("performance indicator {index} is blank")]
    BlankIndicator { index: usize },
}

//
// ─── ITEM ──────────────────────────────────────────────────────────────────────
//

/// The gradable shape of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// A quiz question: ordered choices, one of which is correct.
    MultipleChoice {
        choices: Vec<String>,
        correct: usize,
        explanation: Option<String>,
    },
    /// A roleplay prompt: free-form response, never graded. The indicators
    /// are the performance points a judge would listen for.
    OpenEnded { indicators: Vec<String> },
}

/// One question or roleplay prompt in a session's fixed sequence.
///
/// Items are constructed once per session load and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    id: ItemId,
    prompt: String,
    kind: ItemKind,
}

impl Item {
    /// Creates a multiple-choice item.
    ///
    /// # Errors
    ///
    /// Returns `ItemError` for an empty prompt, a blank choice, a choice
    /// count outside `MIN_CHOICES..=MAX_CHOICES`, or a correct index past
    /// the choices.
    pub fn multiple_choice(
        id: ItemId,
        prompt: impl Into<String>,
        choices: Vec<String>,
        correct: usize,
        explanation: Option<String>,
    ) -> Result<Self, ItemError> {
        let prompt = validate_prompt(prompt.into())?;

        if choices.len() < MIN_CHOICES {
            return Err(ItemError::TooFewChoices { len: choices.len() });
        }
        if choices.len() > MAX_CHOICES {
            return Err(ItemError::TooManyChoices { len: choices.len() });
        }

        let mut trimmed = Vec::with_capacity(choices.len());
        for (index, choice) in choices.into_iter().enumerate() {
            let choice = choice.trim().to_owned();
            if choice.is_empty() {
                return Err(ItemError::BlankChoice { index });
            }
            trimmed.push(choice);
        }

        if correct >= trimmed.len() {
            return Err(ItemError::CorrectChoiceOutOfRange {
                index: correct,
                len: trimmed.len(),
            });
        }

        let explanation = explanation
            .map(|e| e.trim().to_owned())
            .filter(|e| !e.is_empty());

        Ok(Self {
            id,
            prompt,
            kind: ItemKind::MultipleChoice {
                choices: trimmed,
                correct,
                explanation,
            },
        })
    }

    /// Creates an open-ended roleplay item.
    ///
    /// # Errors
    ///
    /// Returns `ItemError` for an empty prompt or a blank indicator.
    pub fn open_ended(
        id: ItemId,
        prompt: impl Into<String>,
        indicators: Vec<String>,
    ) -> Result<Self, ItemError> {
        let prompt = validate_prompt(prompt.into())?;

        let mut trimmed = Vec::with_capacity(indicators.len());
        for (index, indicator) in indicators.into_iter().enumerate() {
            let indicator = indicator.trim().to_owned();
            if indicator.is_empty() {
                return Err(ItemError::BlankIndicator { index });
            }
            trimmed.push(indicator);
        }

        Ok(Self {
            id,
            prompt,
            kind: ItemKind::OpenEnded {
                indicators: trimmed,
            },
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    /// The ordered answer choices, or `None` for open-ended items.
    #[must_use]
    pub fn choices(&self) -> Option<&[String]> {
        match &self.kind {
            ItemKind::MultipleChoice { choices, .. } => Some(choices),
            ItemKind::OpenEnded { .. } => None,
        }
    }

    /// Index of the correct choice, or `None` for open-ended items.
    #[must_use]
    pub fn correct_choice(&self) -> Option<usize> {
        match &self.kind {
            ItemKind::MultipleChoice { correct, .. } => Some(*correct),
            ItemKind::OpenEnded { .. } => None,
        }
    }

    /// Explanation shown after answering, if the author provided one.
    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::MultipleChoice { explanation, .. } => explanation.as_deref(),
            ItemKind::OpenEnded { .. } => None,
        }
    }

    /// True when answers to this item are graded for correctness.
    #[must_use]
    pub fn is_gradable(&self) -> bool {
        matches!(self.kind, ItemKind::MultipleChoice { .. })
    }
}

fn validate_prompt(prompt: String) -> Result<String, ItemError> {
    let prompt = prompt.trim().to_owned();
    if prompt.is_empty() {
        return Err(ItemError::EmptyPrompt);
    }
    Ok(prompt)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
