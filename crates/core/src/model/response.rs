use crate::model::ids::ItemId;

/// A user's answer to one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Index into the item's choices (quiz items).
    Choice(usize),
    /// Free-form text (roleplay items, not graded).
    Text(String),
}

/// Grading result for a submitted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    Correct,
    Incorrect,
    /// Open-ended items are recorded but never graded.
    Ungraded,
}

impl ResponseOutcome {
    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, ResponseOutcome::Correct)
    }
}

/// Record of one answered item.
///
/// Immutable once created; a session appends exactly one response per item,
/// in answer order, and never edits a past response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    item_id: ItemId,
    answer: Answer,
    outcome: ResponseOutcome,
}

impl Response {
    #[must_use]
    pub fn new(item_id: ItemId, answer: Answer, outcome: ResponseOutcome) -> Self {
        Self {
            item_id,
            answer,
            outcome,
        }
    }

    #[must_use]
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    #[must_use]
    pub fn answer(&self) -> &Answer {
        &self.answer
    }

    #[must_use]
    pub fn outcome(&self) -> ResponseOutcome {
        self.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_records_answer_and_outcome() {
        let response = Response::new(
            ItemId::new(7),
            Answer::Choice(2),
            ResponseOutcome::Incorrect,
        );

        assert_eq!(response.item_id(), ItemId::new(7));
        assert_eq!(response.answer(), &Answer::Choice(2));
        assert!(!response.outcome().is_correct());
    }

    #[test]
    fn outcome_correctness() {
        assert!(ResponseOutcome::Correct.is_correct());
        assert!(!ResponseOutcome::Ungraded.is_correct());
    }
}
