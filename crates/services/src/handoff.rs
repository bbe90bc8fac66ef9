use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use prep_core::model::{ResultsSummary, SessionId};

use crate::error::HandoffError;

/// One-shot mailbox carrying full results from a finished session to the
/// results view.
///
/// The finish pipeline puts; the results view takes exactly once. A second
/// take returns `None`, so a revisited or refreshed view falls back to the
/// persisted summary instead of replaying stale feedback.
#[derive(Clone, Default)]
pub struct ResultsMailbox {
    slots: Arc<Mutex<HashMap<SessionId, ResultsSummary>>>,
}

impl ResultsMailbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores results for a session, replacing any earlier entry for the
    /// same session.
    ///
    /// # Errors
    ///
    /// Returns `HandoffError::Unavailable` when the mailbox lock is poisoned.
    pub fn put(&self, results: ResultsSummary) -> Result<(), HandoffError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|e| HandoffError::Unavailable(e.to_string()))?;
        slots.insert(results.summary().session_id(), results);
        Ok(())
    }

    /// Takes the results for a session, clearing the slot.
    ///
    /// # Errors
    ///
    /// Returns `HandoffError::Unavailable` when the mailbox lock is poisoned.
    pub fn take(&self, id: SessionId) -> Result<Option<ResultsSummary>, HandoffError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|e| HandoffError::Unavailable(e.to_string()))?;
        Ok(slots.remove(&id))
    }

    /// Drops any stored results for a session without reading them.
    ///
    /// Used when a session is abandoned before its results view opens.
    ///
    /// # Errors
    ///
    /// Returns `HandoffError::Unavailable` when the mailbox lock is poisoned.
    pub fn remove(&self, id: SessionId) -> Result<(), HandoffError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|e| HandoffError::Unavailable(e.to_string()))?;
        slots.remove(&id);
        Ok(())
    }
}
