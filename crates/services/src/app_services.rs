use std::sync::Arc;

use prep_core::Clock;
use prep_core::model::{Event, EventId, EventSettings};
use storage::repository::{EventRepository, Storage};

use crate::bank_sync::BankSyncService;
use crate::error::AppServicesError;
use crate::handoff::ResultsMailbox;
use crate::leaderboard::LeaderboardService;
use crate::roleplay_service::RoleplayService;
use crate::sessions::{StudyFlowService, SummaryHistoryService};

/// Assembles app-facing services and resolves a usable event id.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    event_id: EventId,
    created_default_event: bool,
    mailbox: ResultsMailbox,
    study_flow: Arc<StudyFlowService>,
    summary_history: Arc<SummaryHistoryService>,
    leaderboard: Arc<LeaderboardService>,
    roleplay: Arc<RoleplayService>,
    bank_sync: Arc<BankSyncService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or default event
    /// setup fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        preferred_event_id: EventId,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::assemble(storage, clock, preferred_event_id).await
    }

    /// Build services over in-memory storage, for tests and dry runs.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if default event setup fails.
    pub async fn new_in_memory(
        clock: Clock,
        preferred_event_id: EventId,
    ) -> Result<Self, AppServicesError> {
        Self::assemble(Storage::in_memory(), clock, preferred_event_id).await
    }

    async fn assemble(
        storage: Storage,
        clock: Clock,
        preferred_event_id: EventId,
    ) -> Result<Self, AppServicesError> {
        let (event_id, created_default_event) =
            ensure_default_event(storage.events.as_ref(), clock, preferred_event_id).await?;

        let mailbox = ResultsMailbox::new();
        let study_flow = Arc::new(StudyFlowService::new(
            clock,
            Arc::clone(&storage.events),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.roleplays),
            Arc::clone(&storage.summaries),
            Arc::clone(&storage.accounts),
            mailbox.clone(),
        ));
        let summary_history = Arc::new(SummaryHistoryService::new(
            clock,
            Arc::clone(&storage.summaries),
        ));
        let leaderboard = Arc::new(LeaderboardService::new(clock, Arc::clone(&storage.accounts)));
        let roleplay = Arc::new(RoleplayService::new(Arc::clone(&storage.roleplays)));
        let bank_sync = Arc::new(BankSyncService::from_env(
            clock,
            Arc::clone(&storage.events),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.roleplays),
        ));

        Ok(Self {
            clock,
            event_id,
            created_default_event,
            mailbox,
            study_flow,
            summary_history,
            leaderboard,
            roleplay,
            bank_sync,
        })
    }

    /// The time source shared by the assembled services.
    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// The event sessions run against by default.
    #[must_use]
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// True when bootstrap had to create the default event, meaning the bank
    /// is empty and seeding is the sensible next step.
    #[must_use]
    pub fn created_default_event(&self) -> bool {
        self.created_default_event
    }

    #[must_use]
    pub fn mailbox(&self) -> ResultsMailbox {
        self.mailbox.clone()
    }

    #[must_use]
    pub fn study_flow(&self) -> Arc<StudyFlowService> {
        Arc::clone(&self.study_flow)
    }

    #[must_use]
    pub fn summary_history(&self) -> Arc<SummaryHistoryService> {
        Arc::clone(&self.summary_history)
    }

    #[must_use]
    pub fn leaderboard(&self) -> Arc<LeaderboardService> {
        Arc::clone(&self.leaderboard)
    }

    #[must_use]
    pub fn roleplay(&self) -> Arc<RoleplayService> {
        Arc::clone(&self.roleplay)
    }

    #[must_use]
    pub fn bank_sync(&self) -> Arc<BankSyncService> {
        Arc::clone(&self.bank_sync)
    }
}

async fn ensure_default_event(
    events: &dyn EventRepository,
    clock: Clock,
    preferred_id: EventId,
) -> Result<(EventId, bool), AppServicesError> {
    if events.get_event(preferred_id).await?.is_some() {
        return Ok((preferred_id, false));
    }

    let existing = events.list_events(128).await?;
    if let Some(first) = existing.first() {
        return Ok((first.id(), false));
    }

    let now = clock.now();
    let event = Event::new(
        EventId::new(1),
        "Introduction to Business",
        None,
        EventSettings::standard(),
        now,
    )?;
    events.upsert_event(&event).await?;

    Ok((event.id(), true))
}
