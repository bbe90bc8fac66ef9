use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prep_core::model::{
    Account, AccountId, Event, EventId, Item, ItemId, RoleplayPrompt, SessionSummary, Username,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A persisted summary together with its store-assigned row id.
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub id: i64,
    pub summary: SessionSummary,
}

impl SummaryRow {
    #[must_use]
    pub fn new(id: i64, summary: SessionSummary) -> Self {
        Self { id, summary }
    }
}

/// Repository contract for competitive events.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Persist or update an event.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the event cannot be stored.
    async fn upsert_event(&self, event: &Event) -> Result<(), StorageError>;

    /// Fetch an event by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; a missing event is `None`.
    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StorageError>;

    /// List events in id order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_events(&self, limit: u32) -> Result<Vec<Event>, StorageError>;
}

/// Repository contract for an event's question bank.
///
/// The bank holds multiple-choice items only; roleplay prompts live in their
/// own repository.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or update a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for an open-ended item, or other
    /// storage errors.
    async fn upsert_question(&self, event_id: EventId, item: &Item) -> Result<(), StorageError>;

    /// Fetch an event's bank in id order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_questions(
        &self,
        event_id: EventId,
        limit: u32,
    ) -> Result<Vec<Item>, StorageError>;
}

/// Repository contract for roleplay prompts.
#[async_trait]
pub trait RoleplayRepository: Send + Sync {
    /// Persist or update a prompt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the prompt cannot be stored.
    async fn upsert_prompt(&self, prompt: &RoleplayPrompt) -> Result<(), StorageError>;

    /// Fetch a prompt by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; a missing prompt is `None`.
    async fn get_prompt(&self, id: ItemId) -> Result<Option<RoleplayPrompt>, StorageError>;

    /// List an event's prompts in id order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_prompts(
        &self,
        event_id: EventId,
        limit: u32,
    ) -> Result<Vec<RoleplayPrompt>, StorageError>;

    /// Delete a prompt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no prompt has that id.
    async fn delete_prompt(&self, id: ItemId) -> Result<(), StorageError>;
}

/// Repository contract for competitor accounts.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new account with zero points; the store assigns the id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the username is taken.
    async fn insert_account(
        &self,
        username: &Username,
        created_at: DateTime<Utc>,
    ) -> Result<Account, StorageError>;

    /// Fetch an account by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; a missing account is `None`.
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StorageError>;

    /// Fetch an account by username.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Account>, StorageError>;

    /// Add points to an account and return the updated row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no account has that id.
    async fn add_points(&self, id: AccountId, delta: u32) -> Result<Account, StorageError>;

    /// The leaderboard query: points descending, username as the tiebreak.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn top_accounts(&self, limit: u32) -> Result<Vec<Account>, StorageError>;
}

/// Repository contract for finished-session summaries.
#[async_trait]
pub trait SummaryRepository: Send + Sync {
    /// Append a summary and return its store-assigned row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the session was already persisted.
    async fn append_summary(&self, summary: &SessionSummary) -> Result<i64, StorageError>;

    /// Fetch a summary by row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_summary(&self, id: i64) -> Result<SessionSummary, StorageError>;

    /// List an event's summaries, newest first, within an optional
    /// completed-at window.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_summaries(
        &self,
        event_id: EventId,
        completed_from: Option<DateTime<Utc>>,
        completed_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<SummaryRow>, StorageError>;

    /// The most recent summary for each listed event, ordered by event id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn latest_summaries(
        &self,
        event_ids: &[EventId],
    ) -> Result<Vec<SummaryRow>, StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

#[derive(Default)]
struct AccountTable {
    next_id: u64,
    rows: HashMap<AccountId, Account>,
}

#[derive(Default)]
struct SummaryTable {
    next_id: i64,
    rows: Vec<SummaryRow>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    events: Arc<Mutex<HashMap<EventId, Event>>>,
    questions: Arc<Mutex<HashMap<(EventId, ItemId), Item>>>,
    prompts: Arc<Mutex<HashMap<ItemId, RoleplayPrompt>>>,
    accounts: Arc<Mutex<AccountTable>>,
    summaries: Arc<Mutex<SummaryTable>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn capped(limit: u32) -> usize {
    usize::try_from(limit).unwrap_or(usize::MAX)
}

#[async_trait]
impl EventRepository for InMemoryRepository {
    async fn upsert_event(&self, event: &Event) -> Result<(), StorageError> {
        let mut guard = self
            .events
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(event.id(), event.clone());
        Ok(())
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StorageError> {
        let guard = self
            .events
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_events(&self, limit: u32) -> Result<Vec<Event>, StorageError> {
        let guard = self
            .events
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut events: Vec<Event> = guard.values().cloned().collect();
        events.sort_by_key(Event::id);
        events.truncate(capped(limit));
        Ok(events)
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, event_id: EventId, item: &Item) -> Result<(), StorageError> {
        if !item.is_gradable() {
            return Err(StorageError::Serialization(
                "open-ended items belong to the roleplay bank".into(),
            ));
        }
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert((event_id, item.id()), item.clone());
        Ok(())
    }

    async fn list_questions(
        &self,
        event_id: EventId,
        limit: u32,
    ) -> Result<Vec<Item>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut items: Vec<Item> = guard
            .iter()
            .filter(|((event, _), _)| *event == event_id)
            .map(|(_, item)| item.clone())
            .collect();
        items.sort_by_key(Item::id);
        items.truncate(capped(limit));
        Ok(items)
    }
}

#[async_trait]
impl RoleplayRepository for InMemoryRepository {
    async fn upsert_prompt(&self, prompt: &RoleplayPrompt) -> Result<(), StorageError> {
        let mut guard = self
            .prompts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(prompt.id(), prompt.clone());
        Ok(())
    }

    async fn get_prompt(&self, id: ItemId) -> Result<Option<RoleplayPrompt>, StorageError> {
        let guard = self
            .prompts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_prompts(
        &self,
        event_id: EventId,
        limit: u32,
    ) -> Result<Vec<RoleplayPrompt>, StorageError> {
        let guard = self
            .prompts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut prompts: Vec<RoleplayPrompt> = guard
            .values()
            .filter(|prompt| prompt.event_id() == event_id)
            .cloned()
            .collect();
        prompts.sort_by_key(RoleplayPrompt::id);
        prompts.truncate(capped(limit));
        Ok(prompts)
    }

    async fn delete_prompt(&self, id: ItemId) -> Result<(), StorageError> {
        let mut guard = self
            .prompts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl AccountRepository for InMemoryRepository {
    async fn insert_account(
        &self,
        username: &Username,
        created_at: DateTime<Utc>,
    ) -> Result<Account, StorageError> {
        let mut guard = self
            .accounts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.rows.values().any(|a| a.username() == username) {
            return Err(StorageError::Conflict);
        }
        guard.next_id += 1;
        let account = Account::new(
            AccountId::new(guard.next_id),
            username.clone(),
            0,
            created_at,
        );
        guard.rows.insert(account.id(), account.clone());
        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StorageError> {
        let guard = self
            .accounts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.rows.get(&id).cloned())
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Account>, StorageError> {
        let guard = self
            .accounts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .rows
            .values()
            .find(|a| a.username() == username)
            .cloned())
    }

    async fn add_points(&self, id: AccountId, delta: u32) -> Result<Account, StorageError> {
        let mut guard = self
            .accounts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let account = guard.rows.get_mut(&id).ok_or(StorageError::NotFound)?;
        account.award_points(delta);
        Ok(account.clone())
    }

    async fn top_accounts(&self, limit: u32) -> Result<Vec<Account>, StorageError> {
        let guard = self
            .accounts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut accounts: Vec<Account> = guard.rows.values().cloned().collect();
        accounts.sort_by(|a, b| {
            b.points()
                .cmp(&a.points())
                .then_with(|| a.username().as_str().cmp(b.username().as_str()))
        });
        accounts.truncate(capped(limit));
        Ok(accounts)
    }
}

#[async_trait]
impl SummaryRepository for InMemoryRepository {
    async fn append_summary(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        let mut guard = self
            .summaries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard
            .rows
            .iter()
            .any(|row| row.summary.session_id() == summary.session_id())
        {
            return Err(StorageError::Conflict);
        }
        guard.next_id += 1;
        let id = guard.next_id;
        guard.rows.push(SummaryRow::new(id, summary.clone()));
        Ok(id)
    }

    async fn get_summary(&self, id: i64) -> Result<SessionSummary, StorageError> {
        let guard = self
            .summaries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .rows
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.summary.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_summaries(
        &self,
        event_id: EventId,
        completed_from: Option<DateTime<Utc>>,
        completed_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<SummaryRow>, StorageError> {
        let guard = self
            .summaries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<SummaryRow> = guard
            .rows
            .iter()
            .filter(|row| row.summary.event_id() == event_id)
            .filter(|row| completed_from.is_none_or(|from| row.summary.completed_at() >= from))
            .filter(|row| completed_until.is_none_or(|until| row.summary.completed_at() <= until))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.summary
                .completed_at()
                .cmp(&a.summary.completed_at())
                .then_with(|| b.id.cmp(&a.id))
        });
        rows.truncate(capped(limit));
        Ok(rows)
    }

    async fn latest_summaries(
        &self,
        event_ids: &[EventId],
    ) -> Result<Vec<SummaryRow>, StorageError> {
        let guard = self
            .summaries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut ids = event_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut out = Vec::with_capacity(ids.len());
        for event_id in ids {
            let latest = guard
                .rows
                .iter()
                .filter(|row| row.summary.event_id() == event_id)
                .max_by(|a, b| {
                    a.summary
                        .completed_at()
                        .cmp(&b.summary.completed_at())
                        .then_with(|| a.id.cmp(&b.id))
                });
            if let Some(row) = latest {
                out.push(row.clone());
            }
        }
        Ok(out)
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub events: Arc<dyn EventRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub roleplays: Arc<dyn RoleplayRepository>,
    pub accounts: Arc<dyn AccountRepository>,
    pub summaries: Arc<dyn SummaryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let events: Arc<dyn EventRepository> = Arc::new(repo.clone());
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let roleplays: Arc<dyn RoleplayRepository> = Arc::new(repo.clone());
        let accounts: Arc<dyn AccountRepository> = Arc::new(repo.clone());
        let summaries: Arc<dyn SummaryRepository> = Arc::new(repo);
        Self {
            events,
            questions,
            roleplays,
            accounts,
            summaries,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use prep_core::model::{EventSettings, SessionId, SessionMode};
    use prep_core::time::fixed_now;

    fn build_event(id: u64) -> Event {
        Event::new(
            EventId::new(id),
            format!("Event {id}"),
            None,
            EventSettings::standard(),
            fixed_now(),
        )
        .unwrap()
    }

    fn build_question(id: u64) -> Item {
        Item::multiple_choice(
            ItemId::new(id),
            format!("Question {id}?"),
            vec!["a".into(), "b".into(), "c".into()],
            1,
            None,
        )
        .unwrap()
    }

    fn build_summary(event: u64, minutes: i64) -> SessionSummary {
        SessionSummary::from_persisted(
            SessionId::random(),
            EventId::new(event),
            SessionMode::Test,
            fixed_now(),
            fixed_now() + chrono::Duration::minutes(minutes),
            4,
            4,
            3,
            75,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn lists_questions_in_id_order() {
        let repo = InMemoryRepository::new();
        let event = build_event(1);
        repo.upsert_event(&event).await.unwrap();

        for id in [3, 1, 2] {
            repo.upsert_question(event.id(), &build_question(id))
                .await
                .unwrap();
        }

        let items = repo.list_questions(event.id(), 10).await.unwrap();
        let ids: Vec<u64> = items.iter().map(|i| i.id().value()).collect();
        assert_eq!(ids, [1, 2, 3]);

        let capped = repo.list_questions(event.id(), 2).await.unwrap();
        assert_eq!(capped.len(), 2);
    }

    #[tokio::test]
    async fn rejects_open_ended_questions() {
        let repo = InMemoryRepository::new();
        let item = Item::open_ended(ItemId::new(1), "Describe the scenario", vec![]).unwrap();

        let err = repo
            .upsert_question(EventId::new(1), &item)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn accounts_get_sequential_ids_and_unique_usernames() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();

        let first = repo
            .insert_account(&Username::new("avery").unwrap(), now)
            .await
            .unwrap();
        let second = repo
            .insert_account(&Username::new("blake").unwrap(), now)
            .await
            .unwrap();
        assert_eq!(first.id(), AccountId::new(1));
        assert_eq!(second.id(), AccountId::new(2));

        let err = repo
            .insert_account(&Username::new("avery").unwrap(), now)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn top_accounts_orders_by_points_then_username() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();

        for name in ["casey", "avery", "blake"] {
            repo.insert_account(&Username::new(name).unwrap(), now)
                .await
                .unwrap();
        }
        repo.add_points(AccountId::new(1), 50).await.unwrap();
        repo.add_points(AccountId::new(3), 50).await.unwrap();
        repo.add_points(AccountId::new(2), 90).await.unwrap();

        let top = repo.top_accounts(10).await.unwrap();
        let names: Vec<&str> = top.iter().map(|a| a.username().as_str()).collect();
        assert_eq!(names, ["avery", "blake", "casey"]);

        let err = repo.add_points(AccountId::new(99), 10).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn summaries_are_unique_per_session() {
        let repo = InMemoryRepository::new();
        let summary = build_summary(1, 10);

        let id = repo.append_summary(&summary).await.unwrap();
        assert_eq!(repo.get_summary(id).await.unwrap(), summary);

        let err = repo.append_summary(&summary).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        let err = repo.get_summary(999).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn summaries_list_newest_first_with_window() {
        let repo = InMemoryRepository::new();
        let early = build_summary(1, 10);
        let late = build_summary(1, 30);
        let other_event = build_summary(2, 20);

        repo.append_summary(&early).await.unwrap();
        repo.append_summary(&late).await.unwrap();
        repo.append_summary(&other_event).await.unwrap();

        let rows = repo
            .list_summaries(EventId::new(1), None, None, 10)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].summary, late);
        assert_eq!(rows[1].summary, early);

        let windowed = repo
            .list_summaries(
                EventId::new(1),
                Some(fixed_now() + chrono::Duration::minutes(20)),
                None,
                10,
            )
            .await
            .unwrap();
        assert_eq!(windowed.len(), 1);
        assert_eq!(windowed[0].summary, late);

        let latest = repo
            .latest_summaries(&[EventId::new(1), EventId::new(2), EventId::new(3)])
            .await
            .unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].summary, late);
        assert_eq!(latest[1].summary, other_event);
    }

    #[tokio::test]
    async fn prompt_crud_round_trip() {
        let repo = InMemoryRepository::new();
        let prompt = RoleplayPrompt::new(
            ItemId::new(5),
            EventId::new(1),
            "Team conflict",
            "Mediate a disagreement between two team members.",
            vec!["Stays neutral".into()],
        )
        .unwrap();

        repo.upsert_prompt(&prompt).await.unwrap();
        assert_eq!(repo.get_prompt(prompt.id()).await.unwrap(), Some(prompt.clone()));

        let listed = repo.list_prompts(EventId::new(1), 10).await.unwrap();
        assert_eq!(listed.len(), 1);

        repo.delete_prompt(prompt.id()).await.unwrap();
        assert_eq!(repo.get_prompt(prompt.id()).await.unwrap(), None);

        let err = repo.delete_prompt(prompt.id()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
