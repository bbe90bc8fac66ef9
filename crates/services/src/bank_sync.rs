use std::env;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use prep_core::Clock;
use prep_core::model::{Event, EventId, EventSettings, Item, ItemId, RoleplayPrompt};
use storage::repository::{EventRepository, QuestionRepository, RoleplayRepository};

use crate::error::BankSyncError;

/// Connection settings for a hosted question bank.
#[derive(Clone, Debug)]
pub struct BankSyncConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl BankSyncConfig {
    /// Read the bank endpoint from `PREP_BANK_URL` and `PREP_BANK_TOKEN`.
    ///
    /// Returns `None` when no URL is configured; sync stays disabled.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("PREP_BANK_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let token = env::var("PREP_BANK_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        Some(Self { base_url, token })
    }
}

//
// ─── WIRE FORMAT ───────────────────────────────────────────────────────────────
//

/// Payload of `GET /events/{id}/bank`.
#[derive(Debug, Deserialize)]
pub struct BankExport {
    pub event: EventExport,
    #[serde(default)]
    pub questions: Vec<QuestionExport>,
    #[serde(default)]
    pub prompts: Vec<PromptExport>,
}

#[derive(Debug, Deserialize)]
pub struct EventExport {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub practice_size: u32,
    pub shuffle_practice: bool,
    pub points_per_correct: u32,
}

#[derive(Debug, Deserialize)]
pub struct QuestionExport {
    pub id: u64,
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct_choice: usize,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PromptExport {
    pub id: u64,
    pub title: String,
    pub scenario: String,
    #[serde(default)]
    pub indicators: Vec<String>,
}

/// Validated domain rows decoded from a bank export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankContents {
    pub event: Event,
    pub questions: Vec<Item>,
    pub prompts: Vec<RoleplayPrompt>,
}

/// Convert a wire export into validated domain rows.
///
/// Prompts bind to the export's event id; `created_at` for a new event is
/// the caller's clock (the upsert keeps the original on existing rows).
///
/// # Errors
///
/// Returns the core validation error for the first row the domain rejects.
pub fn convert_export(
    export: BankExport,
    now: DateTime<Utc>,
) -> Result<BankContents, prep_core::Error> {
    let settings = EventSettings::new(
        export.event.practice_size,
        export.event.shuffle_practice,
        export.event.points_per_correct,
    )?;
    let event = Event::new(
        EventId::new(export.event.id),
        export.event.name,
        export.event.category,
        settings,
        now,
    )?;

    let mut questions = Vec::with_capacity(export.questions.len());
    for question in export.questions {
        questions.push(Item::multiple_choice(
            ItemId::new(question.id),
            question.prompt,
            question.choices,
            question.correct_choice,
            question.explanation,
        )?);
    }

    let event_id = event.id();
    let mut prompts = Vec::with_capacity(export.prompts.len());
    for prompt in export.prompts {
        prompts.push(RoleplayPrompt::new(
            ItemId::new(prompt.id),
            event_id,
            prompt.title,
            prompt.scenario,
            prompt.indicators,
        )?);
    }

    Ok(BankContents {
        event,
        questions,
        prompts,
    })
}

//
// ─── SYNC SERVICE ──────────────────────────────────────────────────────────────
//

/// Row counts from one sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub questions: usize,
    pub prompts: usize,
}

/// Pull-based sync from a hosted question bank into local storage.
#[derive(Clone)]
pub struct BankSyncService {
    client: Client,
    config: Option<BankSyncConfig>,
    clock: Clock,
    events: Arc<dyn EventRepository>,
    questions: Arc<dyn QuestionRepository>,
    roleplays: Arc<dyn RoleplayRepository>,
}

impl BankSyncService {
    #[must_use]
    pub fn from_env(
        clock: Clock,
        events: Arc<dyn EventRepository>,
        questions: Arc<dyn QuestionRepository>,
        roleplays: Arc<dyn RoleplayRepository>,
    ) -> Self {
        Self::new(BankSyncConfig::from_env(), clock, events, questions, roleplays)
    }

    #[must_use]
    pub fn new(
        config: Option<BankSyncConfig>,
        clock: Clock,
        events: Arc<dyn EventRepository>,
        questions: Arc<dyn QuestionRepository>,
        roleplays: Arc<dyn RoleplayRepository>,
    ) -> Self {
        Self {
            client: Client::new(),
            config,
            clock,
            events,
            questions,
            roleplays,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Fetch an event's bank from the hosted service and upsert it locally.
    ///
    /// # Errors
    ///
    /// Returns `BankSyncError::Disabled` when no bank URL is configured,
    /// transport and status errors from the fetch, `Domain` when the payload
    /// fails validation, and `Storage` when an upsert fails.
    pub async fn sync_event(&self, event_id: EventId) -> Result<SyncReport, BankSyncError> {
        let config = self.config.as_ref().ok_or(BankSyncError::Disabled)?;

        let url = Url::parse(&format!(
            "{}/events/{}/bank",
            config.base_url.trim_end_matches('/'),
            event_id.value()
        ))?;

        let mut request = self.client.get(url);
        if let Some(token) = &config.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(BankSyncError::HttpStatus(response.status()));
        }

        let export: BankExport = response.json().await?;
        let contents = convert_export(export, self.clock.now())?;
        if contents.event.id() != event_id {
            return Err(BankSyncError::EventMismatch {
                requested: event_id,
                received: contents.event.id(),
            });
        }

        self.events.upsert_event(&contents.event).await?;
        for question in &contents.questions {
            self.questions.upsert_question(event_id, question).await?;
        }
        for prompt in &contents.prompts {
            self.roleplays.upsert_prompt(prompt).await?;
        }

        let report = SyncReport {
            questions: contents.questions.len(),
            prompts: contents.prompts.len(),
        };
        tracing::info!(
            %event_id,
            questions = report.questions,
            prompts = report.prompts,
            "bank sync complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use prep_core::time::fixed_now;

    const EXPORT_JSON: &str = r#"{
        "event": {
            "id": 3,
            "name": "Business Law",
            "category": "Objective Test",
            "practice_size": 10,
            "shuffle_practice": true,
            "points_per_correct": 5
        },
        "questions": [
            {
                "id": 1,
                "prompt": "Which court hears federal appeals?",
                "choices": ["Circuit court", "Small claims court", "Probate court"],
                "correct_choice": 0,
                "explanation": "Appeals from district courts go to the circuit courts."
            },
            {
                "id": 2,
                "prompt": "A contract requires?",
                "choices": ["Consideration", "A witness"],
                "correct_choice": 0
            }
        ],
        "prompts": [
            {
                "id": 9,
                "title": "Client pitch",
                "scenario": "Convince a skeptical client to renew their contract.",
                "indicators": ["Opens with a greeting", "States the value"]
            }
        ]
    }"#;

    #[test]
    fn convert_accepts_a_full_export() {
        let export: BankExport = serde_json::from_str(EXPORT_JSON).unwrap();
        let contents = convert_export(export, fixed_now()).unwrap();

        assert_eq!(contents.event.id(), EventId::new(3));
        assert_eq!(contents.event.settings().points_per_correct(), 5);
        assert_eq!(contents.questions.len(), 2);
        assert_eq!(contents.questions[0].correct_choice(), Some(0));
        assert_eq!(contents.questions[1].explanation(), None);
        assert_eq!(contents.prompts.len(), 1);
        assert_eq!(contents.prompts[0].event_id(), EventId::new(3));
    }

    #[test]
    fn convert_rejects_invalid_rows() {
        let json = r#"{
            "event": {
                "id": 3,
                "name": "Business Law",
                "practice_size": 10,
                "shuffle_practice": true,
                "points_per_correct": 5
            },
            "questions": [
                {
                    "id": 1,
                    "prompt": "Broken?",
                    "choices": ["a", "b"],
                    "correct_choice": 7
                }
            ]
        }"#;

        let export: BankExport = serde_json::from_str(json).unwrap();
        let err = convert_export(export, fixed_now()).unwrap_err();

        assert!(matches!(
            err,
            prep_core::Error::Item(prep_core::model::ItemError::CorrectChoiceOutOfRange { .. })
        ));
    }

    #[test]
    fn convert_rejects_a_zero_practice_size() {
        let json = r#"{
            "event": {
                "id": 3,
                "name": "Business Law",
                "practice_size": 0,
                "shuffle_practice": false,
                "points_per_correct": 5
            }
        }"#;

        let export: BankExport = serde_json::from_str(json).unwrap();
        let err = convert_export(export, fixed_now()).unwrap_err();

        assert!(matches!(err, prep_core::Error::Event(_)));
    }

    #[test]
    fn missing_env_disables_sync() {
        // Env vars are process-global, so only assert the disabled wiring.
        let svc = BankSyncService::new(
            None,
            prep_core::time::fixed_clock(),
            Arc::new(storage::repository::InMemoryRepository::new()),
            Arc::new(storage::repository::InMemoryRepository::new()),
            Arc::new(storage::repository::InMemoryRepository::new()),
        );
        assert!(!svc.enabled());
    }

    #[tokio::test]
    async fn disabled_sync_refuses_to_fetch() {
        let svc = BankSyncService::new(
            None,
            prep_core::time::fixed_clock(),
            Arc::new(storage::repository::InMemoryRepository::new()),
            Arc::new(storage::repository::InMemoryRepository::new()),
            Arc::new(storage::repository::InMemoryRepository::new()),
        );

        let err = svc.sync_event(EventId::new(1)).await.unwrap_err();
        assert!(matches!(err, BankSyncError::Disabled));
    }
}
