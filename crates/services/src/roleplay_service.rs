use std::sync::Arc;

use prep_core::model::{EventId, ItemId, RoleplayPrompt};
use storage::repository::{RoleplayRepository, StorageError};

use crate::error::RoleplayServiceError;

/// CRUD over the roleplay prompt bank.
///
/// Indicator edits go through the core mutations, so the bank never holds a
/// prompt the domain would reject.
#[derive(Clone)]
pub struct RoleplayService {
    roleplays: Arc<dyn RoleplayRepository>,
}

impl RoleplayService {
    #[must_use]
    pub fn new(roleplays: Arc<dyn RoleplayRepository>) -> Self {
        Self { roleplays }
    }

    /// Validate and persist a new prompt.
    ///
    /// # Errors
    ///
    /// Returns `RoleplayServiceError::Prompt` when the fields fail validation
    /// and `RoleplayServiceError::Storage` when persistence fails.
    pub async fn create(
        &self,
        id: ItemId,
        event_id: EventId,
        title: &str,
        scenario: &str,
        indicators: Vec<String>,
    ) -> Result<RoleplayPrompt, RoleplayServiceError> {
        let prompt = RoleplayPrompt::new(id, event_id, title, scenario, indicators)?;
        self.roleplays.upsert_prompt(&prompt).await?;
        Ok(prompt)
    }

    /// Fetch a prompt by id.
    ///
    /// # Errors
    ///
    /// Returns `RoleplayServiceError::Storage` with `NotFound` when no prompt
    /// has that id.
    pub async fn get(&self, id: ItemId) -> Result<RoleplayPrompt, RoleplayServiceError> {
        let prompt = self
            .roleplays
            .get_prompt(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        Ok(prompt)
    }

    /// List an event's prompts in id order.
    ///
    /// # Errors
    ///
    /// Returns `RoleplayServiceError::Storage` on repository failures.
    pub async fn list(
        &self,
        event_id: EventId,
        limit: u32,
    ) -> Result<Vec<RoleplayPrompt>, RoleplayServiceError> {
        let prompts = self.roleplays.list_prompts(event_id, limit).await?;
        Ok(prompts)
    }

    /// Delete a prompt.
    ///
    /// # Errors
    ///
    /// Returns `RoleplayServiceError::Storage` with `NotFound` when no prompt
    /// has that id.
    pub async fn delete(&self, id: ItemId) -> Result<(), RoleplayServiceError> {
        self.roleplays.delete_prompt(id).await?;
        Ok(())
    }

    /// Append a performance indicator to a stored prompt.
    ///
    /// # Errors
    ///
    /// Returns `RoleplayServiceError::Prompt` when the indicator is rejected
    /// and `RoleplayServiceError::Storage` for lookup or persistence failures.
    pub async fn add_indicator(
        &self,
        id: ItemId,
        indicator: &str,
    ) -> Result<RoleplayPrompt, RoleplayServiceError> {
        let mut prompt = self.get(id).await?;
        prompt.add_indicator(indicator)?;
        self.roleplays.upsert_prompt(&prompt).await?;
        Ok(prompt)
    }

    /// Remove the indicator at `index` from a stored prompt.
    ///
    /// # Errors
    ///
    /// Returns `RoleplayServiceError::Prompt` when the index is out of range
    /// and `RoleplayServiceError::Storage` for lookup or persistence failures.
    pub async fn remove_indicator(
        &self,
        id: ItemId,
        index: usize,
    ) -> Result<RoleplayPrompt, RoleplayServiceError> {
        let mut prompt = self.get(id).await?;
        prompt.remove_indicator(index)?;
        self.roleplays.upsert_prompt(&prompt).await?;
        Ok(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use prep_core::model::RoleplayError;
    use storage::repository::InMemoryRepository;

    fn build_service(repo: &InMemoryRepository) -> RoleplayService {
        RoleplayService::new(Arc::new(repo.clone()))
    }

    async fn create_prompt(svc: &RoleplayService) -> RoleplayPrompt {
        svc.create(
            ItemId::new(1),
            EventId::new(1),
            "Client pitch",
            "Convince a skeptical client to renew their contract.",
            vec!["Opens with a greeting".into(), "States the value".into()],
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let repo = InMemoryRepository::new();
        let svc = build_service(&repo);

        let created = create_prompt(&svc).await;
        let loaded = svc.get(created.id()).await.unwrap();

        assert_eq!(loaded, created);
    }

    #[tokio::test]
    async fn indicator_edits_are_persisted() {
        let repo = InMemoryRepository::new();
        let svc = build_service(&repo);
        let prompt = create_prompt(&svc).await;

        svc.add_indicator(prompt.id(), "Closes with a follow-up plan")
            .await
            .unwrap();
        let updated = svc.remove_indicator(prompt.id(), 0).await.unwrap();

        assert_eq!(
            updated.indicators(),
            ["States the value", "Closes with a follow-up plan"]
        );
        let loaded = svc.get(prompt.id()).await.unwrap();
        assert_eq!(loaded, updated);
    }

    #[tokio::test]
    async fn duplicate_indicator_is_rejected() {
        let repo = InMemoryRepository::new();
        let svc = build_service(&repo);
        let prompt = create_prompt(&svc).await;

        let err = svc
            .add_indicator(prompt.id(), "States the value")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RoleplayServiceError::Prompt(RoleplayError::DuplicateIndicator)
        ));
    }

    #[tokio::test]
    async fn delete_removes_the_prompt() {
        let repo = InMemoryRepository::new();
        let svc = build_service(&repo);
        let prompt = create_prompt(&svc).await;

        svc.delete(prompt.id()).await.unwrap();

        let err = svc.get(prompt.id()).await.unwrap_err();
        assert!(matches!(
            err,
            RoleplayServiceError::Storage(StorageError::NotFound)
        ));
    }
}
