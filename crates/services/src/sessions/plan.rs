use rand::rng;
use rand::seq::SliceRandom;

use prep_core::model::{Event, Item, ItemError, RoleplayPrompt};

/// Selection result for a session build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    pub items: Vec<Item>,
    /// Size of the full bank the selection was drawn from.
    pub bank_size: usize,
}

impl SessionPlan {
    /// Number of items selected into this plan.
    #[must_use]
    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// Returns true when no items were selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Builds session item sequences according to event settings.
pub struct SessionBuilder<'a> {
    event: &'a Event,
}

impl<'a> SessionBuilder<'a> {
    #[must_use]
    pub fn new(event: &'a Event) -> Self {
        Self { event }
    }

    /// Build a practice plan: a draw of up to `practice_size` items.
    ///
    /// When the event enables `shuffle_practice` the draw is random;
    /// otherwise the first items in id order are taken, which keeps
    /// short banks deterministic.
    #[must_use]
    pub fn build_practice(self, bank: impl IntoIterator<Item = Item>) -> SessionPlan {
        let settings = self.event.settings();
        let take = usize::try_from(settings.practice_size()).unwrap_or(usize::MAX);

        let mut items: Vec<Item> = bank.into_iter().collect();
        items.sort_by_key(Item::id);
        let bank_size = items.len();

        if settings.shuffle_practice() {
            let mut rng = rng();
            items.as_mut_slice().shuffle(&mut rng);
        }
        items.truncate(take);

        SessionPlan { items, bank_size }
    }

    /// Build a test plan: the full bank in stable id order.
    #[must_use]
    pub fn build_test(self, bank: impl IntoIterator<Item = Item>) -> SessionPlan {
        let mut items: Vec<Item> = bank.into_iter().collect();
        items.sort_by_key(Item::id);
        let bank_size = items.len();

        SessionPlan { items, bank_size }
    }

    /// Build a roleplay plan by rendering prompts to open-ended items.
    ///
    /// # Errors
    ///
    /// Passes through `ItemError` from prompt rendering.
    pub fn build_roleplay(self, prompts: &[RoleplayPrompt]) -> Result<SessionPlan, ItemError> {
        let mut items = Vec::with_capacity(prompts.len());
        for prompt in prompts {
            items.push(prompt.to_item()?);
        }
        items.sort_by_key(Item::id);
        let bank_size = items.len();

        Ok(SessionPlan { items, bank_size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prep_core::model::{EventId, EventSettings, ItemId};
    use prep_core::time::fixed_now;

    fn build_event(settings: EventSettings) -> Event {
        Event::new(EventId::new(1), "Business Law", None, settings, fixed_now()).unwrap()
    }

    fn build_question(id: u64) -> Item {
        Item::multiple_choice(
            ItemId::new(id),
            format!("Q{id}?"),
            vec!["a".into(), "b".into(), "c".into()],
            0,
            None,
        )
        .unwrap()
    }

    fn ids(plan: &SessionPlan) -> Vec<u64> {
        plan.items.iter().map(|item| item.id().value()).collect()
    }

    #[test]
    fn practice_without_shuffle_takes_first_items_in_id_order() {
        let event = build_event(EventSettings::new(2, false, 10).unwrap());
        let bank = vec![build_question(3), build_question(1), build_question(2)];

        let plan = SessionBuilder::new(&event).build_practice(bank);

        assert_eq!(ids(&plan), vec![1, 2]);
        assert_eq!(plan.bank_size, 3);
    }

    #[test]
    fn practice_with_shuffle_keeps_the_size_cap() {
        let event = build_event(EventSettings::new(3, true, 10).unwrap());
        let bank: Vec<Item> = (1..=10).map(build_question).collect();

        let plan = SessionBuilder::new(&event).build_practice(bank);

        assert_eq!(plan.total(), 3);
        assert_eq!(plan.bank_size, 10);
        let mut seen = ids(&plan);
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|id| (1..=10).contains(id)));
    }

    #[test]
    fn practice_with_small_bank_takes_everything() {
        let event = build_event(EventSettings::new(10, true, 10).unwrap());
        let bank = vec![build_question(1), build_question(2)];

        let plan = SessionBuilder::new(&event).build_practice(bank);

        assert_eq!(plan.total(), 2);
        assert_eq!(plan.bank_size, 2);
    }

    #[test]
    fn test_plan_keeps_the_full_bank_in_id_order() {
        let event = build_event(EventSettings::new(2, true, 10).unwrap());
        let bank = vec![build_question(2), build_question(3), build_question(1)];

        let plan = SessionBuilder::new(&event).build_test(bank);

        assert_eq!(ids(&plan), vec![1, 2, 3]);
        assert_eq!(plan.bank_size, 3);
    }

    #[test]
    fn roleplay_plan_renders_prompts_to_open_ended_items() {
        let event = build_event(EventSettings::standard());
        let prompt = RoleplayPrompt::new(
            ItemId::new(7),
            event.id(),
            "Client pitch",
            "Convince a skeptical client to renew their contract.",
            vec!["Opens with a greeting".into()],
        )
        .unwrap();

        let plan = SessionBuilder::new(&event).build_roleplay(&[prompt]).unwrap();

        assert_eq!(plan.total(), 1);
        assert!(!plan.items[0].is_gradable());
        assert!(plan.items[0].prompt().starts_with("Client pitch: "));
    }

    #[test]
    fn empty_banks_produce_empty_plans() {
        let event = build_event(EventSettings::standard());

        let practice = SessionBuilder::new(&event).build_practice(Vec::new());
        assert!(practice.is_empty());

        let test = SessionBuilder::new(&event).build_test(Vec::new());
        assert!(test.is_empty());
        assert_eq!(test.bank_size, 0);
    }
}
