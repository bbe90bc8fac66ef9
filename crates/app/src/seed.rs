//! Loads a small demo event so the app is usable out of the box.

use prep_core::model::{Event, EventId, EventSettings, Item, ItemId, RoleplayPrompt};
use services::Clock;
use storage::repository::Storage;

const DEMO_EVENT_ID: u64 = 1;

pub async fn run(storage: &Storage, clock: Clock) -> Result<(), Box<dyn std::error::Error>> {
    let now = clock.now();
    let event = Event::new(
        EventId::new(DEMO_EVENT_ID),
        "Introduction to Business",
        Some("Objective Test".into()),
        EventSettings::new(5, true, 10)?,
        now,
    )?;
    storage.events.upsert_event(&event).await?;

    let questions = demo_questions()?;
    for question in &questions {
        storage.questions.upsert_question(event.id(), question).await?;
    }

    let prompts = demo_prompts(event.id())?;
    for prompt in &prompts {
        storage.roleplays.upsert_prompt(prompt).await?;
    }

    println!(
        "Seeded event {} (\"{}\") with {} questions and {} roleplay prompts.",
        event.id(),
        event.name(),
        questions.len(),
        prompts.len()
    );
    Ok(())
}

fn demo_questions() -> Result<Vec<Item>, prep_core::model::ItemError> {
    Ok(vec![
        Item::multiple_choice(
            ItemId::new(1),
            "Which economic system relies primarily on supply and demand to set prices?",
            vec![
                "Command economy".into(),
                "Market economy".into(),
                "Traditional economy".into(),
            ],
            1,
            Some("In a market economy, prices emerge from voluntary exchange rather than central planning.".into()),
        )?,
        Item::multiple_choice(
            ItemId::new(2),
            "What does a balance sheet report?",
            vec![
                "Revenues and expenses over a period".into(),
                "Assets, liabilities, and owner's equity at a point in time".into(),
                "Cash receipts and payments only".into(),
            ],
            1,
            Some("The income statement covers a period; the balance sheet is a snapshot.".into()),
        )?,
        Item::multiple_choice(
            ItemId::new(3),
            "Which is a defining characteristic of a sole proprietorship?",
            vec![
                "Limited personal liability".into(),
                "Unlimited personal liability".into(),
                "Double taxation".into(),
                "Separate legal personhood".into(),
            ],
            1,
            None,
        )?,
        Item::multiple_choice(
            ItemId::new(4),
            "A budget surplus occurs when:",
            vec![
                "Expenses exceed income".into(),
                "Income equals expenses".into(),
                "Income exceeds expenses".into(),
            ],
            2,
            None,
        )?,
        Item::multiple_choice(
            ItemId::new(5),
            "Which pricing strategy sets a high initial price that is lowered over time?",
            vec![
                "Penetration pricing".into(),
                "Price skimming".into(),
                "Loss-leader pricing".into(),
                "Psychological pricing".into(),
            ],
            1,
            Some("Skimming captures early adopters first, then widens the market as the price drops.".into()),
        )?,
    ])
}

fn demo_prompts(
    event_id: EventId,
) -> Result<Vec<RoleplayPrompt>, prep_core::model::RoleplayError> {
    Ok(vec![
        RoleplayPrompt::new(
            ItemId::new(101),
            event_id,
            "Customer retention call",
            "A long-time customer is threatening to switch to a cheaper competitor. \
             Persuade them to stay without simply matching the lower price.",
            vec![
                "Acknowledges the customer's concern".into(),
                "Explains the value beyond price".into(),
                "Proposes a concrete next step".into(),
            ],
        )?,
        RoleplayPrompt::new(
            ItemId::new(102),
            event_id,
            "New product launch briefing",
            "Brief your sales team on a product launching next quarter and how to \
             position it against the market leader.",
            vec![
                "Identifies the target market".into(),
                "Differentiates from the competition".into(),
                "Sets measurable goals for the team".into(),
            ],
        )?,
    ])
}
