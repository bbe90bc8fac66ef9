//! Terminal session runner: drives select -> submit -> feedback -> advance
//! and renders the results handed off by the finish pipeline.

use std::io::{self, BufRead, Write};

use prep_core::model::{
    AccountId, Answer, Item, ItemKind, ReportEntry, ResponseOutcome, SessionError,
};
use services::{AppServices, StudyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Practice,
    Test,
    Roleplay,
}

/// What the user typed at an answer prompt.
enum AnswerInput {
    Answer(Answer),
    End,
}

pub async fn run_session(
    services: &AppServices,
    mode: RunMode,
    account: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let account_id = match account {
        Some(name) => Some(resolve_account(services, name).await?),
        None => None,
    };

    let flow = services.study_flow();
    let event_id = services.event_id();
    let started = match mode {
        RunMode::Practice => flow.start_practice(event_id).await,
        RunMode::Test => flow.start_test(event_id).await,
        RunMode::Roleplay => flow.start_roleplay(event_id).await,
    };

    let mut session = match started {
        Ok(session) => session,
        // An empty bank is a normal state, not a failure.
        Err(StudyError::Session(SessionError::Empty)) => {
            println!("Nothing available for this event yet. Try `seed` or `sync` first.");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let total = session.progress().total;
    println!("Starting with {total} item(s). Type `end` at any prompt to finish early.");

    let stdin = io::stdin();
    let mut lines = stdin.lock();

    while let Some(item) = session.current_item().cloned() {
        let number = session.progress().answered + 1;
        print_item(&item, number, total);

        match prompt_answer(&mut lines, &item)? {
            AnswerInput::End => break,
            AnswerInput::Answer(answer) => {
                // Checked against the item at selection time, so a rejection
                // here is a bug, not user input.
                session.select_answer(answer)?;
            }
        }

        // Selection is highlighted but not graded until the user confirms;
        // a different answer replaces the pending one.
        loop {
            let Some(line) = read_line(&mut lines, "[enter] submit, or another answer to change: ")?
            else {
                return finalize(services, session, account_id).await;
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            if trimmed.eq_ignore_ascii_case("end") {
                return finalize(services, session, account_id).await;
            }
            match parse_answer(trimmed, &item) {
                Some(answer) => session.select_answer(answer)?,
                None => println!("  (not a valid answer)"),
            }
        }

        let outcome = session.submit_answer()?.outcome();
        print_feedback(&item, outcome);

        if !session.is_complete() {
            match read_line(&mut lines, "[enter] next, or `end` to finish early: ")? {
                None => break,
                Some(line) if line.trim().eq_ignore_ascii_case("end") => break,
                Some(_) => {}
            }
        }
        session.advance(services.clock().now())?;
    }

    finalize(services, session, account_id).await
}

async fn resolve_account(
    services: &AppServices,
    name: &str,
) -> Result<AccountId, Box<dyn std::error::Error>> {
    let account = services.leaderboard().ensure_account(name).await?;
    println!(
        "Playing as {} ({} points).",
        account.username(),
        account.points()
    );
    Ok(account.id())
}

async fn finalize(
    services: &AppServices,
    session: prep_core::model::Session,
    account_id: Option<AccountId>,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = services.study_flow().finish(session, account_id).await?;

    println!();
    if outcome.points_awarded > 0 {
        println!("Leaderboard points earned: {}", outcome.points_awarded);
    }

    if !outcome.results_delivered {
        println!(
            "Results are unavailable right now; your score was saved as summary #{}.",
            outcome.summary_id
        );
        return Ok(());
    }

    // One-shot read: the mailbox slot is cleared by this take.
    match services.mailbox().take(outcome.session_id) {
        Ok(Some(results)) => print_results(&results),
        Ok(None) | Err(_) => {
            println!(
                "Results are unavailable right now; your score was saved as summary #{}.",
                outcome.summary_id
            );
        }
    }

    Ok(())
}

fn print_item(item: &Item, number: usize, total: usize) {
    println!();
    println!("--- Item {number} of {total} ---");
    println!("{}", item.prompt());
    if let ItemKind::MultipleChoice { choices, .. } = item.kind() {
        for (index, choice) in choices.iter().enumerate() {
            println!("  {}) {}", index + 1, choice);
        }
    }
}

fn prompt_answer(
    lines: &mut impl BufRead,
    item: &Item,
) -> Result<AnswerInput, Box<dyn std::error::Error>> {
    let prompt = match item.kind() {
        ItemKind::MultipleChoice { .. } => "Your answer (number): ",
        ItemKind::OpenEnded { .. } => "Your response: ",
    };

    loop {
        let Some(line) = read_line(lines, prompt)? else {
            // Input exhausted: finish with what has been answered so far.
            return Ok(AnswerInput::End);
        };
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("end") {
            return Ok(AnswerInput::End);
        }
        match parse_answer(trimmed, item) {
            Some(answer) => return Ok(AnswerInput::Answer(answer)),
            None => match item.kind() {
                ItemKind::MultipleChoice { choices, .. } => {
                    println!("  (enter a number from 1 to {})", choices.len());
                }
                ItemKind::OpenEnded { .. } => println!("  (enter a non-empty response)"),
            },
        }
    }
}

/// Maps raw input to an answer for the item, or `None` when it is out of
/// range or empty. Out-of-range numbers are user errors and simply ignored.
fn parse_answer(input: &str, item: &Item) -> Option<Answer> {
    match item.kind() {
        ItemKind::MultipleChoice { choices, .. } => {
            let number: usize = input.parse().ok()?;
            if number == 0 || number > choices.len() {
                return None;
            }
            Some(Answer::Choice(number - 1))
        }
        ItemKind::OpenEnded { .. } => {
            if input.is_empty() {
                None
            } else {
                Some(Answer::Text(input.to_owned()))
            }
        }
    }
}

fn print_feedback(item: &Item, outcome: ResponseOutcome) {
    match outcome {
        ResponseOutcome::Correct => println!("Correct!"),
        ResponseOutcome::Incorrect => {
            if let (Some(correct), Some(choices)) = (item.correct_choice(), item.choices()) {
                println!("Incorrect. The answer was {}) {}", correct + 1, choices[correct]);
            } else {
                println!("Incorrect.");
            }
        }
        ResponseOutcome::Ungraded => println!("Response recorded."),
    }
    if let Some(explanation) = item.explanation() {
        println!("  {explanation}");
    }
    if let ItemKind::OpenEnded { indicators } = item.kind() {
        if !indicators.is_empty() {
            println!("  Performance indicators to self-check:");
            for indicator in indicators {
                println!("   - {indicator}");
            }
        }
    }
}

fn print_results(results: &prep_core::model::ResultsSummary) {
    let summary = results.summary();
    println!("=== Results ===");
    println!(
        "Answered {} of {} item(s), {} correct ({}%).",
        summary.answered(),
        summary.total_items(),
        summary.correct(),
        summary.percentage()
    );

    for (index, report) in results.breakdown().iter().enumerate() {
        match &report.entry {
            ReportEntry::Answered { outcome, .. } => {
                let mark = match outcome {
                    ResponseOutcome::Correct => "+",
                    ResponseOutcome::Incorrect => "x",
                    ResponseOutcome::Ungraded => "~",
                };
                println!(" {mark} {}. {}", index + 1, report.prompt);
            }
            ReportEntry::Unanswered => {
                println!(" - {}. {} (unanswered)", index + 1, report.prompt);
            }
        }
    }
}

/// Reads one line, or `None` once the input is exhausted (closed pipe,
/// redirected file that ran out of lines).
fn read_line(lines: &mut impl BufRead, prompt: &str) -> io::Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    if lines.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prep_core::model::ItemId;

    fn choice_item() -> Item {
        Item::multiple_choice(
            ItemId::new(1),
            "Pick one",
            vec!["first".into(), "second".into()],
            0,
            None,
        )
        .unwrap()
    }

    #[test]
    fn read_line_reports_exhausted_input_as_none() {
        let mut input = std::io::Cursor::new("hello\n");
        assert_eq!(
            read_line(&mut input, "").unwrap().as_deref(),
            Some("hello\n")
        );
        assert_eq!(read_line(&mut input, "").unwrap(), None);
    }

    #[test]
    fn exhausted_input_ends_the_answer_prompt() {
        let mut input = std::io::empty();
        let result = prompt_answer(&mut input, &choice_item()).unwrap();
        assert!(matches!(result, AnswerInput::End));
    }

    #[test]
    fn out_of_range_number_reprompts_until_valid_or_eof() {
        let mut input = std::io::Cursor::new("9\n2\n");
        let first = prompt_answer(&mut input, &choice_item()).unwrap();
        assert!(matches!(first, AnswerInput::Answer(Answer::Choice(1))));

        // The cursor is now empty; the next prompt must not spin.
        let second = prompt_answer(&mut input, &choice_item()).unwrap();
        assert!(matches!(second, AnswerInput::End));
    }
}
