use std::fmt;

use prep_core::model::EventId;
use services::{AppServices, Clock};

mod runner;
mod seed;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidEventId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidLimit { raw: String },
    InvalidDays { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidEventId { raw } => write!(f, "invalid --event-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
            ArgsError::InvalidDays { raw } => write!(f, "invalid --days value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!(
        "  cargo run -p app -- practice    [--db <sqlite_url>] [--event-id <id>] [--account <name>]"
    );
    eprintln!(
        "  cargo run -p app -- test        [--db <sqlite_url>] [--event-id <id>] [--account <name>]"
    );
    eprintln!(
        "  cargo run -p app -- roleplay    [--db <sqlite_url>] [--event-id <id>] [--account <name>]"
    );
    eprintln!("  cargo run -p app -- leaderboard [--db <sqlite_url>] [--limit <n>]");
    eprintln!(
        "  cargo run -p app -- history     [--db <sqlite_url>] [--event-id <id>] [--days <n>] [--limit <n>]"
    );
    eprintln!("  cargo run -p app -- sync        [--db <sqlite_url>] [--event-id <id>]");
    eprintln!("  cargo run -p app -- seed        [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://prep.sqlite3");
    eprintln!("  --event-id 1");
    eprintln!("  --limit 10, --days 30");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PREP_DB_URL, PREP_EVENT_ID, PREP_ACCOUNT, PREP_BANK_URL, PREP_BANK_TOKEN");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Practice,
    Test,
    Roleplay,
    Leaderboard,
    History,
    Sync,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "practice" => Some(Self::Practice),
            "test" => Some(Self::Test),
            "roleplay" => Some(Self::Roleplay),
            "leaderboard" => Some(Self::Leaderboard),
            "history" => Some(Self::History),
            "sync" => Some(Self::Sync),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    event_id: EventId,
    account: Option<String>,
    limit: u32,
    days: i64,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("PREP_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://prep.sqlite3".into(), normalize_sqlite_url);
        let mut event_id = std::env::var("PREP_EVENT_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| EventId::new(1), EventId::new);
        let mut account = std::env::var("PREP_ACCOUNT")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let mut limit = 10u32;
        let mut days = 30i64;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--event-id" => {
                    let value = require_value(args, "--event-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidEventId { raw: value.clone() })?;
                    event_id = EventId::new(parsed);
                }
                "--account" => {
                    let value = require_value(args, "--account")?;
                    account = Some(value);
                }
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    limit = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value.clone() })?;
                }
                "--days" => {
                    let value = require_value(args, "--days")?;
                    days = value
                        .parse::<i64>()
                        .map_err(|_| ArgsError::InvalidDays { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            event_id,
            account,
            limit,
            days,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    argv.remove(0);

    let mut iter = argv.into_iter();
    let args = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so
    // core/services stay pure.
    prepare_sqlite_file(&args.db_url)?;

    if cmd == Command::Seed {
        let storage = storage::repository::Storage::sqlite(&args.db_url).await?;
        return seed::run(&storage, Clock::system()).await;
    }

    let services = AppServices::new_sqlite(&args.db_url, Clock::system(), args.event_id).await?;
    if services.created_default_event() && matches!(cmd, Command::Practice | Command::Test) {
        eprintln!("note: the question bank is empty; run `seed` first to load sample content.");
    }
    let event_id = services.event_id();

    match cmd {
        Command::Practice => {
            runner::run_session(&services, runner::RunMode::Practice, args.account.as_deref())
                .await
        }
        Command::Test => {
            runner::run_session(&services, runner::RunMode::Test, args.account.as_deref()).await
        }
        Command::Roleplay => {
            runner::run_session(&services, runner::RunMode::Roleplay, args.account.as_deref())
                .await
        }
        Command::Leaderboard => {
            let table = services.leaderboard().top(args.limit).await?;
            if table.is_empty() {
                println!("No accounts on the leaderboard yet.");
                return Ok(());
            }
            println!("{:<6} {:<34} {:>8}", "RANK", "USERNAME", "POINTS");
            for entry in table {
                println!("{:<6} {:<34} {:>8}", entry.rank, entry.username, entry.points);
            }
            Ok(())
        }
        Command::History => {
            let items = services
                .summary_history()
                .list_recent(event_id, args.days, args.limit)
                .await?;
            if items.is_empty() {
                println!("No finished sessions in the last {} days.", args.days);
                return Ok(());
            }
            for item in items {
                println!(
                    "#{:<5} {:<10} {}  {}/{} answered, {} correct ({}%)",
                    item.id,
                    item.mode.as_str(),
                    item.completed_at.format("%Y-%m-%d %H:%M"),
                    item.answered,
                    item.total_items,
                    item.correct,
                    item.percentage
                );
            }
            Ok(())
        }
        Command::Sync => {
            let report = services.bank_sync().sync_event(event_id).await?;
            println!(
                "Synced event {event_id}: {} questions, {} roleplay prompts.",
                report.questions, report.prompts
            );
            Ok(())
        }
        Command::Seed => unreachable!("handled above"),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
