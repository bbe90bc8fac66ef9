mod account;
mod event;
mod ids;
mod item;
mod response;
mod roleplay;
mod session;
mod summary;

pub use ids::{AccountId, EventId, ItemId, ParseIdError, SessionId};

pub use account::{Account, AccountError, MAX_USERNAME_LEN, Username};
pub use event::{Event, EventError, EventSettings};
pub use item::{Item, ItemError, ItemKind, MAX_CHOICES, MIN_CHOICES};
pub use response::{Answer, Response, ResponseOutcome};
pub use roleplay::{MAX_INDICATORS, RoleplayError, RoleplayPrompt};
pub use session::{
    AnswerPhase, Session, SessionError, SessionMode, SessionProgress, SessionStatus,
};
pub use summary::{
    ItemReport, ReportEntry, ResultsSummary, SessionSummary, SummaryError,
};
