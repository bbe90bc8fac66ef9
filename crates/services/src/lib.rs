#![forbid(unsafe_code)]

pub mod app_services;
pub mod bank_sync;
pub mod error;
pub mod handoff;
pub mod leaderboard;
pub mod roleplay_service;
pub mod sessions;

pub use prep_core::Clock;

pub use app_services::AppServices;
pub use bank_sync::{BankExport, BankSyncConfig, BankSyncService, SyncReport, convert_export};
pub use error::{
    AppServicesError, BankSyncError, HandoffError, LeaderboardError, RoleplayServiceError,
    StudyError,
};
pub use handoff::ResultsMailbox;
pub use leaderboard::{LeaderboardEntry, LeaderboardService};
pub use roleplay_service::RoleplayService;

pub use sessions::{
    EventSummaryItem, FinishOutcome, SessionBuilder, SessionPlan, StudyFlowService,
    SummaryHistoryService, SummaryId, SummaryListItem,
};
