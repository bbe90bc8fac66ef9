mod plan;
mod queries;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::StudyError;
pub use plan::{SessionBuilder, SessionPlan};
pub use view::{EventSummaryItem, SummaryHistoryService, SummaryId, SummaryListItem};
pub use workflow::{FinishOutcome, StudyFlowService};
