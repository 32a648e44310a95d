pub mod eligibility;
pub mod error;
pub mod orchestrator;
pub mod readiness;
pub mod submission;
pub mod traits;
pub mod types;

pub use eligibility::{classify, DayClassification, DayRow, SkipReason, WEEKEND_DAYS};
pub use error::{ClockInError, ReadinessSignal, RowParseError};
pub use orchestrator::{DayOutcome, DayResult, ScanOrchestrator, ScanReport, ScanSettings};
pub use readiness::{NetworkEvent, ReadinessTracker};
pub use submission::{ClockInSubmission, FetchRequest, SubmissionBuilder, SubmissionOutcome};
pub use traits::{AttendanceSession, RequestExecutor, ScanObserver};
pub use types::{endpoints, ClockTime, ClockTimeError, TargetMonth};
