//! Service layer - business logic orchestration
//!
//! Each service covers one maintenance task and talks to the outside world
//! only through ports.

pub mod logging;
pub mod migration;
pub mod normalize;

pub use logging::{LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationOutcome, MigrationReporter, DEFAULT_SQL_FILE};
pub use normalize::{
    classify_url, is_affirmative, normalize_url, FailedUpdate, NormalizeOptions, NormalizeService,
    NormalizeSummary, RewriteRules, RunOutcome, ScanReport, SkippedUrl, UrlDisposition,
};
