//! vinotes core - maintenance logic for the tasting-note store
//!
//! Laid out as a small hexagonal architecture:
//!
//! - **domain**: records, ids, pending updates, error type
//! - **ports**: traits for the note store and the operator console
//! - **services**: URL normalizer, migration reporter, run log
//! - **adapters**: PostgREST client and an in-memory store

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

mod log_migrations;

use std::sync::Arc;

use anyhow::Result;

use adapters::postgrest::PostgrestClient;
use config::Config;
use services::{MigrationReporter, NormalizeService};

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{ImageTarget, NoteId, PendingUpdate, TastingNote};
pub use services::{LogEntry, LogEvent, LoggingService};

/// Everything one maintenance run needs
///
/// Built once at process entry from the loaded configuration; nothing is
/// read from the environment after this point.
pub struct MaintenanceContext {
    pub config: Config,
    pub store: Arc<PostgrestClient>,
    pub normalize_service: NormalizeService,
    pub migration_reporter: MigrationReporter,
}

impl MaintenanceContext {
    /// Create a context for the given table/columns. No network call is made.
    pub fn new(config: Config, target: ImageTarget) -> Result<Self> {
        let store = Arc::new(PostgrestClient::new(&config, target)?);

        let normalize_service = NormalizeService::new(store.clone());
        let migration_reporter = MigrationReporter::new(&config);

        Ok(Self {
            config,
            store,
            normalize_service,
            migration_reporter,
        })
    }
}
