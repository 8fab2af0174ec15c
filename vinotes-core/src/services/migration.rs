//! Migration reporter - hand a schema migration to the operator
//!
//! The REST interface cannot run arbitrary SQL, so a migration is never
//! applied from here. The reporter reads the SQL file and returns it for the
//! operator to paste into the dashboard SQL editor.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Config;
use crate::domain::result::Result;

/// Migration shipped with the image-gallery feature
pub const DEFAULT_SQL_FILE: &str = "infra/create_wine_images.sql";

/// Outcome of preparing a migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationOutcome {
    /// The SQL has to be run by hand
    RequiresManualStep {
        path: PathBuf,
        sql: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        sql_editor_url: Option<String>,
    },
    /// Nothing at `path`; nothing to do
    FileMissing { path: PathBuf },
}

/// Migration reporter
pub struct MigrationReporter {
    sql_editor_url: Option<String>,
}

impl MigrationReporter {
    pub fn new(config: &Config) -> Self {
        Self {
            sql_editor_url: config.sql_editor_url(),
        }
    }

    /// Read the SQL file and describe the manual step
    ///
    /// A missing file is an outcome, not an error. Any other read failure
    /// (permissions, invalid UTF-8) is returned as an error.
    pub fn prepare(&self, path: &Path) -> Result<MigrationOutcome> {
        let sql = match std::fs::read_to_string(path) {
            Ok(sql) => sql,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(MigrationOutcome::FileMissing {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        Ok(MigrationOutcome::RequiresManualStep {
            path: path.to_path_buf(),
            sql,
            sql_editor_url: self.sql_editor_url.clone(),
        })
    }
}
