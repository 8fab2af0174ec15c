//! Migrate command - print a schema migration for manual execution

use std::path::Path;

use anyhow::Result;
use vinotes_core::services::MigrationOutcome;
use vinotes_core::{ImageTarget, LogEvent};

use super::{get_context, get_logger, log_event};
use crate::output;

pub fn run(env_file: Option<&Path>, file: &Path, json: bool) -> Result<()> {
    let ctx = get_context(env_file, ImageTarget::default())?;
    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command("migrate"));

    let outcome = match ctx.migration_reporter.prepare(file) {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(l) = &logger {
                let _ = l.log_error("migration_failed", "migrate", &e.to_string());
            }
            return Err(e.into());
        }
    };

    match &outcome {
        MigrationOutcome::RequiresManualStep { path, .. } => log_event(
            &logger,
            LogEvent::new("migration_reported")
                .with_command("migrate")
                .with_detail(path.display().to_string()),
        ),
        MigrationOutcome::FileMissing { path } => log_event(
            &logger,
            LogEvent::new("migration_file_missing")
                .with_command("migrate")
                .with_detail(path.display().to_string()),
        ),
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    let lines = report_lines(&outcome);
    match outcome {
        MigrationOutcome::FileMissing { .. } => lines.iter().for_each(|l| output::warning(l)),
        MigrationOutcome::RequiresManualStep { .. } => lines.iter().for_each(|l| println!("{}", l)),
    }

    Ok(())
}

/// Text report for an outcome, one entry per printed line
///
/// A missing file is reported on its own; nothing claims it was read.
fn report_lines(outcome: &MigrationOutcome) -> Vec<String> {
    match outcome {
        MigrationOutcome::FileMissing { path } => {
            vec![format!("File not found: {}", path.display())]
        }
        MigrationOutcome::RequiresManualStep {
            path,
            sql,
            sql_editor_url,
        } => {
            let mut lines = vec![
                format!("Reading SQL from {}...", path.display()),
                "The REST client cannot execute raw SQL, so this migration has to be run by hand."
                    .to_string(),
                "Please run the following SQL in your Supabase Dashboard SQL Editor:".to_string(),
            ];
            if let Some(url) = sql_editor_url {
                lines.push(format!("  {}", url));
            }
            lines.push(String::new());
            lines.push(output::separator());
            lines.push(sql.clone());
            lines.push(output::separator());
            lines.push(String::new());
            lines
        }
    }
}
