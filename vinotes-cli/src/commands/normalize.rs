//! Normalize command - rewrite absolute image URLs into /api/images/ paths

use std::io::{BufRead, IsTerminal, Write};
use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use dialoguer::Input;
use vinotes_core::ports::OperatorConsole;
use vinotes_core::services::{
    is_affirmative, NormalizeOptions, NormalizeSummary, RewriteRules, RunOutcome,
};
use vinotes_core::{Error, ImageTarget, LogEvent, LoggingService, NoteId, PendingUpdate};

use super::{get_context, get_logger, log_event};
use crate::output;

const PROMPT: &str = "Do you want to proceed with the update? (y/n)";

pub struct NormalizeArgs {
    pub table: String,
    pub id_column: String,
    pub url_column: String,
    pub strip_api_origin: bool,
    pub dry_run: bool,
    pub yes: bool,
    pub json: bool,
}

/// Terminal side of a normalize run
///
/// In JSON mode nothing but the prompt is written, and the prompt goes to
/// stderr so stdout stays parseable.
struct TerminalConsole<'a> {
    json: bool,
    table: String,
    logger: &'a Option<LoggingService>,
    announced: bool,
}

impl TerminalConsole<'_> {
    fn announce(&mut self, count: usize) {
        if !self.announced && !self.json {
            println!();
            println!("Found {} records to update.", count);
        }
        self.announced = true;
    }

    fn read_answer(&self) -> std::io::Result<String> {
        if std::io::stdin().is_terminal() {
            return Input::<String>::new()
                .with_prompt(PROMPT)
                .allow_empty(true)
                .interact_text()
                .map_err(|e| std::io::Error::other(e.to_string()));
        }

        // Piped input: one line, EOF counts as an empty answer
        let mut stderr = std::io::stderr();
        writeln!(stderr, "{}", PROMPT)?;
        stderr.flush()?;
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    }
}

impl OperatorConsole for TerminalConsole<'_> {
    fn fetching(&mut self) {
        if !self.json {
            println!("Fetching records from {}...", self.table);
        }
    }

    fn queued(&mut self, update: &PendingUpdate) {
        if self.json {
            return;
        }
        println!("ID: {}", update.id);
        println!("  Old: {}", update.old_url.dimmed());
        println!("  New: {}", update.new_url.green());
    }

    fn unrecognized(&mut self, _id: &NoteId, url: &str) {
        if !self.json {
            output::warning(&format!("Skipping unknown format: {}", url));
        }
    }

    fn confirm(&mut self, count: usize) -> vinotes_core::domain::result::Result<bool> {
        self.announce(count);
        let answer = self.read_answer().map_err(Error::Io)?;
        Ok(is_affirmative(&answer))
    }

    fn applying(&mut self, count: usize) {
        self.announce(count);
        if !self.json {
            println!("Updating records...");
        }
    }

    fn updated(&mut self, update: &PendingUpdate) {
        log_event(
            self.logger,
            LogEvent::new("update_applied")
                .with_command("normalize")
                .with_target(self.table.clone())
                .with_record(update.id.to_string())
                .with_detail(update.new_url.clone()),
        );
        if !self.json {
            println!("Updated ID {}", update.id);
        }
    }

    fn update_failed(&mut self, update: &PendingUpdate, error: &str) {
        log_event(
            self.logger,
            LogEvent::new("update_failed")
                .with_command("normalize")
                .with_target(self.table.clone())
                .with_record(update.id.to_string())
                .with_error(error),
        );
        if !self.json {
            output::error(&format!("Failed to update ID {}: {}", update.id, error));
        }
    }
}

pub fn run(env_file: Option<&Path>, args: NormalizeArgs) -> Result<()> {
    let target = ImageTarget::new(&args.table, &args.id_column, &args.url_column);
    let ctx = get_context(env_file, target)?;
    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command("normalize"));

    let options = NormalizeOptions {
        rules: RewriteRules {
            strip_api_origin: args.strip_api_origin,
        },
        dry_run: args.dry_run,
        assume_yes: args.yes,
    };

    let mut console = TerminalConsole {
        json: args.json,
        table: args.table.clone(),
        logger: &logger,
        announced: false,
    };

    let summary = match ctx.normalize_service.run(options, &mut console) {
        Ok(summary) => summary,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("scan_failed")
                    .with_command("normalize")
                    .with_target(args.table.clone())
                    .with_error(e.to_string()),
            );
            return Err(e.into());
        }
    };

    log_event(
        &logger,
        LogEvent::new("scan_completed")
            .with_command("normalize")
            .with_target(summary.table.clone())
            .with_detail(format!(
                "scanned={} queued={} unrecognized={}",
                summary.scan.scanned,
                summary.scan.updates.len(),
                summary.scan.unrecognized.len()
            )),
    );
    if summary.outcome == RunOutcome::Declined {
        log_event(
            &logger,
            LogEvent::new("run_declined")
                .with_command("normalize")
                .with_target(summary.table.clone()),
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print_outcome(&summary);
    Ok(())
}

fn print_outcome(summary: &NormalizeSummary) {
    match &summary.outcome {
        RunOutcome::NothingToNormalize => {
            output::success("No URLs needed normalization.");
        }
        RunOutcome::DryRun => {
            println!();
            println!("Found {} records to update.", summary.scan.updates.len());
            output::info("Dry run: no records were changed.");
        }
        RunOutcome::Declined => {
            println!("Aborted.");
        }
        RunOutcome::Applied { failed, .. } => {
            if !failed.is_empty() {
                output::warning(&format!(
                    "{} of {} updates failed.",
                    failed.len(),
                    summary.scan.updates.len()
                ));
            }
            output::success("Done.");
        }
    }
}
