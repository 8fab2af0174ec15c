//! Normalize service - rewrite absolute image URLs into relative API paths
//!
//! Legacy records point straight at the storage bucket
//! (`https://storage.googleapis.com/<bucket>/uploads/2024/01/file.jpg`); the
//! application now serves images through `/api/images/<object key>`. A run
//! has three phases:
//!
//! 1. scan: fetch every record with an image URL and decide a rewrite per URL
//! 2. confirm: ask the operator once, unless nothing was queued
//! 3. apply: write each rewrite on its own; a failure never stops the rest

use std::sync::Arc;

use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::{NoteId, PendingUpdate};
use crate::ports::{NoteStore, OperatorConsole};

/// Start of every object key written by the upload endpoint
pub const UPLOADS_MARKER: &str = "uploads/";

/// Route that streams objects out of the bucket
pub const API_IMAGES_PREFIX: &str = "/api/images/";

/// Anything starting with this is treated as an absolute URL
const HTTP_PREFIX: &str = "http";

/// Optional rewrite rules beyond the `uploads/` marker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RewriteRules {
    /// Also turn `https://<host>/api/images/<key>` into `/api/images/<key>`
    pub strip_api_origin: bool,
}

/// What to do with one stored URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlDisposition {
    /// Empty string, nothing to do
    Empty,
    /// Not an absolute URL; assumed to be relative already
    Relative,
    /// Replace with this value
    Rewrite(String),
    /// Absolute URL with no recognised shape
    Unrecognized,
}

/// Decide how a stored URL is rewritten
pub fn classify_url(url: &str, rules: RewriteRules) -> UrlDisposition {
    if url.is_empty() {
        return UrlDisposition::Empty;
    }

    if !url.starts_with(HTTP_PREFIX) {
        return UrlDisposition::Relative;
    }

    if let Some(idx) = url.find(UPLOADS_MARKER) {
        return UrlDisposition::Rewrite(format!("{}{}", API_IMAGES_PREFIX, &url[idx..]));
    }

    if rules.strip_api_origin {
        if let Some(idx) = url.find(API_IMAGES_PREFIX).filter(|&idx| idx > 0) {
            return UrlDisposition::Rewrite(url[idx..].to_string());
        }
    }

    UrlDisposition::Unrecognized
}

/// Rewrite with the default rules; `None` when the URL is left as it is
pub fn normalize_url(url: &str) -> Option<String> {
    match classify_url(url, RewriteRules::default()) {
        UrlDisposition::Rewrite(new_url) => Some(new_url),
        _ => None,
    }
}

/// Only `y` / `Y` confirms; anything else, including an empty line or a
/// padded ` y `, declines. The line terminator is not part of the answer.
pub fn is_affirmative(answer: &str) -> bool {
    answer
        .trim_end_matches(['\n', '\r'])
        .eq_ignore_ascii_case("y")
}

/// Options for one run
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    pub rules: RewriteRules,
    /// Stop after the scan; never prompt, never write
    pub dry_run: bool,
    /// Treat the confirmation as already given
    pub assume_yes: bool,
}

/// An absolute URL that was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedUrl {
    pub id: NoteId,
    pub url: String,
}

/// Result of the scan phase
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Records returned by the store
    pub scanned: usize,
    pub already_relative: usize,
    pub unrecognized: Vec<SkippedUrl>,
    /// Rewrites in the order they were found
    pub updates: Vec<PendingUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedUpdate {
    pub id: NoteId,
    pub error: String,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    NothingToNormalize,
    DryRun,
    Declined,
    Applied {
        updated: Vec<NoteId>,
        failed: Vec<FailedUpdate>,
    },
}

/// Everything a run did, for display or JSON output
#[derive(Debug, Clone, Serialize)]
pub struct NormalizeSummary {
    pub table: String,
    #[serde(flatten)]
    pub scan: ScanReport,
    pub outcome: RunOutcome,
}

impl NormalizeSummary {
    /// Number of writes that failed (zero unless the run applied updates)
    pub fn failed_count(&self) -> usize {
        match &self.outcome {
            RunOutcome::Applied { failed, .. } => failed.len(),
            _ => 0,
        }
    }
}

/// Normalize service
pub struct NormalizeService {
    store: Arc<dyn NoteStore>,
}

impl NormalizeService {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }

    /// Fetch every record with an image URL and decide what to rewrite
    pub fn scan(&self, rules: RewriteRules, console: &mut dyn OperatorConsole) -> Result<ScanReport> {
        console.fetching();
        let notes = self.store.fetch_with_image_url()?;

        let mut report = ScanReport {
            scanned: notes.len(),
            ..Default::default()
        };

        for note in notes {
            let Some(url) = note.image_url else {
                continue;
            };

            match classify_url(&url, rules) {
                UrlDisposition::Empty => {}
                UrlDisposition::Relative => report.already_relative += 1,
                UrlDisposition::Rewrite(new_url) => {
                    let update = PendingUpdate {
                        id: note.id,
                        old_url: url,
                        new_url,
                    };
                    console.queued(&update);
                    report.updates.push(update);
                }
                UrlDisposition::Unrecognized => {
                    console.unrecognized(&note.id, &url);
                    report.unrecognized.push(SkippedUrl { id: note.id, url });
                }
            }
        }

        Ok(report)
    }

    /// Write each update independently, in order
    pub fn apply(&self, updates: &[PendingUpdate], console: &mut dyn OperatorConsole) -> RunOutcome {
        let mut updated = Vec::new();
        let mut failed = Vec::new();

        console.applying(updates.len());
        for update in updates {
            match self.store.update_image_url(&update.id, &update.new_url) {
                Ok(()) => {
                    console.updated(update);
                    updated.push(update.id.clone());
                }
                Err(e) => {
                    let error = e.to_string();
                    console.update_failed(update, &error);
                    failed.push(FailedUpdate {
                        id: update.id.clone(),
                        error,
                    });
                }
            }
        }

        RunOutcome::Applied { updated, failed }
    }

    /// Scan, confirm and apply
    ///
    /// The operator is only asked when at least one update was queued and
    /// neither `dry_run` nor `assume_yes` is set.
    pub fn run(
        &self,
        options: NormalizeOptions,
        console: &mut dyn OperatorConsole,
    ) -> Result<NormalizeSummary> {
        let scan = self.scan(options.rules, console)?;

        let outcome = if scan.updates.is_empty() {
            RunOutcome::NothingToNormalize
        } else if options.dry_run {
            RunOutcome::DryRun
        } else if !options.assume_yes && !console.confirm(scan.updates.len())? {
            RunOutcome::Declined
        } else {
            self.apply(&scan.updates, console)
        };

        Ok(NormalizeSummary {
            table: self.store.target().table.clone(),
            scan,
            outcome,
        })
    }
}
