//! Pending update produced by the scan phase

use serde::Serialize;

use super::NoteId;

/// A rewrite that has been decided but not yet written
///
/// Lives only between the scan and apply phases of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingUpdate {
    pub id: NoteId,
    pub old_url: String,
    pub new_url: String,
}
