//! Operator console port
//!
//! The normalizer reports what it finds and asks for confirmation through
//! this trait, so the confirmation rules can be exercised without a terminal.

use crate::domain::result::Result;
use crate::domain::{NoteId, PendingUpdate};

pub trait OperatorConsole {
    /// Called once before the store is queried
    fn fetching(&mut self) {}

    /// A rewrite was queued
    fn queued(&mut self, update: &PendingUpdate);

    /// An absolute URL had no recognised shape and was skipped
    fn unrecognized(&mut self, id: &NoteId, url: &str);

    /// Ask whether `count` queued updates should be written.
    ///
    /// Never called when nothing was queued.
    fn confirm(&mut self, count: usize) -> Result<bool>;

    /// Called once before the first write
    fn applying(&mut self, _count: usize) {}

    /// One update was written
    fn updated(&mut self, update: &PendingUpdate);

    /// One update failed; the run continues with the next one
    fn update_failed(&mut self, update: &PendingUpdate, error: &str);
}
