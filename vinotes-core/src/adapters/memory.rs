//! In-memory note store
//!
//! A test double for the `NoteStore` port, not a production backend: the
//! CLI never builds one. It holds records in a vector, records every write,
//! and can simulate fetch failures and per-id write failures. It is public
//! so the integration tests under `tests/` can drive the services through it.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::domain::result::{Error, Result};
use crate::domain::{ImageTarget, NoteId, TastingNote};
use crate::ports::NoteStore;

#[derive(Debug, Default)]
pub struct InMemoryNoteStore {
    target: ImageTarget,
    notes: Mutex<Vec<TastingNote>>,
    writes: Mutex<Vec<(NoteId, String)>>,
    failing_ids: HashSet<NoteId>,
    fetch_error: Option<String>,
}

impl InMemoryNoteStore {
    pub fn new(notes: Vec<TastingNote>) -> Self {
        Self {
            notes: Mutex::new(notes),
            ..Default::default()
        }
    }

    /// Make updates for these ids fail with a store error
    pub fn with_failing_ids<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<NoteId>,
    {
        self.failing_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Make every fetch fail with this message
    pub fn with_fetch_error(mut self, message: impl Into<String>) -> Self {
        self.fetch_error = Some(message.into());
        self
    }

    /// Snapshot of the stored records
    pub fn notes(&self) -> Vec<TastingNote> {
        self.notes.lock().map(|n| n.clone()).unwrap_or_default()
    }

    /// Every write attempted, in order, including failed ones
    pub fn writes(&self) -> Vec<(NoteId, String)> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn url_of(&self, id: impl Into<NoteId>) -> Option<String> {
        let id = id.into();
        self.notes()
            .into_iter()
            .find(|n| n.id == id)
            .and_then(|n| n.image_url)
    }
}

impl NoteStore for InMemoryNoteStore {
    fn target(&self) -> &ImageTarget {
        &self.target
    }

    fn fetch_with_image_url(&self) -> Result<Vec<TastingNote>> {
        if let Some(message) = &self.fetch_error {
            return Err(Error::store(message.clone()));
        }

        let notes = self
            .notes
            .lock()
            .map_err(|e| Error::store(format!("Lock poisoned: {}", e)))?;

        Ok(notes
            .iter()
            .filter(|n| n.image_url.is_some())
            .cloned()
            .collect())
    }

    fn update_image_url(&self, id: &NoteId, new_url: &str) -> Result<()> {
        self.writes
            .lock()
            .map_err(|e| Error::store(format!("Lock poisoned: {}", e)))?
            .push((id.clone(), new_url.to_string()));

        if self.failing_ids.contains(id) {
            return Err(Error::store(format!("simulated failure for {}", id)));
        }

        let mut notes = self
            .notes
            .lock()
            .map_err(|e| Error::store(format!("Lock poisoned: {}", e)))?;

        let note = notes
            .iter_mut()
            .find(|n| &n.id == id)
            .ok_or_else(|| Error::not_found(format!("no note with id {}", id)))?;
        note.image_url = Some(new_url.to_string());

        Ok(())
    }
}
