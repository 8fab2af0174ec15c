//! Tasting note store port

use crate::domain::result::Result;
use crate::domain::{ImageTarget, NoteId, TastingNote};

/// Read/write access to the records holding image URLs
///
/// The PostgREST adapter is the production implementation; the in-memory
/// adapter backs the service tests.
pub trait NoteStore {
    /// The table and columns this store addresses
    fn target(&self) -> &ImageTarget;

    /// Fetch every record whose image URL is not null
    fn fetch_with_image_url(&self) -> Result<Vec<TastingNote>>;

    /// Overwrite the image URL of exactly the record with this id
    ///
    /// Returns `Error::NotFound` when no record matched.
    fn update_image_url(&self, id: &NoteId, new_url: &str) -> Result<()>;
}
