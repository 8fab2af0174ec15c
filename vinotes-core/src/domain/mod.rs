//! Core domain entities
//!
//! Plain data structures describing what the maintenance tools read and
//! write. No I/O happens here.

mod note;
mod target;
mod update;
pub mod result;

pub use note::{NoteId, TastingNote};
pub use target::ImageTarget;
pub use update::PendingUpdate;
