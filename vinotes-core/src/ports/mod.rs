//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The services
//! depend only on these traits, not on the REST client or the terminal.

mod console;
mod note_store;

pub use console::OperatorConsole;
pub use note_store::NoteStore;
