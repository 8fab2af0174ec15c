//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - PostgREST HTTP client for the NoteStore port
//! - In-memory NoteStore, a test double for the services (unused by the CLI)

pub mod memory;
pub mod postgrest;

#[cfg(test)]
pub mod postgrest_mock;
