//! Tasting note domain model

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Identifier of a stored record
///
/// PostgREST returns integer primary keys as JSON numbers and UUID keys as
/// strings. Both are kept as their textual form, which is also what the
/// `eq.` filter of an update expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build an id from a raw JSON value (number or string)
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Number(n) => Some(Self(n.to_string())),
            JsonValue::String(s) if !s.is_empty() => Some(Self(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for NoteId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<i32> for NoteId {
    fn from(id: i32) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for NoteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A tasting note as seen by the maintenance tools: its id and image URL.
/// Every other column is owned by the application and never touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TastingNote {
    pub id: NoteId,
    pub image_url: Option<String>,
}

impl TastingNote {
    pub fn new(id: impl Into<NoteId>, image_url: Option<&str>) -> Self {
        Self {
            id: id.into(),
            image_url: image_url.map(str::to_string),
        }
    }
}
