//! Which table and columns the URL normalizer works on

use serde::{Deserialize, Serialize};

/// Table plus id/URL column names addressed by the normalizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageTarget {
    pub table: String,
    pub id_column: String,
    pub url_column: String,
}

impl ImageTarget {
    pub fn new(
        table: impl Into<String>,
        id_column: impl Into<String>,
        url_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            id_column: id_column.into(),
            url_column: url_column.into(),
        }
    }
}

impl Default for ImageTarget {
    fn default() -> Self {
        Self::new("tasting_notes", "id", "image_url")
    }
}
