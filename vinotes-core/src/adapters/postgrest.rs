//! PostgREST client
//!
//! Talks to the REST interface of the hosted database (`<endpoint>/rest/v1`).
//! Only the two requests the normalizer needs are implemented: a filtered,
//! paged read of the image column and a single-row update keyed by id.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use crate::config::Config;
use crate::domain::result::{Error as DomainError, Result as DomainResult};
use crate::domain::{ImageTarget, NoteId, TastingNote};
use crate::ports::NoteStore;

/// Rows per read request; the hosted platform caps responses at 1000 rows
pub const DEFAULT_PAGE_SIZE: usize = 1000;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Error body returned by PostgREST
#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

impl PostgrestErrorBody {
    fn describe(&self) -> Option<String> {
        let message = self.message.as_deref()?;
        let mut text = message.to_string();
        if let Some(details) = self.details.as_deref().filter(|d| !d.is_empty()) {
            text.push_str(&format!(" ({})", details));
        }
        if let Some(hint) = self.hint.as_deref().filter(|h| !h.is_empty()) {
            text.push_str(&format!(" Hint: {}", hint));
        }
        Some(text)
    }
}

/// Blocking PostgREST client bound to one table
#[derive(Debug)]
pub struct PostgrestClient {
    client: Client,
    rest_url: String,
    api_key: String,
    target: ImageTarget,
    page_size: usize,
}

impl PostgrestClient {
    /// Create a client for the configured project
    pub fn new(config: &Config, target: ImageTarget) -> Result<Self> {
        Self::with_rest_url(&config.rest_url(), config.api_key(), target)
    }

    /// Create a client against an explicit REST base URL
    pub fn with_rest_url(rest_url: &str, api_key: &str, target: ImageTarget) -> Result<Self> {
        if api_key.is_empty() {
            anyhow::bail!("Supabase key cannot be empty");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            rest_url: rest_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            target,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Override the number of rows requested per page
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn table_url(&self) -> String {
        format!("{}/{}", self.rest_url, self.target.table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Fetch every row whose URL column is not null, page by page
    ///
    /// A short page does not mean the end: the server's `max-rows` cap may
    /// be below the page size. Only an empty page (or HTTP 416) ends the
    /// scan.
    pub fn fetch_notes(&self) -> Result<Vec<TastingNote>> {
        let mut notes = Vec::new();
        let mut offset = 0;

        loop {
            let rows = self.fetch_page(offset)?;
            let count = rows.len();
            if count == 0 {
                break;
            }

            for row in rows {
                notes.push(self.map_row(&row)?);
            }

            // Range header ignored; the whole result came back at once
            if count > self.page_size {
                break;
            }
            offset += count;
        }

        Ok(notes)
    }

    fn fetch_page(&self, offset: usize) -> Result<Vec<Map<String, JsonValue>>> {
        let select = format!("{},{}", self.target.id_column, self.target.url_column);
        let order = format!("{}.asc", self.target.id_column);
        let range = format!("{}-{}", offset, offset + self.page_size - 1);

        let request = self
            .client
            .get(self.table_url())
            .query(&[
                ("select", select.as_str()),
                (self.target.url_column.as_str(), "not.is.null"),
                ("order", order.as_str()),
            ])
            .header("Range-Unit", "items")
            .header("Range", range);

        let response = self
            .authorized(request)
            .send()
            .map_err(|e| self.map_request_error(e))?;

        // Asking for a range past the last row
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(Vec::new());
        }

        let response = self.check_response(response)?;

        response
            .json()
            .with_context(|| format!("Failed to parse rows from '{}'", self.target.table))
    }

    /// Set the URL column of the row with this id; returns the number of
    /// rows the server reports as changed.
    pub fn update_url(&self, id: &NoteId, new_url: &str) -> Result<usize> {
        let filter = format!("eq.{}", id);

        let mut body = Map::new();
        body.insert(
            self.target.url_column.clone(),
            JsonValue::String(new_url.to_string()),
        );

        let request = self
            .client
            .patch(self.table_url())
            .query(&[
                (self.target.id_column.as_str(), filter.as_str()),
                ("select", self.target.id_column.as_str()),
            ])
            .header("Prefer", "return=representation")
            .json(&body);

        let response = self
            .authorized(request)
            .send()
            .map_err(|e| self.map_request_error(e))?;

        let response = self.check_response(response)?;

        let changed: Vec<JsonValue> = response
            .json()
            .context("Failed to parse update response")?;

        Ok(changed.len())
    }

    fn map_row(&self, row: &Map<String, JsonValue>) -> Result<TastingNote> {
        let id = row
            .get(&self.target.id_column)
            .and_then(NoteId::from_json)
            .with_context(|| {
                format!(
                    "Row in '{}' has no usable '{}' value",
                    self.target.table, self.target.id_column
                )
            })?;

        let image_url = row
            .get(&self.target.url_column)
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(TastingNote { id, image_url })
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> anyhow::Error {
        if error.is_timeout() {
            anyhow::anyhow!("Connection timed out after {} seconds", REQUEST_TIMEOUT_SECS)
        } else if error.is_connect() {
            anyhow::anyhow!("Unable to connect to {}", self.rest_url)
        } else {
            anyhow::anyhow!("Supabase request failed: {}", error)
        }
    }

    /// Pass successful responses through; turn anything else into an error
    /// carrying the PostgREST message
    fn check_response(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let message = serde_json::from_str::<PostgrestErrorBody>(&body)
            .ok()
            .and_then(|e| e.describe())
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    status.canonical_reason().unwrap_or("unknown error").to_string()
                } else {
                    trimmed.to_string()
                }
            });

        match status.as_u16() {
            401 | 403 => anyhow::bail!(
                "Supabase authentication failed (HTTP {}): {}. \
                Check SUPABASE_SERVICE_ROLE_KEY / SUPABASE_ANON_KEY.",
                status.as_u16(),
                message
            ),
            code => anyhow::bail!("PostgREST error: HTTP {}: {}", code, message),
        }
    }
}

impl NoteStore for PostgrestClient {
    fn target(&self) -> &ImageTarget {
        &self.target
    }

    fn fetch_with_image_url(&self) -> DomainResult<Vec<TastingNote>> {
        self.fetch_notes()
            .map_err(|e| DomainError::store(format!("{:#}", e)))
    }

    fn update_image_url(&self, id: &NoteId, new_url: &str) -> DomainResult<()> {
        let changed = self
            .update_url(id, new_url)
            .map_err(|e| DomainError::store(format!("{:#}", e)))?;

        if changed == 0 {
            return Err(DomainError::not_found(format!(
                "no row in '{}' with {} = {} was updated (missing row or insufficient permissions)",
                self.target.table, self.target.id_column, id
            )));
        }

        Ok(())
    }
}
