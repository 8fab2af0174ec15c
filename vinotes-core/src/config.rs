//! Configuration management
//!
//! The tools need two values, both read from the environment:
//!
//! | value    | primary variable            | fallback                   |
//! |----------|-----------------------------|----------------------------|
//! | endpoint | `SUPABASE_URL`              | `NEXT_PUBLIC_SUPABASE_URL` |
//! | key      | `SUPABASE_SERVICE_ROLE_KEY` | `SUPABASE_ANON_KEY`        |
//!
//! An empty variable counts as unset. Values may be seeded from an env file
//! (`.env.local` by default); variables already in the process environment
//! take precedence over the file.

use std::fmt;
use std::path::Path;

use url::Url;

use crate::domain::result::{Error, Result};

/// Env file loaded when no other path is given
pub const DEFAULT_ENV_FILE: &str = ".env.local";

pub const URL_VARS: [&str; 2] = ["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"];
pub const KEY_VARS: [&str; 2] = ["SUPABASE_SERVICE_ROLE_KEY", "SUPABASE_ANON_KEY"];

const MISSING_MESSAGE: &str = "Supabase URL and Key are required.";

/// Connection settings for the hosted database
#[derive(Clone)]
pub struct Config {
    pub endpoint: Url,
    api_key: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Load the env file (if present) and read the configuration from the
    /// process environment.
    ///
    /// A missing env file is fine; a file that exists but cannot be parsed
    /// is reported.
    pub fn load(env_file: Option<&Path>) -> Result<Self> {
        let path = env_file.unwrap_or_else(|| Path::new(DEFAULT_ENV_FILE));
        match dotenvy::from_path(path) {
            Ok(()) => {}
            Err(e) if e.not_found() => {}
            Err(e) => {
                return Err(Error::config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        }
        Self::from_env()
    }

    /// Read the configuration from the process environment only
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = first_present(&lookup, &URL_VARS);
        let api_key = first_present(&lookup, &KEY_VARS);

        let (Some(endpoint), Some(api_key)) = (endpoint, api_key) else {
            return Err(Error::config(MISSING_MESSAGE));
        };

        Self::new(&endpoint, &api_key)
    }

    /// Build a configuration from explicit values
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self> {
        if endpoint.trim().is_empty() || api_key.trim().is_empty() {
            return Err(Error::config(MISSING_MESSAGE));
        }

        let endpoint = Url::parse(endpoint.trim())
            .map_err(|e| Error::config(format!("Invalid Supabase URL '{}': {}", endpoint, e)))?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Supabase URL must use http or https, got '{}'",
                endpoint.scheme()
            )));
        }

        Ok(Self {
            endpoint,
            api_key: api_key.trim().to_string(),
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Base URL of the PostgREST interface, without trailing slash
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.endpoint.as_str().trim_end_matches('/'))
    }

    /// Project reference for hosted projects (`<ref>.supabase.co`)
    pub fn project_ref(&self) -> Option<&str> {
        let host = self.endpoint.host_str()?;
        let project = host.strip_suffix(".supabase.co")?;
        if project.is_empty() || project.contains('.') {
            None
        } else {
            Some(project)
        }
    }

    /// Dashboard page where SQL can be run by hand
    pub fn sql_editor_url(&self) -> Option<String> {
        self.project_ref()
            .map(|project| format!("https://supabase.com/dashboard/project/{}/sql/new", project))
    }
}

fn first_present<F>(lookup: &F, names: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.trim().is_empty())
}
