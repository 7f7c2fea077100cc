//! PostgREST-style HTTP implementation of the remote note service.

use std::env;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::{
    CredentialProvider, FetchShape, RemoteError, RemoteNoteService, RemoteResult,
    StaticCredentials,
};
use crate::models::{NoteId, RemoteNoteRecord};
use crate::{Error, Result};

const ENV_API_URL: &str = "NOTESYNC_API_URL";
const ENV_API_KEY: &str = "NOTESYNC_API_KEY";
const ENV_ACCESS_TOKEN: &str = "NOTESYNC_ACCESS_TOKEN";
const ENV_NOTES_TABLE: &str = "NOTESYNC_NOTES_TABLE";
const ENV_TIMEOUT_SECS: &str = "NOTESYNC_TIMEOUT_SECS";

const DEFAULT_NOTES_TABLE: &str = "notes";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_ERROR_BODY_CHARS: usize = 180;

/// Columns returned by a minimal fetch.
const METADATA_COLUMNS: &[&str] = &[
    "id",
    "owner_id",
    "title",
    "source_type",
    "created_at",
    "last_modified",
    "is_favorite",
    "processing_status",
    "transcript",
    "citations",
    "key_points",
    "tags",
    "duration_ms",
    "language_code",
    "source_url",
    "video_id",
    "folder_id",
];

/// Connection settings for [`RestNoteService`]
#[derive(Clone, PartialEq, Eq)]
pub struct RestConfig {
    /// Base URL of the backend, e.g. `https://project.supabase.co`
    pub base_url: String,
    /// Public API key sent as the `apikey` header
    pub api_key: String,
    /// Bearer token; the API key is used when absent
    pub access_token: Option<String>,
    /// Notes table name
    pub table: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for RestConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RestConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("table", &self.table)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RestConfig {
    /// Create a configuration with default table and timeout.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let api_key = non_blank(Some(api_key.into()))
            .ok_or_else(|| Error::InvalidInput("API key must not be empty".to_string()))?;
        Ok(Self {
            base_url,
            api_key,
            access_token: None,
            table: DEFAULT_NOTES_TABLE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = non_blank(Some(token.into()));
        self
    }

    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        if let Some(table) = non_blank(Some(table.into())) {
            self.table = table;
        }
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when no variables are set.
    /// Returns an error when only a partial configuration is provided.
    pub fn from_env() -> Result<Option<Self>> {
        parse_config(|key| env::var(key).ok())
    }

    /// Endpoint of the notes collection.
    #[must_use]
    pub fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.base_url,
            urlencoding::encode(&self.table)
        )
    }
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<RestConfig>> {
    let base_url = non_blank(lookup(ENV_API_URL));
    let api_key = non_blank(lookup(ENV_API_KEY));
    let access_token = non_blank(lookup(ENV_ACCESS_TOKEN));
    let table = non_blank(lookup(ENV_NOTES_TABLE));
    let timeout = non_blank(lookup(ENV_TIMEOUT_SECS));

    let any_present = base_url.is_some()
        || api_key.is_some()
        || access_token.is_some()
        || table.is_some()
        || timeout.is_some();
    if !any_present {
        return Ok(None);
    }

    let (Some(base_url), Some(api_key)) = (base_url.clone(), api_key.clone()) else {
        let mut missing = Vec::new();
        if base_url.is_none() {
            missing.push(ENV_API_URL);
        }
        if api_key.is_none() {
            missing.push(ENV_API_KEY);
        }
        return Err(Error::InvalidInput(format!(
            "Remote configuration is incomplete. Missing: {}",
            missing.join(", ")
        )));
    };

    let mut config = RestConfig::new(base_url, api_key)?;
    if let Some(token) = access_token {
        config = config.with_access_token(token);
    }
    if let Some(table) = table {
        config = config.with_table(table);
    }
    if let Some(timeout) = timeout {
        let seconds = timeout.parse::<u64>().map_err(|_| {
            Error::InvalidInput(format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds"))
        })?;
        config = config.with_timeout(Duration::from_secs(seconds));
    }
    Ok(Some(config))
}

/// Trimmed value, or `None` when blank.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn normalize_base_url(raw: String) -> Result<String> {
    let url = non_blank(Some(raw))
        .ok_or_else(|| Error::InvalidInput("API URL must not be empty".to_string()))?;
    if ["http://", "https://"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
    {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "API URL must include http:// or https://".to_string(),
        ))
    }
}

/// Remote note service over a PostgREST endpoint (`{base}/rest/v1/{table}`).
#[derive(Clone)]
pub struct RestNoteService<C = StaticCredentials> {
    config: RestConfig,
    client: reqwest::Client,
    credentials: C,
}

impl RestNoteService<StaticCredentials> {
    /// Build a service that authenticates with the configured access token,
    /// falling back to the API key.
    pub fn from_config(config: RestConfig) -> Result<Self> {
        let token = config
            .access_token
            .clone()
            .unwrap_or_else(|| config.api_key.clone());
        Self::new(config, StaticCredentials::new(token))
    }
}

impl<C: CredentialProvider> RestNoteService<C> {
    pub fn new(config: RestConfig, credentials: C) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| Error::InvalidInput(format!("failed to build HTTP client: {error}")))?;
        Ok(Self {
            config,
            client,
            credentials,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &RestConfig {
        &self.config
    }

    async fn request(&self, method: Method) -> RemoteResult<RequestBuilder> {
        let token = self.credentials.access_token().await?;
        Ok(self
            .client
            .request(method, self.config.table_url())
            .header("apikey", &self.config.api_key)
            .header(ACCEPT, "application/json")
            .bearer_auth(token))
    }

    async fn send(request: RequestBuilder) -> RemoteResult<Response> {
        let response = request.send().await?;
        ensure_success(response).await
    }
}

fn row_filter(id: NoteId, owner_id: &str) -> [(&'static str, String); 2] {
    [
        ("id", format!("eq.{id}")),
        ("owner_id", format!("eq.{owner_id}")),
    ]
}

impl<C: CredentialProvider> RemoteNoteService for RestNoteService<C> {
    async fn note_exists(&self, id: NoteId, owner_id: &str) -> RemoteResult<bool> {
        let request = self
            .request(Method::GET)
            .await?
            .query(&row_filter(id, owner_id))
            .query(&[("select", "id"), ("limit", "1")]);
        let rows = Self::send(request)
            .await?
            .json::<Vec<serde_json::Value>>()
            .await?;
        Ok(!rows.is_empty())
    }

    async fn insert_note(&self, row: &RemoteNoteRecord) -> RemoteResult<()> {
        let request = self
            .request(Method::POST)
            .await?
            .header("Prefer", "return=minimal")
            .json(row);
        Self::send(request).await?;
        Ok(())
    }

    async fn update_note(&self, row: &RemoteNoteRecord) -> RemoteResult<()> {
        let request = self
            .request(Method::PATCH)
            .await?
            .query(&row_filter(row.id, &row.owner_id))
            .header("Prefer", "return=minimal")
            .json(row);
        Self::send(request).await?;
        Ok(())
    }

    async fn delete_note(&self, id: NoteId, owner_id: &str) -> RemoteResult<()> {
        let request = self
            .request(Method::DELETE)
            .await?
            .query(&row_filter(id, owner_id))
            .header("Prefer", "return=minimal");
        Self::send(request).await?;
        Ok(())
    }

    fn supports_atomic_upsert(&self) -> bool {
        true
    }

    async fn upsert_note(&self, row: &RemoteNoteRecord) -> RemoteResult<()> {
        let request = self
            .request(Method::POST)
            .await?
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row);
        Self::send(request).await?;
        Ok(())
    }

    async fn fetch_notes(
        &self,
        owner_id: &str,
        shape: FetchShape,
    ) -> RemoteResult<Vec<RemoteNoteRecord>> {
        let columns = match shape {
            FetchShape::Minimal => METADATA_COLUMNS.join(","),
            FetchShape::Complete => "*".to_string(),
        };
        let request = self.request(Method::GET).await?.query(&[
            ("owner_id", format!("eq.{owner_id}")),
            ("select", columns),
            ("order", "last_modified.desc".to_string()),
        ]);
        let rows = Self::send(request)
            .await?
            .json::<Vec<RemoteNoteRecord>>()
            .await?;
        Ok(rows)
    }
}

async fn ensure_success(response: Response) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::from_status(
        status.as_u16(),
        parse_api_error(status, &body),
    ))
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    error: Option<String>,
    details: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return match payload.details.as_deref().map(str::trim) {
                Some(details) if !details.is_empty() => {
                    format!("{} - {} ({})", message.trim(), details, status.as_u16())
                }
                _ => format!("{} ({})", message.trim(), status.as_u16()),
            };
        }
    }

    let trimmed: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}
