// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client as HttpClient, Response};
use roster_app::{Record, RecordId, RecordPatch, UpdateOutcome};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const STUDENTS_PATH: &str = "/api/students";
pub const CSV_IMPORT_PATH: &str = "/api/csv/import";
pub const CSV_FIELD_NAME: &str = "csvFile";

/// Connection settings handed to the client at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: String,
    timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let parsed =
            Url::parse(trimmed).with_context(|| format!("api.base_url {trimmed:?} is not a URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "api.base_url {trimmed:?} must use http or https, got {}",
                parsed.scheme()
            );
        }
        if timeout.is_zero() {
            bail!("api.timeout must be positive");
        }
        Ok(Self {
            base_url: trimmed.to_owned(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    config: ApiConfig,
    http: HttpClient,
}

impl Client {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout())
            .build()
            .context("build HTTP client")?;
        Ok(Self { config, http })
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    pub fn list_records(&self) -> Result<Vec<Record>> {
        let url = self.students_url();
        tracing::debug!(event = "roster.api.list", url = %url);
        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;
        let response = ensure_success(response)?;
        response.json().context("decode student list")
    }

    /// Sends the set fields of `patch`. A successful response without a
    /// decodable `student` object is reported as `UpdateOutcome::ShapeError`.
    pub fn update_record(&self, patch: &RecordPatch) -> Result<UpdateOutcome> {
        let url = self.record_url(patch.id())?;
        tracing::debug!(event = "roster.api.update", url = %url);
        let response = self
            .http
            .put(&url)
            .json(patch.body())
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;
        let response = ensure_success(response)?;
        let body = response.text().context("read update response")?;
        let raw = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));
        Ok(UpdateOutcome::from_response(raw))
    }

    pub fn delete_record(&self, id: &RecordId) -> Result<()> {
        let url = self.record_url(id)?;
        tracing::debug!(event = "roster.api.delete", url = %url);
        let response = self
            .http
            .delete(&url)
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;
        ensure_success(response)?;
        Ok(())
    }

    pub fn import_csv(&self, path: &Path) -> Result<Value> {
        let part = Part::file(path)
            .with_context(|| format!("open CSV file {}", path.display()))?
            .mime_str("text/csv")
            .context("set CSV content type")?;
        let form = Form::new().part(CSV_FIELD_NAME, part);

        let url = format!("{}{CSV_IMPORT_PATH}", self.base_url());
        tracing::debug!(event = "roster.api.import", url = %url, path = %path.display());
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;
        let response = ensure_success(response)?;
        let body = response.text().context("read import response")?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).context("decode import response")
    }

    fn students_url(&self) -> String {
        format!("{}{STUDENTS_PATH}", self.base_url())
    }

    /// The id is pushed as a single escaped path segment, whatever its text.
    fn record_url(&self, id: &RecordId) -> Result<String> {
        let mut url = Url::parse(&self.students_url()).context("parse students URL")?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("api.base_url {} cannot carry a path", self.base_url()))?
            .push(&id.to_string());
        Ok(url.into())
    }
}

fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(clean_error_response(status, &body))
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check [api].base_url and that the server is running ({})",
        base_url,
        error
    )
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
    message: Option<String>,
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.error.or(parsed.message)
        && !message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), trimmed);
    }

    anyhow!("server returned {}", status.as_u16())
}
