// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use billed_app::{
    BillRecord, BillStore, CreateRequest, CreatedFile, StoreError, StoreResult, UpdateRequest,
};
use reqwest::StatusCode;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5678";

/// Blocking client for the bills back end.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    token: Option<String>,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let parsed =
            Url::parse(trimmed).with_context(|| format!("api.base_url {trimmed:?} is not a URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            bail!("api.base_url {trimmed:?} must be an http:// or https:// URL");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url: parsed,
            timeout,
            token: None,
            http,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|token| !token.trim().is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Exchanges credentials for a session token.
    pub fn login(&self, email: &str, password: &str) -> Result<String> {
        let url = self.endpoint(&["auth", "login"])?;
        debug!(%email, "signing in");
        let response = self
            .http
            .post(url)
            .json(&LoginRequest { email, password })
            .send()
            .map_err(|error| connection_error(self.base_url(), &error))?;
        let parsed: LoginResponse = decode(check_status(response)?, "login response")?;
        if parsed.jwt.trim().is_empty() {
            bail!("login response carried an empty token");
        }
        Ok(parsed.jwt)
    }

    fn endpoint(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                StoreError::Unreachable(format!("base URL {} cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = self
            .authorized(request)
            .send()
            .map_err(|error| connection_error(self.base_url(), &error))?;
        check_status(response)
    }
}

impl BillStore for Client {
    fn list(&mut self) -> StoreResult<Vec<BillRecord>> {
        let url = self.endpoint(&["bills"])?;
        debug!(%url, "listing bills");
        let response = self.send(self.http.get(url))?;
        decode(response, "bill list")
    }

    fn update(&mut self, request: &UpdateRequest) -> StoreResult<BillRecord> {
        let url = self.endpoint(&["bills", request.selector.as_str()])?;
        debug!(%url, "updating bill");
        let response = self.send(
            self.http
                .patch(url)
                .header(CONTENT_TYPE, "application/json")
                .body(request.data.clone()),
        )?;
        decode(response, "updated bill")
    }

    fn create(&mut self, request: &CreateRequest) -> StoreResult<CreatedFile> {
        let url = self.endpoint(&["bills"])?;
        debug!(%url, file = %request.file_name, "uploading receipt");
        let part = Part::bytes(request.data.clone())
            .file_name(request.file_name.clone())
            .mime_str(&request.mime_type)
            .map_err(|error| {
                StoreError::Decode(format!("invalid mime type {:?}: {error}", request.mime_type))
            })?;
        let form = Form::new()
            .part("file", part)
            .text("email", request.email.clone());
        let response = self.send(self.http.post(url).multipart(form))?;
        let created: CreatedResponse = decode(response, "upload response")?;
        Ok(CreatedFile {
            file_url: created.file_url,
            key: created.key.into(),
        })
    }
}

fn check_status(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(clean_error_response(status, &body))
}

fn decode<T: DeserializeOwned>(response: Response, what: &str) -> StoreResult<T> {
    response
        .json()
        .map_err(|error| StoreError::Decode(format!("decode {what}: {error}")))
}

fn connection_error(base_url: &str, error: &reqwest::Error) -> StoreError {
    StoreError::Unreachable(format!(
        "cannot reach {base_url} -- start the bills back end or fix api.base_url ({error})"
    ))
}

/// Uses the `message` of a JSON error body when there is one, else `Erreur {status}`.
fn clean_error_response(status: StatusCode, body: &str) -> StoreError {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.message
        && !message.trim().is_empty()
    {
        return StoreError::with_message(status.as_u16(), message);
    }
    StoreError::status(status.as_u16())
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    jwt: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedResponse {
    file_url: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
}
