use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::FutureExt;
use reqwest::{Response, StatusCode};
use roster_types::{RecordId, StudentFields, StudentRecord};

use super::{RecordStore, StoreFuture};
use crate::channel::Connector;
use crate::config::StoreConfig;
use crate::error::{ClientResult, StoreError, StoreResult};
use crate::identity::Identity;

/// JSON-over-HTTP record store.
///
/// Authenticated stores send `Authorization: Bearer <token>`; anonymous ones
/// send no credentials.
#[derive(Clone)]
pub struct HttpRecordStore {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for HttpRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRecordStore")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl HttpRecordStore {
    pub fn new(http: reqwest::Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn students_url(&self) -> String {
        format!("{}/students", self.base_url)
    }

    fn student_url(&self, id: RecordId) -> String {
        format!("{}/students/{id}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> StoreResult<Response> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await.map_err(classify_reqwest_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => StoreError::not_found(what),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                StoreError::unauthorized(format!("HTTP {}: access denied", status.as_u16()))
            }
            _ => StoreError::http_status(status.as_u16(), &body),
        })
    }
}

impl RecordStore for HttpRecordStore {
    fn list(&self) -> StoreFuture<'_, Vec<StudentRecord>> {
        async move {
            let response = self
                .send(self.http.get(self.students_url()), "students")
                .await?;
            let body = response.text().await.map_err(classify_reqwest_error)?;
            serde_json::from_str(&body)
                .map_err(|e| StoreError::parse(format!("Invalid student list: {e}")))
        }
        .boxed()
    }

    fn create(&self, fields: StudentFields) -> StoreFuture<'_, ()> {
        async move {
            self.send(self.http.post(self.students_url()).json(&fields), "students")
                .await?;
            Ok(())
        }
        .boxed()
    }

    fn update(&self, id: RecordId, fields: StudentFields) -> StoreFuture<'_, ()> {
        async move {
            let what = format!("student {id}");
            self.send(self.http.put(self.student_url(id)).json(&fields), &what)
                .await?;
            Ok(())
        }
        .boxed()
    }

    fn delete(&self, id: RecordId) -> StoreFuture<'_, ()> {
        async move {
            let what = format!("student {id}");
            self.send(self.http.delete(self.student_url(id)), &what)
                .await?;
            Ok(())
        }
        .boxed()
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::transport(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        StoreError::transport(format!("Connection failed: {e}"))
    } else if e.is_decode() {
        StoreError::parse(format!("Invalid response body: {e}"))
    } else {
        StoreError::transport(format!("Network error: {e}"))
    }
}

/// Builds [`HttpRecordStore`]s against one base URL, sharing a connection pool.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    http: reqwest::Client,
    base_url: String,
}

impl HttpConnector {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        url::Url::parse(base_url)
            .with_context(|| format!("Invalid record store URL '{base_url}'"))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::new(&config.url, config.timeout())
    }
}

impl Connector for HttpConnector {
    fn connect(&self, identity: Option<&Identity>) -> ClientResult<Arc<dyn RecordStore>> {
        Ok(Arc::new(HttpRecordStore::new(
            self.http.clone(),
            &self.base_url,
            identity.map(|id| id.token().to_string()),
        )))
    }
}
