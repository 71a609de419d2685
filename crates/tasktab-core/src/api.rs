use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::model::{TaskList, Task, TasksEnvelope};

/// Why a request to the task API did not produce a usable body.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded with {status}")]
    Status { status: StatusCode, body: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure of one of the two fetches. Network, auth and decoding problems
/// all surface through the same message.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to fetch lists. {0}")]
    Lists(#[source] TransportError),

    #[error("failed to fetch tasks. {0}")]
    Tasks(#[source] TransportError),
}

/// Where lists and tasks come from.
pub trait TaskSource: Send + Sync + 'static {
    fn fetch_lists(&self) -> impl Future<Output = Result<Vec<TaskList>, FetchError>> + Send;

    fn fetch_tasks(
        &self,
        list_id: u64,
    ) -> impl Future<Output = Result<Vec<Task>, FetchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    /// A missing token is sent as an empty bearer value and left for the
    /// server to reject.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tasktab/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed building HTTP client for task API")?;

        let token = token.unwrap_or_default();
        if token.is_empty() {
            warn!("no API token configured; requests will carry an empty bearer token");
        }

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET");

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.bearer())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(url = %url, %status, "task API returned an error status");
            return Err(TransportError::Status { status, body });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

impl TaskSource for ApiClient {
    #[instrument(skip(self))]
    async fn fetch_lists(&self) -> Result<Vec<TaskList>, FetchError> {
        let lists: Vec<TaskList> = self.get("/lists").await.map_err(FetchError::Lists)?;
        debug!(count = lists.len(), "fetched lists");
        Ok(lists)
    }

    #[instrument(skip(self))]
    async fn fetch_tasks(&self, list_id: u64) -> Result<Vec<Task>, FetchError> {
        let envelope: TasksEnvelope = self
            .get(&format!("/lists/{list_id}/tasks"))
            .await
            .map_err(FetchError::Tasks)?;
        debug!(list_id, count = envelope.tasks.len(), "fetched tasks");
        Ok(envelope.tasks)
    }
}
