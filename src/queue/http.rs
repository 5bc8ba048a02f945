use super::{QueueClient, SECRET_HEADER};
use crate::config::SyncConfig;
use crate::core::{Command, DueQueue, Result, SyncError};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{Level, event};

#[derive(Debug, Deserialize)]
struct OnlineCommandsResponse {
    #[serde(default)]
    commands: Vec<Command>,
}

#[derive(Debug, Serialize)]
struct AcknowledgeRequest<'a> {
    ids: &'a [i64],
}

/// `QueueClient` talking to the Tebex plugin API over HTTP.
///
/// Every request carries the store secret in `X-Tebex-Secret`.
#[derive(Debug, Clone)]
pub struct HttpQueueClient {
    base_url: String,
    client: Client,
}

impl HttpQueueClient {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        config.validate().map_err(SyncError::Config)?;

        let mut secret = HeaderValue::from_str(&config.secret)
            .map_err(|err| SyncError::Config(format!("invalid secret header value: {}", err)))?;
        secret.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(SECRET_HEADER, secret);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| SyncError::Config(format!("failed to build HTTP client: {}", err)))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn queue_url(&self) -> String {
        format!("{}/queue", self.base_url)
    }

    fn commands_url(&self, entry_id: i64) -> String {
        format!("{}/queue/onlineCommands/{}", self.base_url, entry_id)
    }

    fn ensure_success(operation: &str, response: &reqwest::Response) -> Result<()> {
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::status(operation, status.as_u16()));
        }
        Ok(())
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        operation: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|err| SyncError::Decode(format!("{}: {}", operation, err)))
    }
}

#[async_trait]
impl QueueClient for HttpQueueClient {
    async fn fetch_due(&self) -> Result<DueQueue> {
        const OPERATION: &str = "GET /queue";
        let response = self.client.get(self.queue_url()).send().await?;
        Self::ensure_success(OPERATION, &response)?;
        let queue: DueQueue = Self::decode(OPERATION, response).await?;
        event!(Level::DEBUG, entries = queue.entries.len(), "queue fetched");
        Ok(queue)
    }

    async fn fetch_commands_for(&self, entry_id: i64) -> Result<Vec<Command>> {
        const OPERATION: &str = "GET /queue/onlineCommands";
        let response = self.client.get(self.commands_url(entry_id)).send().await?;
        Self::ensure_success(OPERATION, &response)?;
        let body: OnlineCommandsResponse = Self::decode(OPERATION, response).await?;
        Ok(body.commands)
    }

    async fn acknowledge(&self, command_ids: &[i64]) -> Result<()> {
        if command_ids.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .delete(self.queue_url())
            .json(&AcknowledgeRequest { ids: command_ids })
            .send()
            .await?;
        Self::ensure_success("DELETE /queue", &response)?;
        event!(Level::DEBUG, count = command_ids.len(), "commands acknowledged");
        Ok(())
    }
}
