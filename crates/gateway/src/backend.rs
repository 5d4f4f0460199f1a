//! The backend seam: one trait, one HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use proto::{
    AgentReply, BackendRequest, GatewayError, HEALTH_PATH, RESUME_PATH, START_PATH, ResumeRequest,
    StartRequest,
};
use serde::Serialize;
use tracing::{debug, warn};

/// A research-agent backend reachable through the start/resume pair.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Base URL, used in logs and in the unreachable bubble.
    fn base_url(&self) -> &str;

    /// Opens a new research thread.
    async fn start(&self, request: &StartRequest) -> Result<AgentReply, GatewayError>;

    /// Continues a thread that is waiting for the user.
    async fn resume(&self, request: &ResumeRequest) -> Result<AgentReply, GatewayError>;

    /// Liveness probe.
    async fn health(&self) -> Result<(), GatewayError>;

    /// Sends whichever call the controller asked for.
    async fn dispatch(&self, request: &BackendRequest) -> Result<AgentReply, GatewayError> {
        match request {
            BackendRequest::Start(r) => self.start(r).await,
            BackendRequest::Resume(r) => self.resume(r).await,
        }
    }
}

/// JSON-over-HTTP backend.
///
/// The response status code is not interpreted: any body that parses as an
/// [`AgentReply`] is the reply, everything else is a transport failure.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Backend at `base_url` with no request timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Backend at `base_url`; `timeout` bounds every request when set.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, GatewayError> {
        let base_url = base_url.into();
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| GatewayError::Unreachable {
            url: base_url.clone(),
            reason: format!("failed to build HTTP client: {e}"),
        })?;
        Ok(Self::with_client(client, base_url))
    }

    /// Backend sharing an existing client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn unreachable(&self, e: reqwest::Error) -> GatewayError {
        GatewayError::Unreachable {
            url: self.base_url.clone(),
            reason: e.to_string(),
        }
    }

    async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<AgentReply, GatewayError> {
        let url = self.endpoint(path);
        debug!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.unreachable(e))?;

        let reply = AgentReply::from_body(&text).map_err(|e| GatewayError::InvalidResponse {
            url: self.base_url.clone(),
            reason: format!("HTTP {}: {e}", status.as_u16()),
        })?;
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Backend replied with a non-success status");
        }
        debug!(%url, status = ?reply.status, "Reply received");
        Ok(reply)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn start(&self, request: &StartRequest) -> Result<AgentReply, GatewayError> {
        self.post(START_PATH, request).await
    }

    async fn resume(&self, request: &ResumeRequest) -> Result<AgentReply, GatewayError> {
        self.post(RESUME_PATH, request).await
    }

    async fn health(&self) -> Result<(), GatewayError> {
        let url = self.endpoint(HEALTH_PATH);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(GatewayError::Status {
                url: self.base_url.clone(),
                status: status.as_u16(),
            })
        }
    }
}
