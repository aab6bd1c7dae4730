//! Client for the local port coordination service.
//!
//! The broker allocates a host port per sandbox. A request is a GET carrying
//! `{"name": "<sandbox>"}`; a `200` reply carries `{"hostPort": <u16>}`.
//! Any other status means no port was assigned.

use async_trait::async_trait;
use reqwest::StatusCode;
use runm_common::types::SandboxName;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntimeError};

/// Outcome of a coordination request that reached the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortAssignment {
    /// The broker bound this host port for the sandbox.
    Assigned(u16),
    /// The broker answered with a non-200 status.
    Unassigned {
        /// HTTP status returned by the broker.
        status: u16,
    },
}

#[derive(Debug, Serialize)]
struct PortRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortResponse {
    host_port: u16,
}

/// Obtains dynamically bound ports for sandboxes.
#[async_trait]
pub trait PortBroker: Send + Sync {
    /// Asks the broker for the port bound to `sandbox`.
    ///
    /// # Errors
    ///
    /// Returns `RequestConstruction` if the request cannot be built,
    /// `Transport` if the broker cannot be reached, and `ResponseDecode`
    /// if a `200` reply does not carry a valid port.
    async fn request_port(&self, sandbox: &SandboxName) -> Result<PortAssignment>;
}

/// [`PortBroker`] speaking HTTP to the coordination endpoint.
#[derive(Debug, Clone)]
pub struct HttpPortBroker {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPortBroker {
    /// Creates a client for the broker at `endpoint`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Returns the endpoint this client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PortBroker for HttpPortBroker {
    async fn request_port(&self, sandbox: &SandboxName) -> Result<PortAssignment> {
        let request = self
            .client
            .get(&self.endpoint)
            .json(&PortRequest {
                name: sandbox.as_str(),
            })
            .build()
            .map_err(|source| RuntimeError::RequestConstruction {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        tracing::debug!(endpoint = %self.endpoint, sandbox = %sandbox, "requesting port");
        let response =
            self.client
                .execute(request)
                .await
                .map_err(|source| RuntimeError::Transport {
                    endpoint: self.endpoint.clone(),
                    source,
                })?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::info!(sandbox = %sandbox, status = status.as_u16(), "broker assigned no port");
            return Ok(PortAssignment::Unassigned {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RuntimeError::ResponseDecode {
                message: format!("failed to read body from {}: {e}", self.endpoint),
            })?;
        let reply: PortResponse =
            serde_json::from_slice(&body).map_err(|e| RuntimeError::ResponseDecode {
                message: format!("malformed body from {}: {e}", self.endpoint),
            })?;

        tracing::info!(sandbox = %sandbox, port = reply.host_port, "broker assigned port");
        Ok(PortAssignment::Assigned(reply.host_port))
    }
}
