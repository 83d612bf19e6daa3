use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::dashboard::{DashboardQuery, DashboardSnapshot};
use crate::models::AcknowledgeAlertRequest;
use crate::ApiResponse;

pub const DASHBOARD_PATH: &str = "/api/v1/dashboard";
pub const ACKNOWLEDGE_PATH: &str = "/api/v1/dashboard/alerts/acknowledge";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded with {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid dashboard payload: {0}")]
    InvalidPayload(String),
    #[error("dashboard session has stopped")]
    SessionClosed,
}

/// Server operations the dashboard session depends on.
#[async_trait]
pub trait DashboardApi: Send + Sync + 'static {
    async fn fetch(&self, query: &DashboardQuery) -> Result<DashboardSnapshot, ClientError>;

    async fn acknowledge(&self, request: &AcknowledgeAlertRequest) -> Result<(), ClientError>;
}

/// `reqwest` implementation talking to a running `packops-api`.
#[derive(Clone)]
pub struct HttpDashboardApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDashboardApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

async fn read_body(response: reqwest::Response) -> Result<String, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.message.or(parsed.error))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Decodes the dashboard envelope and rejects snapshots that break the payload invariants.
pub fn decode_snapshot(body: &str) -> Result<DashboardSnapshot, ClientError> {
    let envelope: ApiResponse<DashboardSnapshot> =
        serde_json::from_str(body).map_err(|e| ClientError::InvalidPayload(e.to_string()))?;
    let snapshot = envelope
        .data
        .ok_or_else(|| ClientError::InvalidPayload("response carried no data".to_string()))?;
    snapshot
        .validate()
        .map_err(|e| ClientError::InvalidPayload(e.to_string()))?;
    Ok(snapshot)
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    #[instrument(skip(self), fields(only = ?query.only))]
    async fn fetch(&self, query: &DashboardQuery) -> Result<DashboardSnapshot, ClientError> {
        let response = self
            .client
            .get(self.url(DASHBOARD_PATH))
            .query(query)
            .send()
            .await?;
        let body = read_body(response).await?;
        debug!(bytes = body.len(), "dashboard payload received");
        decode_snapshot(&body)
    }

    #[instrument(skip(self), fields(alert = %request.alert_key))]
    async fn acknowledge(&self, request: &AcknowledgeAlertRequest) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url(ACKNOWLEDGE_PATH))
            .json(request)
            .send()
            .await?;
        read_body(response).await.map(|_| ())
    }
}
