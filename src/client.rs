use std::time::Duration;

use reqwest::StatusCode;

use crate::error::{AgentError, QueryError, Result};
use crate::query::{QueryParams, QueryResult, SnapshotQuery};
use crate::server::ErrorResponse;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Queries the `/metrics` endpoint of a running agent.
pub struct MetricsClient {
    base_url: String,
    http: reqwest::Client,
}

impl MetricsClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(MetricsClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Client for an agent listening on `address` (host:port).
    pub fn for_address(address: &str) -> Result<Self> {
        Self::new(&format!("http://{}", address))
    }

    /// Validates `params` locally before any request is sent, then fetches.
    pub async fn fetch(&self, params: &QueryParams) -> Result<QueryResult> {
        SnapshotQuery::parse(params)?;

        let response = self
            .http
            .get(format!("{}/metrics", self.base_url))
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<QueryResult>().await?);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(QueryError::NoDataAvailable.into());
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };
        Err(AgentError::Remote {
            status: status.as_u16(),
            message,
        })
    }
}
