//! HTTP validation authority client.
//!
//! Drives an SSL-Labs-shaped analysis API over HTTPS: `GET {base}/analyze?host=<domain>`
//! both triggers the analysis and, once the authority has finished, returns the
//! report. The client adds no retry logic of its own; polling policy lives in
//! the validation workflow.

use async_trait::async_trait;
use tracing::debug;

use super::{AnalysisReport, ValidationAuthority};
use crate::errors::{Error, Result};

/// Validation authority backend speaking the analyze-endpoint HTTP protocol.
#[derive(Debug, Clone)]
pub struct HttpAuthority {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthority {
    /// Create a client against the given API base URL
    /// (e.g. `https://api.ssllabs.com/api/v3`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }

    fn analyze_url(&self, domain: &str) -> String {
        format!("{}/analyze?host={}", self.base_url.trim_end_matches('/'), domain)
    }
}

#[async_trait]
impl ValidationAuthority for HttpAuthority {
    async fn request_analysis(&self, domain: &str) -> Result<()> {
        let url = self.analyze_url(domain);
        debug!(domain = %domain, "Triggering authority analysis");
        self.client.get(&url).send().await?.error_for_status()?;
        Ok(())
    }

    async fn fetch_analysis(&self, domain: &str) -> Result<AnalysisReport> {
        let url = self.analyze_url(domain);
        debug!(domain = %domain, "Fetching authority analysis report");
        let response = self.client.get(&url).send().await?.error_for_status()?;
        response.json::<AnalysisReport>().await.map_err(|err| {
            if err.is_decode() {
                Error::malformed_analysis(err.to_string())
            } else {
                Error::from(err)
            }
        })
    }
}
