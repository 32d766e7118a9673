//! Certificate validation workflow.
//!
//! Orchestrates the multi-step interaction with the validation authority:
//! trigger the analysis, poll for the report with bounded exponential backoff,
//! and on readiness write the validity details back through the registry.
//!
//! A run is never retried automatically beyond the configured policy; the
//! caller decides whether to re-run after a `NotReady` outcome or a failure.
//! Concurrent runs for the same certificate are rejected, not coalesced: the
//! second caller gets `ValidationInFlight` and can retry once the first run
//! settles.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::sleep;
use tracing::{debug, info};

use super::registry::CertificateRegistry;
use crate::authority::{AnalysisOutcome, EndpointDetails, ValidationAuthority};
use crate::domain::{CertStatus, Certificate, CertificatePatch, Serial};
use crate::errors::{Error, Result};

/// Polling policy for the eventually-ready authority report.
///
/// Replaces a single fixed wait with bounded exponential backoff: the first
/// fetch happens after `initial_delay`, each subsequent delay is multiplied
/// by `multiplier`, and after `max_attempts` fetches the run gives up with
/// a `NotReady` outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // 20 s matches the authority's typical first-report latency.
        Self { initial_delay: Duration::from_secs(20), multiplier: 2.0, max_attempts: 3 }
    }
}

/// Result of a validation run.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// Details were extracted and written back through the registry.
    Applied { valid_from: NaiveDate, valid_to: NaiveDate, issuer: String },
    /// Details were extracted, but the certificate has never been persisted,
    /// so no write was performed.
    Ready { valid_from: NaiveDate, valid_to: NaiveDate, issuer: String },
    /// The authority did not finish within the polling budget; retry later.
    NotReady,
}

/// Extract the host to analyze from a certificate link.
///
/// Strips a leading `http://`/`https://` scheme and takes the substring up to
/// the first path separator. An empty remainder is a malformed link.
pub fn extract_domain(link: &str) -> Result<String> {
    let stripped = link
        .strip_prefix("https://")
        .or_else(|| link.strip_prefix("http://"))
        .unwrap_or(link);
    let domain = stripped.split('/').next().unwrap_or("");
    if domain.is_empty() {
        return Err(Error::malformed_link(format!("no domain in '{}'", link)));
    }
    Ok(domain.to_string())
}

/// Drives validation runs against the authority and feeds results back into
/// the registry.
pub struct ValidationWorkflow {
    authority: Arc<dyn ValidationAuthority>,
    registry: Arc<CertificateRegistry>,
    policy: RetryPolicy,
    in_flight: DashMap<Serial, ()>,
}

impl ValidationWorkflow {
    /// Create a workflow with the given polling policy.
    pub fn new(
        authority: Arc<dyn ValidationAuthority>,
        registry: Arc<CertificateRegistry>,
        policy: RetryPolicy,
    ) -> Self {
        Self { authority, registry, policy, in_flight: DashMap::new() }
    }

    /// Run one validation cycle for a certificate.
    ///
    /// Transport errors and malformed reports terminate the run as errors;
    /// an authority that simply is not ready yet yields
    /// [`ValidationOutcome::NotReady`] once the polling budget is spent.
    pub async fn run(&self, cert: &Certificate) -> Result<ValidationOutcome> {
        let _guard = self.acquire(&cert.serial)?;
        let domain = extract_domain(&cert.link)?;

        info!(serial = %cert.serial, domain = %domain, "Validation requested");
        self.authority.request_analysis(&domain).await?;

        let mut delay = self.policy.initial_delay;
        for attempt in 1..=self.policy.max_attempts {
            sleep(delay).await;
            let report = self.authority.fetch_analysis(&domain).await?;
            match AnalysisOutcome::from_report(report) {
                AnalysisOutcome::Ready(details) => {
                    return self.apply(cert, details).await;
                }
                AnalysisOutcome::NotReady => {
                    debug!(
                        serial = %cert.serial,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        "Analysis not ready"
                    );
                    delay = delay.mul_f64(self.policy.multiplier);
                }
                AnalysisOutcome::Malformed(reason) => {
                    return Err(Error::malformed_analysis(reason));
                }
            }
        }

        info!(serial = %cert.serial, domain = %domain, "Polling budget exhausted; report not ready");
        Ok(ValidationOutcome::NotReady)
    }

    /// Write extracted details back through the registry, if the certificate
    /// has a persisted identity.
    async fn apply(&self, cert: &Certificate, details: EndpointDetails) -> Result<ValidationOutcome> {
        let valid_from = details.not_before.to_date();
        let valid_to = details.not_after.to_date();
        let issuer = details.issuer_label.unwrap_or_else(|| cert.issuer.clone());

        if !cert.is_persisted() {
            return Ok(ValidationOutcome::Ready { valid_from, valid_to, issuer });
        }

        let patch = CertificatePatch {
            issuer: Some(issuer.clone()),
            valid_from: Some(valid_from),
            valid_to: Some(valid_to),
            status: Some(CertStatus::Active),
            ..Default::default()
        };
        self.registry.update_fields(&cert.serial, patch).await?;

        info!(
            serial = %cert.serial,
            valid_from = %valid_from,
            valid_to = %valid_to,
            issuer = %issuer,
            "Validation applied"
        );
        Ok(ValidationOutcome::Applied { valid_from, valid_to, issuer })
    }

    fn acquire(&self, serial: &Serial) -> Result<InFlightGuard<'_>> {
        match self.in_flight.entry(serial.clone()) {
            Entry::Occupied(_) => Err(Error::ValidationInFlight(serial.as_str().to_string())),
            Entry::Vacant(vacant) => {
                vacant.insert(());
                Ok(InFlightGuard { map: &self.in_flight, serial: serial.clone() })
            }
        }
    }
}

/// Releases the in-flight slot when a run settles, on success or failure.
struct InFlightGuard<'a> {
    map: &'a DashMap<Serial, ()>,
    serial: Serial,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.serial);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain_with_scheme_and_path() {
        assert_eq!(extract_domain("https://example.com/path").unwrap(), "example.com");
    }

    #[test]
    fn test_extract_domain_without_scheme() {
        assert_eq!(extract_domain("noscheme").unwrap(), "noscheme");
    }

    #[test]
    fn test_extract_domain_empty_remainder() {
        let err = extract_domain("https://").unwrap_err();
        assert!(matches!(err, Error::MalformedLink(_)));
    }

    #[test]
    fn test_extract_domain_http_scheme() {
        assert_eq!(extract_domain("http://example.com").unwrap(), "example.com");
    }

    #[test]
    fn test_default_policy_matches_authority_latency() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.initial_delay, Duration::from_secs(20));
        assert_eq!(policy.max_attempts, 3);
    }
}
