//! Validation authority adapter layer.
//!
//! The external authority computes certificate validity details for a domain
//! asynchronously: a first request triggers the analysis, and a later fetch
//! retrieves the report once the authority has finished. Nothing guarantees
//! readiness at first fetch, so callers poll.
//!
//! Reports are parsed into the tagged [`AnalysisOutcome`] rather than being
//! probed optimistically: a missing detail block is a typed, testable outcome,
//! not a silent absence.

pub mod http;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use crate::errors::Result;

pub use http::HttpAuthority;

/// Report status value indicating the analysis has completed.
pub const STATUS_READY: &str = "READY";

/// A certificate validity timestamp as reported by the authority.
///
/// Authorities of this shape report timestamps either as epoch milliseconds
/// or as RFC-3339 strings; both forms deserialize here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisTimestamp(DateTime<Utc>);

impl AnalysisTimestamp {
    /// The calendar date of the timestamp, dropping the time component.
    pub fn to_date(&self) -> NaiveDate {
        self.0.date_naive()
    }
}

impl<'de> Deserialize<'de> for AnalysisTimestamp {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Millis(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .map(AnalysisTimestamp)
                .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {}", ms))),
            Raw::Text(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| AnalysisTimestamp(dt.with_timezone(&Utc)))
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Certificate details inside one endpoint of an analysis report.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDetails {
    pub not_before: AnalysisTimestamp,
    pub not_after: AnalysisTimestamp,
    #[serde(default)]
    pub issuer_label: Option<String>,
}

/// One scanned endpoint; details are present only once the scan finished.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisEndpoint {
    #[serde(default)]
    pub details: Option<EndpointDetails>,
}

/// Raw analysis report as returned by the authority.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisReport {
    pub status: String,
    #[serde(default)]
    pub endpoints: Vec<AnalysisEndpoint>,
}

/// Parsed, tagged view of an analysis report.
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    /// The report is ready and carries at least one endpoint detail block.
    Ready(EndpointDetails),
    /// The authority has not finished computing; retry later.
    NotReady,
    /// The report claims readiness but lacks the expected structure.
    Malformed(String),
}

impl AnalysisOutcome {
    /// Classify a raw report. The first endpoint carrying details wins.
    pub fn from_report(report: AnalysisReport) -> Self {
        if report.status != STATUS_READY {
            return AnalysisOutcome::NotReady;
        }
        match report.endpoints.into_iter().find_map(|e| e.details) {
            Some(details) => AnalysisOutcome::Ready(details),
            None => {
                AnalysisOutcome::Malformed("READY report carries no endpoint details".to_string())
            }
        }
    }
}

/// Trait for validation authority backends.
///
/// `request_analysis` is a fire-and-forget trigger; `fetch_analysis` retrieves
/// the current report, ready or not. Transport failures propagate unchanged.
#[async_trait]
pub trait ValidationAuthority: Send + Sync {
    /// Trigger analysis of a domain. The response body is ignored.
    async fn request_analysis(&self, domain: &str) -> Result<()>;

    /// Fetch the current analysis report for a domain.
    async fn fetch_analysis(&self, domain: &str) -> Result<AnalysisReport>;
}
