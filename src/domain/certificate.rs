//! Certificate domain model.
//!
//! The central entity of the core: a certificate record owned by a principal,
//! mirrored from the remote store and mutated only through the registry.

use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{Error, Result};
use crate::store::DocId;

/// Upper bound (exclusive) for the random value backing a serial.
/// 1e8 keeps the hex rendering within eight digits.
const SERIAL_SPACE: u32 = 100_000_000;

/// Client-generated certificate identifier, distinct from the store-assigned
/// document id. Format `SN-<hex>`, uppercase, at most eight hex digits.
///
/// Serials are generated once at creation time and never reassigned. They are
/// collision-resistant for a session's cardinality, not globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Serial(String);

impl Serial {
    /// Generate a fresh serial from an 8-hex-digit random value.
    pub fn generate() -> Self {
        let value = rand::thread_rng().gen_range(0..SERIAL_SPACE);
        Self(format!("SN-{:X}", value))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Serial {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Serial {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Certificate lifecycle status. Never absent after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertStatus {
    Active,
    Revoked,
}

impl fmt::Display for CertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertStatus::Active => write!(f, "Active"),
            CertStatus::Revoked => write!(f, "Revoked"),
        }
    }
}

/// Status filter for collection views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Revoked,
}

impl StatusFilter {
    /// Whether a certificate with the given status passes this filter.
    pub fn matches(&self, status: CertStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => status == CertStatus::Active,
            StatusFilter::Revoked => status == CertStatus::Revoked,
        }
    }
}

/// A certificate record as held in the registry's collection.
///
/// `id` is assigned by the remote store and is `None` until the document has
/// been persisted. `valid_from`/`valid_to` are populated only by a successful
/// validation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DocId>,
    pub serial: Serial,
    #[serde(rename = "cn")]
    pub common_name: String,
    pub issuer: String,
    pub link: String,
    pub status: CertStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<NaiveDate>,
}

impl Certificate {
    /// Whether this certificate has been persisted remotely.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// Input fields for certificate creation. The registry fills in the serial
/// and the initial `Active` status.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCertificate {
    #[serde(rename = "cn")]
    pub common_name: String,
    pub issuer: String,
    pub link: String,
}

impl NewCertificate {
    /// Validate that all three required text fields carry content.
    /// Whitespace-only values count as empty.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("cn", &self.common_name),
            ("issuer", &self.issuer),
            ("link", &self.link),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation(format!("field '{}' must not be empty", field)));
            }
        }
        Ok(())
    }
}

/// Shallow partial update for a persisted certificate document.
///
/// Fields set to `None` are left untouched by the store; there are no
/// deep-merge guarantees beyond per-field replacement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificatePatch {
    #[serde(rename = "cn", skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CertStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<NaiveDate>,
}

impl CertificatePatch {
    /// Patch that transitions only the status field.
    pub fn status(status: CertStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }

    /// Apply this patch to a certificate in place (shallow field replacement).
    pub fn apply_to(&self, cert: &mut Certificate) {
        if let Some(cn) = &self.common_name {
            cert.common_name = cn.clone();
        }
        if let Some(issuer) = &self.issuer {
            cert.issuer = issuer.clone();
        }
        if let Some(link) = &self.link {
            cert.link = link.clone();
        }
        if let Some(status) = self.status {
            cert.status = status;
        }
        if let Some(valid_from) = self.valid_from {
            cert.valid_from = Some(valid_from);
        }
        if let Some(valid_to) = self.valid_to {
            cert.valid_to = Some(valid_to);
        }
    }
}
