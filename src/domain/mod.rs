//! Domain layer
//!
//! Pure domain entities for the certificate synchronization core, with no
//! infrastructure dependencies: certificates and their lifecycle fields, and
//! the principal/role model the access policy resolves against.
//!
//! ## Module Organization
//!
//! - `certificate`: certificate record, serial generation, status, patches
//! - `principal`: role enumeration and the two-tier role resolution

pub mod certificate;
pub mod principal;

pub use certificate::{
    CertStatus, Certificate, CertificatePatch, NewCertificate, Serial, StatusFilter,
};
pub use principal::{Role, RoleResolution};
