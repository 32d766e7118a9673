//! Business logic services
//!
//! The registry owns the certificate collection and its single live feed;
//! the validation workflow drives the external authority and writes results
//! back through the registry. Both sit above the adapter traits and below
//! whatever presentation layer consumes them.

pub mod registry;
pub mod validation;

pub use registry::CertificateRegistry;
pub use validation::{extract_domain, RetryPolicy, ValidationOutcome, ValidationWorkflow};
