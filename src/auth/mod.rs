//! Access policy layer
//!
//! Resolves principal roles against the remote store and gates certificate
//! mutation. Role-gated callers consult the policy before invoking registry
//! mutations; refusal is the caller's no-op, never a registry error.

pub mod policy;

pub use policy::AccessPolicy;
