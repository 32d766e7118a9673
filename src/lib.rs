//! # certsync
//!
//! Certificate state synchronization and validation core. certsync keeps an
//! in-memory certificate collection consistent with a remote authoritative
//! store in real time, applies role-gated mutations to it, and reconciles
//! certificate metadata against an external validation authority with
//! eventual-consistency polling semantics.
//!
//! ## Architecture
//!
//! The system follows a layered architecture pattern:
//!
//! ```text
//! Presentation layer → Registry / Access Policy / Validation Workflow
//!                               ↓                        ↓
//!                      RemoteStore adapter    ValidationAuthority adapter
//! ```
//!
//! ## Core Components
//!
//! - **Certificate Registry**: owns the principal's in-memory collection,
//!   keeps it live through a single store subscription, and mediates all
//!   mutations
//! - **Access Policy**: resolves the principal's role as a two-tier result
//!   (server-confirmed vs locally asserted) and gates creation
//! - **Validation Workflow**: drives the authority's asynchronous analysis
//!   with bounded exponential backoff and writes results back
//! - **Adapters**: `RemoteStore` and `ValidationAuthority` traits; an
//!   in-memory store backend and an HTTP authority client ship with the crate
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use certsync::{
//!     AccessPolicy, CertificateRegistry, Config, HttpAuthority, MemoryStore,
//!     NewCertificate, Result, ValidationWorkflow,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     certsync::init_tracing();
//!     let config = Config::from_env()?;
//!
//!     let store = Arc::new(MemoryStore::new());
//!     let registry = Arc::new(CertificateRegistry::new(store.clone()));
//!     let policy = AccessPolicy::new(store);
//!     let workflow = ValidationWorkflow::new(
//!         Arc::new(HttpAuthority::new(config.authority_url.clone())),
//!         Arc::clone(&registry),
//!         config.retry_policy(),
//!     );
//!
//!     registry.subscribe("user-1").await?;
//!     let role = policy.resolve_role("user-1").await?;
//!     if policy.can_create(&role) {
//!         let cert = registry
//!             .create(
//!                 "user-1",
//!                 NewCertificate {
//!                     common_name: "example.com".into(),
//!                     issuer: "Unknown".into(),
//!                     link: "https://example.com".into(),
//!                 },
//!             )
//!             .await?;
//!         workflow.run(&cert).await?;
//!     }
//!     registry.unsubscribe().await;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod authority;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod services;
pub mod store;

// Re-export commonly used types and traits
pub use auth::AccessPolicy;
pub use authority::{AnalysisOutcome, AnalysisReport, HttpAuthority, ValidationAuthority};
pub use config::Config;
pub use domain::{
    CertStatus, Certificate, CertificatePatch, NewCertificate, Role, RoleResolution, Serial,
    StatusFilter,
};
pub use errors::{Error, Result};
pub use observability::init_tracing;
pub use services::{
    CertificateRegistry, RetryPolicy, ValidationOutcome, ValidationWorkflow,
};
pub use store::{DocId, MemoryStore, RemoteStore, StoreSubscription};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
