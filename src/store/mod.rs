//! Remote store adapter layer.
//!
//! The authoritative certificate store is consumed through the [`RemoteStore`]
//! trait: an opaque, subscribable document store with keyed mutation. The core
//! never assumes anything about the engine behind it beyond this contract.
//!
//! Subscription semantics the trait demands of every backend:
//! - snapshots are delivered in the order the store emits them;
//! - after a subscription's cancel handle has run, no further callback
//!   delivery may occur (no stale-callback races).

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Certificate, CertificatePatch, Role};
use crate::errors::Result;

pub use memory::MemoryStore;

/// Store-assigned document identifier. Exists iff the certificate has been
/// persisted remotely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    /// Wrap an existing id string assigned by the backend.
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Callback invoked with the full current collection on every remote change.
pub type CollectionCallback = Box<dyn Fn(Vec<Certificate>) + Send + Sync>;

/// Cancel handle for a live collection feed.
///
/// Cancelling (explicitly or by drop) tears the feed down; the backend must
/// guarantee that no callback runs after the cancel returns.
pub struct StoreSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl StoreSubscription {
    /// Build a handle around a backend-specific teardown closure.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    /// Tear down the feed.
    pub fn cancel(mut self) {
        if let Some(f) = self.cancel.take() {
            f();
        }
    }
}

impl Drop for StoreSubscription {
    fn drop(&mut self) {
        if let Some(f) = self.cancel.take() {
            f();
        }
    }
}

impl fmt::Debug for StoreSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSubscription").field("live", &self.cancel.is_some()).finish()
    }
}

/// Trait for remote certificate store backends.
///
/// Provides per-principal live subscriptions, keyed document mutation, and
/// role record access. Transport failures are surfaced unchanged; the core
/// never retries on the backend's behalf.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Open a live feed of the owner's full certificate collection.
    ///
    /// The backend delivers an initial snapshot and then one snapshot per
    /// remote mutation, in emission order.
    async fn subscribe_collection(
        &self,
        owner: &str,
        on_change: CollectionCallback,
    ) -> Result<StoreSubscription>;

    /// Persist a new certificate document and return its assigned id.
    async fn insert(&self, owner: &str, cert: &Certificate) -> Result<DocId>;

    /// Shallow-merge a partial document into an existing one.
    async fn patch(&self, doc_id: &DocId, patch: &CertificatePatch) -> Result<()>;

    /// Remove a document. Irreversible.
    async fn remove(&self, doc_id: &DocId) -> Result<()>;

    /// Fetch the owner's role record, if one exists.
    async fn get_role_record(&self, owner: &str) -> Result<Option<Role>>;

    /// Write the owner's role record. May fail with [`crate::Error::Permission`]
    /// when the caller lacks the privilege to write role records.
    async fn set_role_record(&self, owner: &str, role: Role) -> Result<()>;
}
