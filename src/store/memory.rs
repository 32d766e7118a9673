//! In-memory remote store backend.
//!
//! This module provides a store backend that keeps everything in process
//! memory. It's intended for **development and testing only** - NOT for
//! production use: nothing survives a restart and there is no access control
//! beyond an optional role-write denial toggle used to exercise the access
//! policy's degraded paths.
//!
//! The backend honors the full [`RemoteStore`] subscription contract:
//! snapshots are fanned out in mutation order, and a cancelled subscription
//! never observes another callback.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use super::{CollectionCallback, DocId, RemoteStore, StoreSubscription};
use crate::domain::{Certificate, CertificatePatch, Role};
use crate::errors::{Error, Result};

struct Subscriber {
    owner: String,
    alive: Arc<AtomicBool>,
    callback: Arc<CollectionCallback>,
}

#[derive(Default)]
struct Inner {
    /// Documents in insertion order: (id, owner, certificate).
    docs: Vec<(DocId, String, Certificate)>,
    roles: HashMap<String, Role>,
    subscribers: Vec<Subscriber>,
}

impl Inner {
    fn snapshot(&self, owner: &str) -> Vec<Certificate> {
        self.docs
            .iter()
            .filter(|(_, o, _)| o == owner)
            .map(|(id, _, cert)| {
                let mut cert = cert.clone();
                cert.id = Some(id.clone());
                cert
            })
            .collect()
    }
}

/// In-memory store backend (development and testing only).
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    mutations: Arc<AtomicUsize>,
    deny_role_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutation calls (`insert`/`patch`/`remove`/`set_role_record`)
    /// the store has received. Tests use this to assert that failed registry
    /// operations never reach the adapter.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Make subsequent `set_role_record` calls fail with a permission error,
    /// simulating a store whose security rules reject role writes.
    pub fn deny_role_writes(&self, deny: bool) {
        self.deny_role_writes.store(deny, Ordering::SeqCst);
    }

    /// Number of currently registered live subscriptions, across all owners.
    pub fn live_subscriber_count(&self) -> usize {
        let inner = self.inner.lock().expect("memory store lock");
        inner.subscribers.len()
    }

    /// Pre-seed a role record without counting as a mutation.
    pub fn seed_role(&self, owner: &str, role: Role) {
        let mut inner = self.inner.lock().expect("memory store lock");
        inner.roles.insert(owner.to_string(), role);
    }

    /// Notify live subscribers for `owner` with the current snapshot.
    /// Callbacks run outside the lock, in subscriber registration order.
    fn notify(&self, owner: &str) {
        let (snapshot, targets): (Vec<Certificate>, Vec<_>) = {
            let inner = self.inner.lock().expect("memory store lock");
            let snapshot = inner.snapshot(owner);
            let targets = inner
                .subscribers
                .iter()
                .filter(|s| s.owner == owner)
                .map(|s| (Arc::clone(&s.alive), Arc::clone(&s.callback)))
                .collect();
            (snapshot, targets)
        };
        for (alive, callback) in targets {
            if alive.load(Ordering::SeqCst) {
                (*callback)(snapshot.clone());
            }
        }
    }

}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn subscribe_collection(
        &self,
        owner: &str,
        on_change: CollectionCallback,
    ) -> Result<StoreSubscription> {
        let alive = Arc::new(AtomicBool::new(true));
        let callback = Arc::new(on_change);
        let initial = {
            let mut inner = self.inner.lock().expect("memory store lock");
            inner.subscribers.push(Subscriber {
                owner: owner.to_string(),
                alive: Arc::clone(&alive),
                callback: Arc::clone(&callback),
            });
            inner.snapshot(owner)
        };
        // Initial snapshot, like any subscribable document store delivers.
        (*callback)(initial);

        let cancel_alive = Arc::clone(&alive);
        let cancel_inner = Arc::clone(&self.inner);
        Ok(StoreSubscription::new(move || {
            cancel_alive.store(false, Ordering::SeqCst);
            let mut inner = cancel_inner.lock().expect("memory store lock");
            inner.subscribers.retain(|s| !Arc::ptr_eq(&s.alive, &cancel_alive));
        }))
    }

    async fn insert(&self, owner: &str, cert: &Certificate) -> Result<DocId> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let doc_id = DocId::from_string(Uuid::new_v4().to_string());
        {
            let mut inner = self.inner.lock().expect("memory store lock");
            let mut stored = cert.clone();
            stored.id = Some(doc_id.clone());
            inner.docs.push((doc_id.clone(), owner.to_string(), stored));
        }
        self.notify(owner);
        Ok(doc_id)
    }

    async fn patch(&self, doc_id: &DocId, patch: &CertificatePatch) -> Result<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        // Resolve and mutate under one lock so a concurrently removed
        // document is an error, not a silent no-op notification.
        let owner = {
            let mut inner = self.inner.lock().expect("memory store lock");
            let (_, owner, cert) = inner
                .docs
                .iter_mut()
                .find(|(id, _, _)| id == doc_id)
                .ok_or_else(|| Error::internal(format!("no document with id '{}'", doc_id)))?;
            patch.apply_to(cert);
            owner.clone()
        };
        self.notify(&owner);
        Ok(())
    }

    async fn remove(&self, doc_id: &DocId) -> Result<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let owner = {
            let mut inner = self.inner.lock().expect("memory store lock");
            let position = inner
                .docs
                .iter()
                .position(|(id, _, _)| id == doc_id)
                .ok_or_else(|| Error::internal(format!("no document with id '{}'", doc_id)))?;
            let (_, owner, _) = inner.docs.remove(position);
            owner
        };
        self.notify(&owner);
        Ok(())
    }

    async fn get_role_record(&self, owner: &str) -> Result<Option<Role>> {
        let inner = self.inner.lock().expect("memory store lock");
        Ok(inner.roles.get(owner).copied())
    }

    async fn set_role_record(&self, owner: &str, role: Role) -> Result<()> {
        if self.deny_role_writes.load(Ordering::SeqCst) {
            return Err(Error::permission("role writes are not allowed for this principal"));
        }
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().expect("memory store lock");
        inner.roles.insert(owner.to_string(), role);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CertStatus, Serial};
    use std::sync::Mutex as StdMutex;

    fn sample_cert(cn: &str) -> Certificate {
        Certificate {
            id: None,
            serial: Serial::generate(),
            common_name: cn.into(),
            issuer: "Test CA".into(),
            link: format!("https://{}", cn),
            status: CertStatus::Active,
            valid_from: None,
            valid_to: None,
        }
    }

    #[tokio::test]
    async fn test_subscription_receives_snapshots_in_order() {
        let store = MemoryStore::new();
        let seen: Arc<StdMutex<Vec<usize>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = store
            .subscribe_collection(
                "alice",
                Box::new(move |items| sink.lock().unwrap().push(items.len())),
            )
            .await
            .unwrap();

        store.insert("alice", &sample_cert("a.example.com")).await.unwrap();
        store.insert("alice", &sample_cert("b.example.com")).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_cancelled_subscription_sees_nothing_further() {
        let store = MemoryStore::new();
        let seen: Arc<StdMutex<Vec<usize>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = store
            .subscribe_collection(
                "alice",
                Box::new(move |items| sink.lock().unwrap().push(items.len())),
            )
            .await
            .unwrap();
        sub.cancel();

        store.insert("alice", &sample_cert("a.example.com")).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_subscriptions_are_scoped_to_owner() {
        let store = MemoryStore::new();
        let seen: Arc<StdMutex<Vec<usize>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = store
            .subscribe_collection(
                "alice",
                Box::new(move |items| sink.lock().unwrap().push(items.len())),
            )
            .await
            .unwrap();

        store.insert("bob", &sample_cert("bob.example.com")).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_patch_merges_shallowly() {
        let store = MemoryStore::new();
        let id = store.insert("alice", &sample_cert("a.example.com")).await.unwrap();
        store.patch(&id, &CertificatePatch::status(CertStatus::Revoked)).await.unwrap();

        let seen: Arc<StdMutex<Vec<Certificate>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = store
            .subscribe_collection("alice", Box::new(move |items| *sink.lock().unwrap() = items))
            .await
            .unwrap();

        let certs = seen.lock().unwrap().clone();
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].status, CertStatus::Revoked);
        assert_eq!(certs[0].common_name, "a.example.com");
    }

    #[tokio::test]
    async fn test_mutating_a_removed_document_errors_without_notifying() {
        let store = MemoryStore::new();
        let id = store.insert("alice", &sample_cert("a.example.com")).await.unwrap();
        store.remove(&id).await.unwrap();

        let seen: Arc<StdMutex<Vec<usize>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = store
            .subscribe_collection(
                "alice",
                Box::new(move |items| sink.lock().unwrap().push(items.len())),
            )
            .await
            .unwrap();

        let err =
            store.patch(&id, &CertificatePatch::status(CertStatus::Revoked)).await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));

        let err = store.remove(&id).await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));

        // Only the initial empty snapshot was delivered.
        assert_eq!(*seen.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_role_write_denial() {
        let store = MemoryStore::new();
        store.deny_role_writes(true);
        let err = store.set_role_record("alice", Role::Admin).await.unwrap_err();
        assert!(matches!(err, Error::Permission(_)));
        assert_eq!(store.get_role_record("alice").await.unwrap(), None);
    }
}
