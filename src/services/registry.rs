//! Certificate registry service.
//!
//! Owns the in-memory certificate collection for the authenticated principal
//! and mediates every read and write through the remote store adapter. All
//! external observers see the collection only via snapshots or mutation
//! results, never by direct mutation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use tracing::info;

use crate::domain::{
    CertStatus, Certificate, CertificatePatch, NewCertificate, Serial, StatusFilter,
};
use crate::errors::{Error, Result};
use crate::store::{DocId, RemoteStore, StoreSubscription};

/// A live feed session: at most one exists per registry at any time.
///
/// The liveness gate is flipped before the store handle is cancelled, so once
/// `close` returns no further snapshot can reach the collection even if the
/// backend races a final delivery.
struct Session {
    uid: String,
    live: Arc<AtomicBool>,
    handle: Option<StoreSubscription>,
}

impl Session {
    fn close(mut self) {
        self.live.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

/// Service owning the principal's certificate collection.
pub struct CertificateRegistry {
    store: Arc<dyn RemoteStore>,
    collection: Arc<RwLock<Vec<Certificate>>>,
    session: Mutex<Option<Session>>,
}

impl CertificateRegistry {
    /// Create a registry over the given store backend.
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store, collection: Arc::new(RwLock::new(Vec::new())), session: Mutex::new(None) }
    }

    /// Open the live feed for a principal.
    ///
    /// Exactly one feed is live at any time: a prior session (same principal
    /// or not) is torn down before the new feed is established, so remote
    /// snapshots never race from two feeds into the same collection.
    pub async fn subscribe(&self, uid: &str) -> Result<()> {
        let mut session = self.session.lock().await;
        if let Some(prev) = session.take() {
            info!(uid = %prev.uid, "Closing previous certificate feed");
            prev.close();
        }

        let live = Arc::new(AtomicBool::new(true));
        let gate = Arc::clone(&live);
        let collection = Arc::clone(&self.collection);
        let handle = self
            .store
            .subscribe_collection(
                uid,
                Box::new(move |items| {
                    if gate.load(Ordering::SeqCst) {
                        *collection.write().expect("collection lock") = items;
                    }
                }),
            )
            .await?;

        *session = Some(Session { uid: uid.to_string(), live, handle: Some(handle) });
        info!(uid = %uid, "Certificate feed opened");
        Ok(())
    }

    /// Tear down the live feed and clear the collection.
    ///
    /// After this returns, no further collection updates are observed.
    /// Idempotent: closing an already-closed registry is a no-op.
    pub async fn unsubscribe(&self) {
        let mut session = self.session.lock().await;
        if let Some(prev) = session.take() {
            info!(uid = %prev.uid, "Certificate feed closed");
            prev.close();
            self.collection.write().expect("collection lock").clear();
        }
    }

    /// Current snapshot of the collection.
    pub fn snapshot(&self) -> Vec<Certificate> {
        self.collection.read().expect("collection lock").clone()
    }

    /// Snapshot filtered by status.
    pub fn list(&self, filter: StatusFilter) -> Vec<Certificate> {
        self.collection
            .read()
            .expect("collection lock")
            .iter()
            .filter(|c| filter.matches(c.status))
            .cloned()
            .collect()
    }

    /// Create a certificate for the principal.
    ///
    /// All three text fields must be non-empty. The registry generates the
    /// serial, sets the initial `Active` status, and persists the document.
    /// Role gating is the caller's duty via the access policy.
    pub async fn create(&self, uid: &str, fields: NewCertificate) -> Result<Certificate> {
        fields.validate()?;

        let mut cert = Certificate {
            id: None,
            serial: Serial::generate(),
            common_name: fields.common_name,
            issuer: fields.issuer,
            link: fields.link,
            status: CertStatus::Active,
            valid_from: None,
            valid_to: None,
        };
        let doc_id = self.store.insert(uid, &cert).await?;
        cert.id = Some(doc_id.clone());

        info!(
            uid = %uid,
            serial = %cert.serial,
            doc_id = %doc_id,
            "Certificate created"
        );
        Ok(cert)
    }

    /// Transition a certificate's status.
    pub async fn update_status(&self, serial: &Serial, status: CertStatus) -> Result<()> {
        let doc_id = self.resolve_doc_id(serial)?;
        self.store.patch(&doc_id, &CertificatePatch::status(status)).await?;
        info!(serial = %serial, status = %status, "Certificate status updated");
        Ok(())
    }

    /// Shallow-merge a partial update into a certificate.
    pub async fn update_fields(&self, serial: &Serial, patch: CertificatePatch) -> Result<()> {
        let doc_id = self.resolve_doc_id(serial)?;
        self.store.patch(&doc_id, &patch).await?;
        info!(serial = %serial, "Certificate fields updated");
        Ok(())
    }

    /// Delete a certificate. Irreversible.
    pub async fn delete(&self, serial: &Serial) -> Result<()> {
        let doc_id = self.resolve_doc_id(serial)?;
        self.store.remove(&doc_id).await?;
        info!(serial = %serial, "Certificate deleted");
        Ok(())
    }

    /// Resolve the persisted document id for a serial.
    ///
    /// Fails with `NotFound` when the collection has no matching entry or the
    /// entry has never been persisted; in either case no remote call is made.
    fn resolve_doc_id(&self, serial: &Serial) -> Result<DocId> {
        self.collection
            .read()
            .expect("collection lock")
            .iter()
            .find(|c| &c.serial == serial)
            .and_then(|c| c.id.clone())
            .ok_or_else(|| Error::not_found(serial.as_str()))
    }
}
