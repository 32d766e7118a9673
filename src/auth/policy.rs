//! Role resolution and promotion.
//!
//! The policy reads the principal's role record from the remote store and
//! reports it as a two-tier [`RoleResolution`]: either confirmed by the
//! server, or asserted locally by the diagnostic override.
//!
//! The override only exists under the `dev-override` cargo feature. Without
//! the feature there is no marker state, `resolve_role` reports exactly what
//! the store says, and a denied promotion propagates its permission error.

use std::sync::Arc;

use tracing::info;
#[cfg(feature = "dev-override")]
use tracing::warn;

use crate::domain::{Role, RoleResolution};
use crate::errors::Result;
use crate::store::RemoteStore;

#[cfg(feature = "dev-override")]
use std::collections::HashSet;
#[cfg(feature = "dev-override")]
use std::sync::Mutex;

/// Resolves and promotes principal roles.
pub struct AccessPolicy {
    store: Arc<dyn RemoteStore>,
    /// Principals granted a local admin override. Diagnostic builds only.
    #[cfg(feature = "dev-override")]
    overrides: Mutex<HashSet<String>>,
}

impl AccessPolicy {
    /// Create a policy over the given store backend.
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            #[cfg(feature = "dev-override")]
            overrides: Mutex::new(HashSet::new()),
        }
    }

    /// Resolve the principal's effective role.
    ///
    /// Absence of a remote role record resolves to `Role::None`, not to a
    /// failure. Under `dev-override`, a local marker lifts a record-less
    /// principal to an unconfirmed `Admin`.
    pub async fn resolve_role(&self, uid: &str) -> Result<RoleResolution> {
        if let Some(role) = self.store.get_role_record(uid).await? {
            return Ok(RoleResolution::confirmed(role));
        }

        #[cfg(feature = "dev-override")]
        if self.has_override(uid) {
            info!(uid = %uid, "Applying local admin override");
            return Ok(RoleResolution::local(Role::Admin));
        }

        Ok(RoleResolution::confirmed(Role::None))
    }

    /// Attempt to promote the principal to admin.
    ///
    /// On a successful remote write the role is re-read from the store and
    /// reported as confirmed. When the store denies the write, diagnostic
    /// builds degrade to a local-only override and still report `Admin`
    /// (unconfirmed); production builds propagate the permission error.
    pub async fn promote(&self, uid: &str) -> Result<RoleResolution> {
        match self.store.set_role_record(uid, Role::Admin).await {
            Ok(()) => {
                let role = self.store.get_role_record(uid).await?.unwrap_or(Role::None);
                info!(uid = %uid, role = %role, "Principal promoted");
                Ok(RoleResolution::confirmed(role))
            }
            #[cfg(feature = "dev-override")]
            Err(crate::errors::Error::Permission(reason)) => {
                warn!(uid = %uid, reason = %reason, "Role write denied; degrading to local override");
                self.overrides.lock().expect("override lock").insert(uid.to_string());
                Ok(RoleResolution::local(Role::Admin))
            }
            Err(err) => Err(err),
        }
    }

    /// Whether the resolved role permits certificate creation.
    pub fn can_create(&self, resolution: &RoleResolution) -> bool {
        resolution.is_admin()
    }

    #[cfg(feature = "dev-override")]
    fn has_override(&self, uid: &str) -> bool {
        self.overrides.lock().expect("override lock").contains(uid)
    }
}
