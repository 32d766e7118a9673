//! Principal and role model.
//!
//! A principal is the authenticated actor whose certificates and role are
//! managed. Roles come in two tiers of confidence: confirmed by the remote
//! store, or asserted locally by a diagnostic override.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role assigned to a principal. `None` is the safe default; absence of a
/// remote role record resolves to `None`, not to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    None,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::None => write!(f, "none"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Outcome of a role resolution or promotion.
///
/// `server_confirmed` distinguishes a role the remote store vouches for from
/// one asserted only by a local override marker, so downstream consumers never
/// have to collapse the two into a single opaque value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleResolution {
    pub effective: Role,
    pub server_confirmed: bool,
}

impl RoleResolution {
    /// A role confirmed by the remote store.
    pub fn confirmed(role: Role) -> Self {
        Self { effective: role, server_confirmed: true }
    }

    /// A role asserted locally without server confirmation.
    pub fn local(role: Role) -> Self {
        Self { effective: role, server_confirmed: false }
    }

    /// Whether the effective role grants mutation rights.
    pub fn is_admin(&self) -> bool {
        self.effective == Role::Admin
    }
}
