//! Capability checks consulted by the CLI before it calls the lifecycle manager.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CapaError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Create,
    Edit,
    Transition,
    Delete,
    Export,
}

impl Permission {
    pub const ALL: [Permission; 5] = [
        Permission::Create,
        Permission::Edit,
        Permission::Transition,
        Permission::Delete,
        Permission::Export,
    ];
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Permission::Create => "create",
            Permission::Edit => "edit",
            Permission::Transition => "transition",
            Permission::Delete => "delete",
            Permission::Export => "export",
        };
        f.write_str(s)
    }
}

pub trait PermissionGate {
    fn has_permission(&self, action: Permission) -> bool;
}

/// A fixed allow-list, as read from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(Vec<Permission>);

impl Default for PermissionSet {
    fn default() -> Self {
        Self(Permission::ALL.to_vec())
    }
}

impl PermissionGate for PermissionSet {
    fn has_permission(&self, action: Permission) -> bool {
        self.0.contains(&action)
    }
}

/// Fails with [`CapaError::PermissionDenied`] unless `gate` allows `permission`.
pub fn require(gate: &impl PermissionGate, permission: Permission) -> Result<()> {
    if gate.has_permission(permission) {
        Ok(())
    } else {
        Err(CapaError::PermissionDenied(format!(
            "'{permission}' is not allowed by configuration"
        )))
    }
}
