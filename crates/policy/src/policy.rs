//! Policy configuration and enforcement.

use crate::{Error, Operation, Result, Role};
use serde::{Deserialize, Serialize};

/// A record whose visibility is governed by its sender and access list.
pub trait Protected {
    /// Identifier used in denial reasons.
    fn id(&self) -> &str;

    /// Role name of the unit that submitted the record.
    fn sender_identity(&self) -> &str;

    /// Role names explicitly granted visibility.
    fn access_list(&self) -> &[String];

    /// Whether `role` appears in the access list.
    fn grants(&self, role: &Role) -> bool {
        self.access_list().iter().any(|r| r == role.as_str())
    }

    /// Whether the record was submitted by `role`.
    fn sent_by(&self, role: &Role) -> bool {
        self.sender_identity() == role.as_str()
    }
}

/// How the ledger enforces access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Role-based access control.
    #[default]
    Rbac,
    /// Legacy behaviour: every operation is allowed and callers are not identified.
    OpenAccess,
}

/// Policy configuration loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessPolicy {
    /// Enforcement mode.
    #[serde(default)]
    pub mode: AccessMode,
}

/// An access request. Per-record operations carry the record they target.
#[derive(Clone, Copy)]
pub enum Request<'a> {
    InitLedger,
    Create,
    /// Read or list visibility of a stored record.
    Read(&'a dyn Protected),
    /// Update of a record, judged against its current stored state.
    Update(&'a dyn Protected),
    /// Removal of the record with this UUID.
    Delete(&'a str),
    List,
}

impl Request<'_> {
    pub fn operation(&self) -> Operation {
        match self {
            Request::InitLedger => Operation::InitLedger,
            Request::Create => Operation::Create,
            Request::Read(_) => Operation::Read,
            Request::Update(_) => Operation::Update,
            Request::Delete(_) => Operation::Delete,
            Request::List => Operation::List,
        }
    }

    /// UUID of the record the request targets, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Request::Read(record) | Request::Update(record) => Some(record.id()),
            Request::Delete(id) => Some(*id),
            _ => None,
        }
    }
}

/// Result of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl AccessPolicy {
    /// Parse policy from TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Role-based enforcement.
    pub fn rbac() -> Self {
        Self {
            mode: AccessMode::Rbac,
        }
    }

    /// Legacy open-access enforcement.
    pub fn open_access() -> Self {
        Self {
            mode: AccessMode::OpenAccess,
        }
    }

    /// Whether callers must present a role before any operation.
    pub fn requires_identity(&self) -> bool {
        self.mode == AccessMode::Rbac
    }

    /// Check if `role` may perform `request`.
    pub fn check(&self, role: &Role, request: Request<'_>) -> Decision {
        if self.mode == AccessMode::OpenAccess {
            return Decision::Allow;
        }

        let allowed = match request {
            Request::InitLedger | Request::Delete(_) => *role == Role::HeadOfOperations,
            Request::Create => matches!(
                role,
                Role::HeadOfOperations | Role::IntelligenceUnit | Role::SpecialOperationsUnit
            ),
            Request::List => role.is_recognized(),
            Request::Read(record) => Self::visible(role, record),
            Request::Update(existing) => Self::updatable(role, existing),
        };

        if allowed {
            Decision::Allow
        } else {
            Decision::Deny {
                reason: format!(
                    "client role {} is not authorized to {}{}",
                    role,
                    request.operation(),
                    request
                        .target()
                        .map(|id| format!(" with UUID {id}"))
                        .unwrap_or_default()
                ),
            }
        }
    }

    /// Whether `role` may see `record` through a read or a listing.
    pub fn can_read(&self, role: &Role, record: &dyn Protected) -> bool {
        self.check(role, Request::Read(record)).is_allowed()
    }

    fn visible(role: &Role, record: &dyn Protected) -> bool {
        match role {
            Role::HeadOfOperations | Role::SpecialOperationsUnit => true,
            Role::TacticalUnit => record.grants(role),
            // Both conditions: sent by intelligence AND granted to it.
            Role::IntelligenceUnit => record.sent_by(role) && record.grants(role),
            Role::Unrecognized(_) => false,
        }
    }

    fn updatable(role: &Role, existing: &dyn Protected) -> bool {
        match role {
            Role::HeadOfOperations => true,
            Role::SpecialOperationsUnit => !existing.sent_by(&Role::HeadOfOperations),
            Role::IntelligenceUnit => existing.sent_by(role) && existing.grants(role),
            Role::TacticalUnit | Role::Unrecognized(_) => false,
        }
    }
}
