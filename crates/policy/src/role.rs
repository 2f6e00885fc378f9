//! Organizational roles and the operations they are judged against.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the identity attribute that carries the caller's role.
pub const ROLE_ATTRIBUTE: &str = "role";

/// An organizational role asserted by the caller's identity.
///
/// The recognized set is closed; anything else is kept verbatim as
/// [`Role::Unrecognized`] and is denied every operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    HeadOfOperations,
    SpecialOperationsUnit,
    IntelligenceUnit,
    TacticalUnit,
    Unrecognized(String),
}

impl Role {
    /// Every recognized role, most privileged first.
    pub const RECOGNIZED: [Role; 4] = [
        Role::HeadOfOperations,
        Role::SpecialOperationsUnit,
        Role::IntelligenceUnit,
        Role::TacticalUnit,
    ];

    /// Parse a role from its attribute value. Matching is exact.
    pub fn parse(value: &str) -> Self {
        match value {
            "HeadOfOperations" => Role::HeadOfOperations,
            "SpecialOperationsUnit" => Role::SpecialOperationsUnit,
            "IntelligenceUnit" => Role::IntelligenceUnit,
            "TacticalUnit" => Role::TacticalUnit,
            other => Role::Unrecognized(other.to_string()),
        }
    }

    /// The attribute value for this role.
    pub fn as_str(&self) -> &str {
        match self {
            Role::HeadOfOperations => "HeadOfOperations",
            Role::SpecialOperationsUnit => "SpecialOperationsUnit",
            Role::IntelligenceUnit => "IntelligenceUnit",
            Role::TacticalUnit => "TacticalUnit",
            Role::Unrecognized(other) => other,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Role::Unrecognized(_))
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger operations subject to access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    InitLedger,
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            Operation::InitLedger => "invoke InitLedger",
            Operation::Create => "create CTI metadata",
            Operation::Read => "read CTI metadata",
            Operation::Update => "update CTI metadata",
            Operation::Delete => "delete CTI metadata",
            Operation::List => "access CTI metadata",
        };
        f.write_str(action)
    }
}
