//! Caller identity capability.

use crate::{Result, Role, ROLE_ATTRIBUTE};
use std::collections::HashMap;

/// Resolves attributes of the authenticated caller.
///
/// Implementations are trusted: signature and certificate checks happen
/// before an attribute reaches this trait.
pub trait CallerIdentity {
    /// Look up an attribute. `Ok(None)` means the caller has no such claim;
    /// a provider that cannot answer returns [`crate::Error::Identity`].
    fn attribute(&self, name: &str) -> Result<Option<String>>;

    /// The caller's role claim, if present.
    fn role(&self) -> Result<Option<Role>> {
        Ok(self.attribute(ROLE_ATTRIBUTE)?.map(Role::from))
    }
}

impl<T: CallerIdentity + ?Sized> CallerIdentity for &T {
    fn attribute(&self, name: &str) -> Result<Option<String>> {
        (**self).attribute(name)
    }
}

/// An identity with a fixed set of attributes.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    attributes: HashMap<String, String>,
}

impl StaticIdentity {
    /// An identity with no attributes at all.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An identity carrying only a role claim.
    pub fn with_role(role: impl Into<String>) -> Self {
        Self::anonymous().attribute_value(ROLE_ATTRIBUTE, role)
    }

    /// Add or replace an attribute.
    pub fn attribute_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

impl CallerIdentity for StaticIdentity {
    fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.attributes.get(name).cloned())
    }
}
