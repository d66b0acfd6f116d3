use std::fmt;

use crate::resolver::DataKeyResolver;

/// Isolation key of the tenant data partition a request may see.
///
/// `NoAccess` is used when no key can be resolved (no principal, background work,
/// user without a tenant). It is not a string and therefore can never equal a key
/// stored in a row: every query scoped with it matches nothing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum DataKey {
    Tenant(String),
    #[default]
    NoAccess,
}

impl DataKey {
    /// Build a key from a resolver's raw answer.
    ///
    /// Missing and blank keys both map to `NoAccess`.
    #[must_use]
    pub fn from_resolved(raw: Option<String>) -> Self {
        match raw {
            Some(key) if !key.trim().is_empty() => Self::Tenant(key),
            _ => Self::NoAccess,
        }
    }

    /// Ask the resolver once and freeze the answer.
    #[must_use]
    pub fn resolve(resolver: &dyn DataKeyResolver) -> Self {
        let key = Self::from_resolved(resolver.data_key());
        if key.is_no_access() {
            tracing::debug!("no data key resolved, falling back to no-access");
        }
        key
    }

    #[inline]
    #[must_use]
    pub fn tenant(key: impl Into<String>) -> Self {
        Self::from_resolved(Some(key.into()))
    }

    #[inline]
    #[must_use]
    pub fn as_tenant(&self) -> Option<&str> {
        match self {
            Self::Tenant(key) => Some(key),
            Self::NoAccess => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_no_access(&self) -> bool {
        matches!(self, Self::NoAccess)
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tenant(key) => f.write_str(key),
            Self::NoAccess => f.write_str("<no access>"),
        }
    }
}

/// Data key given to a single-level tenant.
#[must_use]
pub fn tenant_data_key(tenant_id: i32) -> String {
    format!("{tenant_id}.")
}
