//! Resolvers answering "which data partition does the current caller belong to".

use crate::claims::UserClaims;

/// Source of the current caller's data key.
///
/// Returns `None` when no key is available: nobody is logged in, the code runs in a
/// background job, or the user has not been assigned to a tenant yet.
pub trait DataKeyResolver: Send + Sync {
    fn data_key(&self) -> Option<String>;
}

/// Reads the data key claim of the authenticated caller.
#[derive(Debug, Clone, Default)]
pub struct ClaimsDataKeyResolver {
    user: Option<UserClaims>,
}

impl ClaimsDataKeyResolver {
    #[must_use]
    pub fn new(user: Option<UserClaims>) -> Self {
        Self { user }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self { user: None }
    }
}

impl DataKeyResolver for ClaimsDataKeyResolver {
    fn data_key(&self) -> Option<String> {
        self.user
            .as_ref()
            .and_then(UserClaims::data_key)
            .map(str::to_owned)
    }
}

/// Fixed answer, for batch jobs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDataKey(Option<String>);

impl StaticDataKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(Some(key.into()))
    }

    #[must_use]
    pub fn none() -> Self {
        Self(None)
    }
}

impl DataKeyResolver for StaticDataKey {
    fn data_key(&self) -> Option<String> {
        self.0.clone()
    }
}
