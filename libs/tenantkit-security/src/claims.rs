/// Claim type that carries the caller's tenant data key.
pub const DATA_KEY_CLAIM: &str = "DataKey";

/// Claims of an authenticated caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UserClaims {
    user_id: String,
    claims: Vec<(String, String)>,
}

impl UserClaims {
    /// Create a new `UserClaims` builder
    #[must_use]
    pub fn builder() -> UserClaimsBuilder {
        UserClaimsBuilder::default()
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// First value of the named claim, if present.
    #[must_use]
    pub fn find_first(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|(t, _)| t == claim_type)
            .map(|(_, v)| v.as_str())
    }

    /// Value of the data key claim.
    #[must_use]
    pub fn data_key(&self) -> Option<&str> {
        self.find_first(DATA_KEY_CLAIM)
    }

    #[must_use]
    pub fn claims(&self) -> &[(String, String)] {
        &self.claims
    }
}

#[derive(Default)]
pub struct UserClaimsBuilder {
    user_id: String,
    claims: Vec<(String, String)>,
}

impl UserClaimsBuilder {
    #[must_use]
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    #[must_use]
    pub fn claim(mut self, claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.push((claim_type.into(), value.into()));
        self
    }

    #[must_use]
    pub fn data_key(self, key: impl Into<String>) -> Self {
        self.claim(DATA_KEY_CLAIM, key)
    }

    #[must_use]
    pub fn build(self) -> UserClaims {
        UserClaims {
            user_id: self.user_id,
            claims: self.claims,
        }
    }
}
