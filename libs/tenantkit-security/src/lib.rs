#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
pub mod claims;
pub mod data_key;
pub mod resolver;

pub use claims::{DATA_KEY_CLAIM, UserClaims, UserClaimsBuilder};
pub use data_key::{DataKey, tenant_data_key};
pub use resolver::{ClaimsDataKeyResolver, DataKeyResolver, StaticDataKey};
