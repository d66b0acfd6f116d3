//! Tenant administration: the tenant registry plus the hooks that keep each
//! tenant's invoice partition in step with it.

pub mod service;
pub mod status;

pub use service::{SeaOrmTenantAdmin, TenantAdminService};
pub use status::Status;
