//! Hidden database runner capability.
//!
//! Secure query wrappers execute against a `DBRunner`. The trait is **sealed**: only
//! [`DataKeyContext`](crate::secure::DataKeyContext) implements it, so downstream
//! crates cannot obtain a raw `SeaORM` connection through it and run unfiltered
//! queries.

use sea_orm::DatabaseConnection;

use super::context::DataKeyContext;

mod sealed {
    pub trait Sealed {}
}

/// Internal-only bridge to `SeaORM`'s executor.
pub trait DBRunnerInternal: sealed::Sealed + Send + Sync {
    fn as_seaorm(&self) -> &DatabaseConnection;
}

/// Hidden capability marker used by repositories and services.
///
/// Downstream crates cannot name `DBRunnerInternal` and therefore cannot get at
/// the connection behind a `DBRunner`.
#[doc(hidden)]
pub trait DBRunner: DBRunnerInternal {}

impl sealed::Sealed for DataKeyContext {}
impl DBRunnerInternal for DataKeyContext {
    fn as_seaorm(&self) -> &DatabaseConnection {
        self.conn()
    }
}
impl DBRunner for DataKeyContext {}
