//! Data-key isolation layer for `SeaORM` entities.
//!
//! Every entity that lives in a tenant partition carries a string data key column.
//! The layer guarantees three things:
//!
//! 1. **Registration**: a [`TenantModel`] only accepts entities that declare their
//!    data key column. Unfiltered entities abort model construction.
//! 2. **Reads**: queries issued through a [`DataKeyContext`] always carry
//!    `data_key = <caller key>`. The typestate wrappers make unscoped queries
//!    impossible to execute.
//! 3. **Writes**: right before a flush, the context overwrites the data key of every
//!    added or modified row with its own key.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tenantkit_db::secure::{DataKeyContext, DataKeyed, TenantModel};
//! use sea_orm::entity::prelude::*;
//!
//! #[derive(Clone, Debug, PartialEq, DeriveEntityModel, DataKeyed)]
//! #[sea_orm(table_name = "invoices")]
//! #[data_key(col = "data_key")]
//! pub struct Model {
//!     #[sea_orm(primary_key)]
//!     pub invoice_id: i32,
//!     pub data_key: String,
//!     pub invoice_name: String,
//! }
//!
//! let model = Arc::new(TenantModel::builder().entity::<Entity>().build()?);
//! let mut ctx = DataKeyContext::new(conn, model, &resolver);
//!
//! ctx.add::<Entity>(ActiveModel { invoice_name: Set("Inv-1".into()), ..Default::default() })?;
//! ctx.save_changes().await?;
//!
//! let mine = ctx.find::<Entity>()?.all(&ctx).await?;
//! ```
//!
//! # Policy
//!
//! | Data key | Reads | Writes |
//! |----------|-------|--------|
//! | `Tenant(k)` | `WHERE data_key = k` | key column set to `k` |
//! | `NoAccess` | deny all (`WHERE false`) | refused |

mod cond;
mod context;
mod db_ops;
mod entity_traits;
mod error;
mod model;
mod runner;
mod select;
mod tracker;

pub use cond::build_data_key_condition;
pub use context::DataKeyContext;
pub use db_ops::{SecureDeleteExt, SecureDeleteMany, SecureUpdateExt, SecureUpdateMany};
pub use entity_traits::DataKeyEntity;
pub use error::{ModelError, ScopeError};
pub use model::{
    ColumnMeta, DECIMAL_PRECISION, DECIMAL_SCALE, EntityMeta, ModelBuilder, TenantModel,
};
pub use runner::DBRunner;
pub use select::{Scoped, SecureEntityExt, SecureSelect, Unscoped};
pub use tracker::Tracked;

pub use tenantkit_security::{DataKey, DataKeyResolver};

pub use tenantkit_db_macros::DataKeyed;
