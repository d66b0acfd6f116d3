// Proc-macro crate for tenantkit-db derives
//
//! # tenantkit-db-macros
//!
//! ## `#[derive(DataKeyed)]`
//!
//! Implements `DataKeyEntity` for a `SeaORM` entity. The filtering decision is
//! mandatory; there is no default.
//!
//! ```ignore
//! use sea_orm::entity::prelude::*;
//! use tenantkit_db::secure::DataKeyed;
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
//! ```
//!
//! ### Attributes
//!
//! Exactly one of:
//! - `col = "column_name"`: column holding the tenant data key
//! - `unfiltered`: entity does not take part in data-key filtering

use proc_macro::TokenStream;
use proc_macro_error2::{abort, proc_macro_error};
use syn::{DeriveInput, parse_macro_input};

mod data_keyed;

/// Derive macro for implementing `DataKeyEntity`.
///
/// Place it on the `SeaORM` `Model` struct together with a `#[data_key(...)]`
/// attribute. The impl is generated for the sibling `Entity` type.
#[proc_macro_derive(DataKeyed, attributes(data_key))]
#[proc_macro_error]
pub fn derive_data_keyed(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match data_keyed::expand_derive_data_keyed(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => abort!(err.span(), "{}", err),
    }
}
