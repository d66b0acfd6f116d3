#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Multi-tenant invoices.
//!
//! Every company, invoice and line item lives in the data partition of one tenant.
//! All access goes through a [`DataKeyContext`](tenantkit_db::secure::DataKeyContext)
//! built from the caller's data key, so a tenant only ever reads and writes its own
//! rows. The [`admin`] module manages the tenant registry and sets up or tears down
//! each tenant's partition.

pub mod admin;
pub mod domain;
pub mod infra;

pub use admin::{SeaOrmTenantAdmin, Status, TenantAdminService};
pub use domain::error::DomainError;
pub use domain::service::{InvoiceWithLines, InvoicesService, NewInvoice, NewLineItem};
pub use domain::tenant_change::{InvoiceTenantChangeService, TenantChangeService};
pub use infra::storage::{INVOICE_SCHEMA, invoices_model, migrate};
