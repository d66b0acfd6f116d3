//! Tenant lifecycle hooks of the invoice partition.
//!
//! The tenant admin service owns the tenant registry; each application that keeps
//! per-tenant data implements [`TenantChangeService`] to follow along. A hook
//! returns `None` on success or a message that the admin service reports back to
//! the operator.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, Set};
use tenantkit_db::secure::{DataKey, DataKeyContext, ScopeError, TenantModel};
use tracing::{info, warn};

use crate::infra::storage::entity::{company, invoice, line_item};

#[async_trait]
pub trait TenantChangeService: Send + Sync {
    /// Set up the partition of a freshly created tenant.
    async fn create_new_tenant(
        &self,
        data_key: &str,
        tenant_id: i32,
        name: &str,
    ) -> Option<String>;

    async fn single_tenant_update_name(
        &self,
        data_key: &str,
        tenant_id: i32,
        name: &str,
    ) -> Option<String>;

    /// Remove every row of the tenant's partition.
    async fn single_tenant_delete(&self, data_key: &str, tenant_id: i32) -> Option<String>;
}

/// Keeps the `companies` row of each tenant in step with the tenant registry.
#[derive(Clone)]
pub struct InvoiceTenantChangeService {
    conn: DatabaseConnection,
    model: Arc<TenantModel>,
}

impl InvoiceTenantChangeService {
    #[must_use]
    pub fn new(conn: DatabaseConnection, model: Arc<TenantModel>) -> Self {
        Self { conn, model }
    }

    fn context(&self, data_key: &str) -> DataKeyContext {
        DataKeyContext::with_data_key(
            self.conn.clone(),
            Arc::clone(&self.model),
            DataKey::tenant(data_key),
        )
    }

    async fn add_company(
        &self,
        data_key: &str,
        tenant_id: i32,
        name: &str,
    ) -> Result<(), ScopeError> {
        let mut ctx = self.context(data_key);
        ctx.add::<company::Entity>(company::ActiveModel {
            company_tenant_id: Set(tenant_id),
            company_name: Set(name.to_owned()),
            ..Default::default()
        })?;
        ctx.save_changes().await?;
        Ok(())
    }

    async fn rename_company(
        &self,
        data_key: &str,
        tenant_id: i32,
        name: &str,
    ) -> Result<Option<String>, ScopeError> {
        let mut ctx = self.context(data_key);
        let Some(existing) = ctx
            .find_by_id::<company::Entity, _>(tenant_id)?
            .one(&ctx)
            .await?
        else {
            return Ok(Some(format!("Could not find the company of tenant {tenant_id}.")));
        };

        ctx.update::<company::Entity>(company::ActiveModel {
            company_tenant_id: Set(existing.company_tenant_id),
            company_name: Set(name.to_owned()),
            ..Default::default()
        })?;
        ctx.save_changes().await?;
        Ok(None)
    }

    /// Children first; all three tables are cleared in one transaction.
    async fn delete_partition(&self, data_key: &str) -> Result<u64, ScopeError> {
        let mut ctx = self.context(data_key);
        ctx.remove_all::<line_item::Entity>()?;
        ctx.remove_all::<invoice::Entity>()?;
        ctx.remove_all::<company::Entity>()?;
        ctx.save_changes().await
    }
}

#[async_trait]
impl TenantChangeService for InvoiceTenantChangeService {
    async fn create_new_tenant(
        &self,
        data_key: &str,
        tenant_id: i32,
        name: &str,
    ) -> Option<String> {
        match self.add_company(data_key, tenant_id, name).await {
            Ok(()) => {
                info!(tenant_id, "company created for new tenant");
                None
            }
            Err(e) => {
                warn!(tenant_id, error = %e, "failed to create company");
                Some(format!("Failed to create the company for tenant {name}: {e}"))
            }
        }
    }

    async fn single_tenant_update_name(
        &self,
        data_key: &str,
        tenant_id: i32,
        name: &str,
    ) -> Option<String> {
        match self.rename_company(data_key, tenant_id, name).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(tenant_id, error = %e, "failed to rename company");
                Some(format!("Failed to rename the company of tenant {tenant_id}: {e}"))
            }
        }
    }

    async fn single_tenant_delete(&self, data_key: &str, tenant_id: i32) -> Option<String> {
        match self.delete_partition(data_key).await {
            Ok(rows) => {
                info!(tenant_id, rows, "tenant partition deleted");
                None
            }
            Err(e) => {
                warn!(tenant_id, error = %e, "failed to delete tenant partition");
                Some(format!("Failed to delete the data of tenant {tenant_id}: {e}"))
            }
        }
    }
}
