use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tenantkit_security::tenant_data_key;
use tracing::{info, instrument, warn};

use crate::admin::status::Status;
use crate::domain::tenant_change::TenantChangeService;
use crate::infra::storage::entity::tenant;

const TENANT_NOT_FOUND: &str = "Could not find the tenant you were looking for.";

/// Administration of the tenant registry.
#[async_trait]
pub trait TenantAdminService: Send + Sync {
    /// Every tenant, ordered by name.
    async fn query_tenants(&self) -> Status<Vec<tenant::Model>>;

    async fn get_tenant_via_id(&self, tenant_id: i32) -> Status<tenant::Model>;

    /// Register a tenant, assign its data key and let the application set up
    /// the tenant's partition.
    async fn add_single_tenant(&self, name: &str) -> Status<tenant::Model>;

    async fn update_tenant_name(&self, tenant_id: i32, name: &str) -> Status;

    /// Delete the tenant's partition, then the tenant itself.
    async fn delete_tenant(&self, tenant_id: i32) -> Status;
}

/// [`TenantAdminService`] over the `tenants` table.
///
/// The registry is written outside of any tenant partition; the hooks of the
/// [`TenantChangeService`] run after the registry change has committed, and a
/// failing hook undoes that change.
#[derive(Clone)]
pub struct SeaOrmTenantAdmin {
    conn: DatabaseConnection,
    changes: Arc<dyn TenantChangeService>,
}

fn record_db_error<T>(status: &mut Status<T>, action: &str, err: &DbErr) {
    warn!(action, error = %err, "tenant admin database error");
    status.add_error(format!("Failed to {action}: {err}"));
}

/// `None` from a hook is success, `Some` carries its error.
fn hook_status(outcome: Option<String>) -> Status {
    outcome.map_or_else(Status::new, Status::error)
}

fn validate_name<T>(status: &mut Status<T>, name: &str) -> bool {
    if name.is_empty() {
        status.add_error("The tenant name must not be empty.");
        return false;
    }
    true
}

impl SeaOrmTenantAdmin {
    #[must_use]
    pub fn new(conn: DatabaseConnection, changes: Arc<dyn TenantChangeService>) -> Self {
        Self { conn, changes }
    }

    async fn find_tenant(&self, tenant_id: i32) -> Result<Option<tenant::Model>, DbErr> {
        tenant::Entity::find_by_id(tenant_id).one(&self.conn).await
    }

    /// Whether `name` belongs to a tenant other than `except`.
    async fn name_taken(&self, name: &str, except: Option<i32>) -> Result<bool, DbErr> {
        let mut query = tenant::Entity::find().filter(tenant::Column::TenantFullName.eq(name));
        if let Some(id) = except {
            query = query.filter(tenant::Column::TenantId.ne(id));
        }
        Ok(query.one(&self.conn).await?.is_some())
    }

    /// Insert the row and derive its data key from the generated id.
    async fn insert_tenant(&self, name: &str) -> Result<tenant::Model, DbErr> {
        let txn = self.conn.begin().await?;
        let row = tenant::ActiveModel {
            tenant_full_name: Set(name.to_owned()),
            data_key: Set(String::new()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let data_key = tenant_data_key(row.tenant_id);
        let mut am = row.into_active_model();
        am.data_key = Set(data_key);
        let row = am.update(&txn).await?;
        txn.commit().await?;
        Ok(row)
    }

    async fn set_name(&self, row: tenant::Model, name: &str) -> Result<tenant::Model, DbErr> {
        let mut am = row.into_active_model();
        am.tenant_full_name = Set(name.to_owned());
        am.update(&self.conn).await
    }

    /// Load the tenant or record why it could not be loaded.
    async fn load<T>(&self, status: &mut Status<T>, tenant_id: i32) -> Option<tenant::Model> {
        match self.find_tenant(tenant_id).await {
            Ok(Some(row)) => Some(row),
            Ok(None) => {
                status.add_error(TENANT_NOT_FOUND);
                None
            }
            Err(e) => {
                record_db_error(status, "load the tenant", &e);
                None
            }
        }
    }

    /// Record an error when `name` is already used by another tenant.
    async fn check_unique<T>(&self, status: &mut Status<T>, name: &str, except: Option<i32>) {
        match self.name_taken(name, except).await {
            Ok(false) => {}
            Ok(true) => {
                status.add_error(format!("The tenant name '{name}' is already used."));
            }
            Err(e) => record_db_error(status, "check the tenant names", &e),
        }
    }
}

#[async_trait]
impl TenantAdminService for SeaOrmTenantAdmin {
    async fn query_tenants(&self) -> Status<Vec<tenant::Model>> {
        let mut status = Status::new();
        match tenant::Entity::find()
            .order_by_asc(tenant::Column::TenantFullName)
            .all(&self.conn)
            .await
        {
            Ok(rows) => {
                status.set_result(rows);
            }
            Err(e) => record_db_error(&mut status, "list the tenants", &e),
        }
        status
    }

    async fn get_tenant_via_id(&self, tenant_id: i32) -> Status<tenant::Model> {
        let mut status = Status::new();
        if let Some(row) = self.load(&mut status, tenant_id).await {
            status.set_result(row);
        }
        status
    }

    #[instrument(skip(self))]
    async fn add_single_tenant(&self, name: &str) -> Status<tenant::Model> {
        let mut status = Status::new();
        let name = name.trim();
        if !validate_name(&mut status, name) {
            return status;
        }
        self.check_unique(&mut status, name, None).await;
        if status.has_errors() {
            return status;
        }

        let created = match self.insert_tenant(name).await {
            Ok(row) => row,
            Err(e) => {
                record_db_error(&mut status, "add the tenant", &e);
                return status;
            }
        };

        let hook = hook_status(
            self.changes
                .create_new_tenant(&created.data_key, created.tenant_id, name)
                .await,
        );
        if hook.has_errors() {
            status.combine_errors(&hook);
            if let Err(e) = tenant::Entity::delete_by_id(created.tenant_id)
                .exec(&self.conn)
                .await
            {
                record_db_error(&mut status, "remove the half-created tenant", &e);
            }
            return status;
        }

        info!(tenant_id = created.tenant_id, "tenant added");
        status
            .set_message(format!("Successfully added the new tenant {name}."))
            .set_result(created);
        status
    }

    #[instrument(skip(self))]
    async fn update_tenant_name(&self, tenant_id: i32, name: &str) -> Status {
        let mut status = Status::new();
        let name = name.trim();
        if !validate_name(&mut status, name) {
            return status;
        }
        let Some(existing) = self.load(&mut status, tenant_id).await else {
            return status;
        };
        self.check_unique(&mut status, name, Some(tenant_id)).await;
        if status.has_errors() {
            return status;
        }

        let old_name = existing.tenant_full_name.clone();
        let renamed = match self.set_name(existing, name).await {
            Ok(row) => row,
            Err(e) => {
                record_db_error(&mut status, "rename the tenant", &e);
                return status;
            }
        };

        let hook = hook_status(
            self.changes
                .single_tenant_update_name(&renamed.data_key, tenant_id, name)
                .await,
        );
        if hook.has_errors() {
            status.combine_errors(&hook);
            if let Err(e) = self.set_name(renamed, &old_name).await {
                record_db_error(&mut status, "restore the tenant name", &e);
            }
            return status;
        }

        info!(tenant_id, "tenant renamed");
        status.set_message(format!("Successfully updated the tenant's name to {name}."));
        status
    }

    #[instrument(skip(self))]
    async fn delete_tenant(&self, tenant_id: i32) -> Status {
        let mut status = Status::new();
        let Some(existing) = self.load(&mut status, tenant_id).await else {
            return status;
        };

        let hook = hook_status(
            self.changes
                .single_tenant_delete(&existing.data_key, tenant_id)
                .await,
        );
        if hook.has_errors() {
            status.combine_errors(&hook);
            return status;
        }

        if let Err(e) = tenant::Entity::delete_by_id(tenant_id).exec(&self.conn).await {
            record_db_error(&mut status, "delete the tenant", &e);
            return status;
        }

        info!(tenant_id, "tenant deleted");
        status.set_message(format!(
            "Successfully deleted the tenant called '{}'",
            existing.tenant_full_name
        ));
        status
    }
}
