#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]
use std::sync::Arc;

use anyhow::Result;
use invoices::{
    InvoiceTenantChangeService, InvoicesService, SeaOrmTenantAdmin, TenantChangeService,
    invoices_model, migrate,
};
use sea_orm::DatabaseConnection;
use tenantkit_db::secure::TenantModel;
use tenantkit_db::{DbConfig, connect};

pub struct TestApp {
    pub conn: DatabaseConnection,
    pub model: Arc<TenantModel>,
    pub invoices: InvoicesService,
    pub admin: SeaOrmTenantAdmin,
}

/// Migrated in-memory database with the invoice services wired up.
pub async fn setup() -> Result<TestApp> {
    let conn = connect(&DbConfig::default()).await?;
    migrate(&conn).await?;
    let model = Arc::new(invoices_model()?);
    let changes: Arc<dyn TenantChangeService> = Arc::new(InvoiceTenantChangeService::new(
        conn.clone(),
        Arc::clone(&model),
    ));

    Ok(TestApp {
        invoices: InvoicesService::new(conn.clone(), Arc::clone(&model)),
        admin: SeaOrmTenantAdmin::new(conn.clone(), changes),
        conn,
        model,
    })
}
