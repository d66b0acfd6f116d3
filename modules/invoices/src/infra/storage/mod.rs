//! Persistence of the invoice partition and the tenant registry.
//!
//! - `entity/` - `SeaORM` entities (companies, invoices, line items, tenants)
//! - `migrations/` - schema migrations, the tenant tables come from the model DDL

pub mod entity;
pub mod migrations;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tenantkit_db::secure::{ModelError, TenantModel};

use entity::{company, invoice, line_item};
use migrations::Migrator;

/// Schema holding every invoice table.
pub const INVOICE_SCHEMA: &str = "invoice";

/// Tenant model of the invoice partition.
///
/// # Errors
/// Returns `ModelError` if an entity fails registration.
pub fn invoices_model() -> Result<TenantModel, ModelError> {
    TenantModel::builder()
        .default_schema(INVOICE_SCHEMA)
        .entity::<company::Entity>()
        .entity::<invoice::Entity>()
        .entity::<line_item::Entity>()
        .build()
}

/// Bring the database schema up to date.
///
/// # Errors
/// Returns `DbErr` if a migration fails.
pub async fn migrate(conn: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = conn.get_database_backend();
    // The migration bookkeeping table lands in the search path schema, which
    // must exist before the first migration runs.
    if backend == sea_orm::DbBackend::Postgres {
        conn.execute_unprepared(&format!("CREATE SCHEMA IF NOT EXISTS \"{INVOICE_SCHEMA}\""))
            .await?;
    }
    Migrator::up(conn, None).await?;
    tracing::info!("invoice schema migrated");
    Ok(())
}
