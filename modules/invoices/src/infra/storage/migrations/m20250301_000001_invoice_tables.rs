use sea_orm::ConnectionTrait;
use sea_orm_migration::prelude::*;

use crate::infra::storage::invoices_model;

/// Creates the tenant tables straight from the tenant model, so the stored column
/// types are the normalized ones.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let model = invoices_model().map_err(|e| DbErr::Migration(e.to_string()))?;
        let backend = manager.get_database_backend();

        if let Some(sql) = model.create_schema_sql(backend) {
            manager.get_connection().execute_unprepared(&sql).await?;
        }
        for table in model.create_table_statements(backend) {
            manager.create_table(table).await?;
        }
        for index in model.create_index_statements(backend) {
            manager.create_index(index).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let model = invoices_model().map_err(|e| DbErr::Migration(e.to_string()))?;
        for meta in model.entities().iter().rev() {
            manager
                .drop_table(
                    Table::drop()
                        .table(Alias::new(meta.table.as_str()))
                        .if_exists()
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }
}
