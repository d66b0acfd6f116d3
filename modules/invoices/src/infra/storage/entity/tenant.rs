use sea_orm::entity::prelude::*;
use tenantkit_db::secure::DataKeyed;

/// Tenant registry row of the admin store.
///
/// The registry is administered across tenants, so it is unfiltered
/// and can never be registered in a tenant model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, DataKeyed)]
#[sea_orm(table_name = "tenants")]
#[data_key(unfiltered)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub tenant_id: i32,
    #[sea_orm(unique)]
    pub tenant_full_name: String,
    pub data_key: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
