use sea_orm::entity::prelude::*;
use tenantkit_db::secure::DataKeyed;

/// The company owning a tenant partition. Its id is the tenant id assigned by
/// the tenant admin service.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, DataKeyed)]
#[sea_orm(table_name = "companies")]
#[data_key(col = "data_key")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub company_tenant_id: i32,
    pub data_key: String,
    pub company_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
