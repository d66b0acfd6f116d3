use sea_orm::entity::prelude::*;
use tenantkit_db::secure::DataKeyed;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, DataKeyed)]
#[sea_orm(table_name = "invoices")]
#[data_key(col = "data_key")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub invoice_id: i32,
    pub data_key: String,
    pub invoice_name: String,
    pub date_created: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::line_item::Entity")]
    LineItems,
}

impl Related<super::line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LineItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
