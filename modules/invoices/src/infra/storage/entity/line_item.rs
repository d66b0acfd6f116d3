use sea_orm::entity::prelude::*;
use tenantkit_db::secure::DataKeyed;

/// One line of an invoice. `total_price` is stored as `decimal(9, 2)` by the
/// tenant model, whatever precision the database would pick by default.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, DataKeyed)]
#[sea_orm(table_name = "line_items")]
#[data_key(col = "data_key")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub line_item_id: i32,
    pub data_key: String,
    pub invoice_id: i32,
    pub item_name: String,
    pub num_items: i32,
    pub total_price: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::invoice::Entity",
        from = "Column::InvoiceId",
        to = "super::invoice::Column::InvoiceId"
    )]
    Invoice,
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
