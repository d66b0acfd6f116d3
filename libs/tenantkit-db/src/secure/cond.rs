use sea_orm::{ColumnTrait, Condition, EntityTrait, sea_query::Expr};

use crate::secure::{DataKey, DataKeyEntity};

/// Builds the `SeaORM` `Condition` restricting a query to one data partition.
///
/// # Policy Rules
/// 1. `NoAccess` → deny all (`false`)
/// 2. Entity without a data key column → deny all
/// 3. `Tenant(k)` → `data_key_col = k`
///
/// A missing key can therefore never widen a query: the worst case is an empty
/// result.
#[must_use]
pub fn build_data_key_condition<E>(key: &DataKey) -> Condition
where
    E: DataKeyEntity + EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    let deny_all = || Condition::all().add(Expr::value(false));

    match (key.as_tenant(), E::data_key_col()) {
        (Some(k), Some(col)) => Condition::all().add(col.eq(k)),
        _ => deny_all(),
    }
}
