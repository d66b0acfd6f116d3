use sea_orm::EntityTrait;

/// Capability of an entity to be partitioned by a tenant data key.
///
/// Implement it with `#[derive(DataKeyed)]`; the attribute forces an explicit
/// decision for every entity.
///
/// # Example (Manual Implementation)
/// ```rust,ignore
/// impl DataKeyEntity for invoice::Entity {
///     fn data_key_col() -> Option<Self::Column> {
///         Some(invoice::Column::DataKey)
///     }
/// }
/// ```
///
/// # Unfiltered Entities
/// ```rust,ignore
/// #[derive(Clone, Debug, PartialEq, DeriveEntityModel, DataKeyed)]
/// #[sea_orm(table_name = "tenants")]
/// #[data_key(unfiltered)]
/// pub struct Model {
///     #[sea_orm(primary_key)]
///     pub tenant_id: i32,
///     pub tenant_full_name: String,
/// }
/// ```
///
/// Unfiltered entities can be queried by admin code with plain `SeaORM`, but a
/// [`TenantModel`](crate::secure::TenantModel) refuses to register them.
pub trait DataKeyEntity: EntityTrait {
    /// Set by `#[data_key(unfiltered)]`. When true, `data_key_col()` returns `None`.
    const IS_UNFILTERED: bool = false;

    /// Column holding the tenant data key, `None` for unfiltered entities.
    fn data_key_col() -> Option<Self::Column>;
}
