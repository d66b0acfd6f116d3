//! Registration of the entities a [`DataKeyContext`](super::DataKeyContext) may touch.
//!
//! Building a [`TenantModel`] is where the isolation policy is enforced at startup:
//! every entity must declare a string data key column, otherwise the build fails
//! and the application never gets a context to work with. The builder also applies
//! the schema-wide numeric policy: every decimal column is stored as
//! `decimal(9, 2)`.

use std::any::TypeId;

use sea_orm::sea_query::{
    Alias, ColumnDef, Index, IndexCreateStatement, Table, TableCreateStatement,
};
use sea_orm::{
    ColumnTrait, ColumnType, DbBackend, EntityTrait, IdenStatic, Iterable,
    PrimaryKeyToColumn, PrimaryKeyTrait,
};

use crate::secure::{DataKeyEntity, ModelError};

/// Total digits of every decimal column.
pub const DECIMAL_PRECISION: u32 = 9;
/// Fractional digits of every decimal column.
pub const DECIMAL_SCALE: u32 = 2;

/// A column as the model stores it, after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub unique: bool,
}

/// A registered entity.
#[derive(Debug, Clone)]
pub struct EntityMeta {
    type_id: TypeId,
    pub entity: &'static str,
    pub table: String,
    pub data_key_column: String,
    pub columns: Vec<ColumnMeta>,
    pub primary_key: Vec<String>,
    pub pk_auto_increment: bool,
}

impl EntityMeta {
    fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// The immutable set of entities a tenant context works with.
///
/// Share it as `Arc<TenantModel>` between contexts.
#[derive(Debug, Clone)]
pub struct TenantModel {
    default_schema: Option<String>,
    entities: Vec<EntityMeta>,
}

/// Collects entity registrations for a [`TenantModel`].
///
/// Errors are kept until [`build`](Self::build) so registrations can be chained.
#[must_use]
#[derive(Debug, Default)]
pub struct ModelBuilder {
    default_schema: Option<String>,
    entities: Vec<EntityMeta>,
    errors: Vec<ModelError>,
}

fn normalize(column_type: &ColumnType) -> ColumnType {
    match column_type {
        ColumnType::Decimal(_) => ColumnType::Decimal(Some((DECIMAL_PRECISION, DECIMAL_SCALE))),
        other => other.clone(),
    }
}

fn is_string_type(column_type: &ColumnType) -> bool {
    matches!(
        column_type,
        ColumnType::String(_) | ColumnType::Text | ColumnType::Char(_)
    )
}

fn is_valid_schema(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

impl ModelBuilder {
    /// Schema (namespace) holding every table of this model.
    pub fn default_schema(mut self, name: impl Into<String>) -> Self {
        self.default_schema = Some(name.into());
        self
    }

    /// Register an entity.
    pub fn entity<E>(mut self) -> Self
    where
        E: DataKeyEntity + 'static,
        E::Column: ColumnTrait + Copy,
    {
        match Self::describe::<E>() {
            Ok(meta) => {
                if self.entities.iter().any(|m| m.type_id == meta.type_id) {
                    self.errors.push(ModelError::DuplicateEntity {
                        entity: meta.entity.to_owned(),
                    });
                } else {
                    tracing::debug!(entity = meta.entity, table = %meta.table, "entity registered");
                    self.entities.push(meta);
                }
            }
            Err(e) => self.errors.push(e),
        }
        self
    }

    fn describe<E>() -> Result<EntityMeta, ModelError>
    where
        E: DataKeyEntity + 'static,
        E::Column: ColumnTrait + Copy,
    {
        let entity = std::any::type_name::<E>();
        let dk_col = match E::data_key_col() {
            Some(col) if !E::IS_UNFILTERED => col,
            _ => {
                return Err(ModelError::NotFilterable {
                    entity: entity.to_owned(),
                });
            }
        };

        let columns: Vec<ColumnMeta> = E::Column::iter()
            .map(|col| {
                let def = col.def();
                ColumnMeta {
                    name: col.as_str().to_owned(),
                    column_type: normalize(def.get_column_type()),
                    nullable: def.is_null(),
                    unique: def.is_unique(),
                }
            })
            .collect();

        let dk_name = dk_col.as_str().to_owned();
        let dk_is_string = columns
            .iter()
            .find(|c| c.name == dk_name)
            .is_some_and(|c| is_string_type(&c.column_type));
        if !dk_is_string {
            return Err(ModelError::DataKeyColumnType {
                entity: entity.to_owned(),
                column: dk_name,
            });
        }

        Ok(EntityMeta {
            type_id: TypeId::of::<E>(),
            entity,
            table: E::default().table_name().to_owned(),
            data_key_column: dk_name,
            columns,
            primary_key: E::PrimaryKey::iter()
                .map(|pk| pk.into_column().as_str().to_owned())
                .collect(),
            pk_auto_increment: <E::PrimaryKey as PrimaryKeyTrait>::auto_increment(),
        })
    }

    /// Finish registration.
    ///
    /// # Errors
    /// Returns the first registration error, or `ModelError::Empty` when no entity
    /// was registered.
    pub fn build(self) -> Result<TenantModel, ModelError> {
        if let Some(err) = self.errors.into_iter().next() {
            tracing::error!(error = %err, "tenant model rejected");
            return Err(err);
        }
        if let Some(schema) = self.default_schema.as_deref()
            && !is_valid_schema(schema)
        {
            return Err(ModelError::InvalidSchema {
                schema: schema.to_owned(),
            });
        }
        if self.entities.is_empty() {
            return Err(ModelError::Empty);
        }
        tracing::info!(
            entities = self.entities.len(),
            schema = self.default_schema.as_deref().unwrap_or("<default>"),
            "tenant model built"
        );
        Ok(TenantModel {
            default_schema: self.default_schema,
            entities: self.entities,
        })
    }
}

impl TenantModel {
    pub fn builder() -> ModelBuilder {
        ModelBuilder::default()
    }

    #[must_use]
    pub fn default_schema(&self) -> Option<&str> {
        self.default_schema.as_deref()
    }

    #[must_use]
    pub fn contains<E: EntityTrait + 'static>(&self) -> bool {
        self.meta::<E>().is_some()
    }

    /// Registered entity type names, in registration order.
    #[must_use]
    pub fn entity_names(&self) -> Vec<&'static str> {
        self.entities.iter().map(|m| m.entity).collect()
    }

    #[must_use]
    pub fn entities(&self) -> &[EntityMeta] {
        &self.entities
    }

    #[must_use]
    pub fn meta<E: EntityTrait + 'static>(&self) -> Option<&EntityMeta> {
        let id = TypeId::of::<E>();
        self.entities.iter().find(|m| m.type_id == id)
    }

    /// Normalized columns of `E`; empty when `E` is not registered.
    #[must_use]
    pub fn columns<E: EntityTrait + 'static>(&self) -> &[ColumnMeta] {
        self.meta::<E>().map_or(&[], |m| m.columns.as_slice())
    }

    /// Normalized type of one column of `E`.
    #[must_use]
    pub fn column_type<E>(&self, col: E::Column) -> Option<&ColumnType>
    where
        E: EntityTrait + 'static,
    {
        self.meta::<E>()
            .and_then(|m| m.column(col.as_str()))
            .map(|c| &c.column_type)
    }

    // Only Postgres gets schema-qualified names; sqlite has no schemas.
    fn qualified(&self, backend: DbBackend, table: &str) -> sea_orm::sea_query::TableRef {
        use sea_orm::sea_query::IntoTableRef;
        match (backend, self.default_schema.as_deref()) {
            (DbBackend::Postgres, Some(schema)) => {
                (Alias::new(schema), Alias::new(table)).into_table_ref()
            }
            _ => Alias::new(table).into_table_ref(),
        }
    }

    /// `CREATE SCHEMA` for backends with schemas, `None` otherwise.
    #[must_use]
    pub fn create_schema_sql(&self, backend: DbBackend) -> Option<String> {
        match (backend, self.default_schema.as_deref()) {
            (DbBackend::Postgres, Some(schema)) => {
                Some(format!("CREATE SCHEMA IF NOT EXISTS \"{schema}\""))
            }
            _ => None,
        }
    }

    /// `CREATE TABLE` statements for every entity, in registration order.
    ///
    /// Column types are the normalized ones, so decimals come out as `decimal(9, 2)`
    /// whatever the entity declared.
    #[must_use]
    pub fn create_table_statements(&self, backend: DbBackend) -> Vec<TableCreateStatement> {
        self.entities
            .iter()
            .map(|meta| {
                let mut table = Table::create();
                table.table(self.qualified(backend, &meta.table)).if_not_exists();

                let single_pk = meta.primary_key.len() == 1;
                for col in &meta.columns {
                    let mut def = ColumnDef::new_with_type(
                        Alias::new(col.name.as_str()),
                        col.column_type.clone(),
                    );
                    let is_pk = meta.primary_key.contains(&col.name);
                    if col.nullable && !is_pk {
                        def.null();
                    } else {
                        def.not_null();
                    }
                    if col.unique && !is_pk {
                        def.unique_key();
                    }
                    if is_pk && single_pk {
                        def.primary_key();
                        if meta.pk_auto_increment {
                            def.auto_increment();
                        }
                    }
                    table.col(&mut def);
                }

                if !single_pk {
                    let mut pk = Index::create();
                    for name in &meta.primary_key {
                        pk.col(Alias::new(name.as_str()));
                    }
                    table.primary_key(&mut pk);
                }
                table.to_owned()
            })
            .collect()
    }

    /// One non-unique index per data key column, named `idx_<table>_<column>`.
    #[must_use]
    pub fn create_index_statements(&self, backend: DbBackend) -> Vec<IndexCreateStatement> {
        self.entities
            .iter()
            .map(|meta| {
                Index::create()
                    .name(format!("idx_{}_{}", meta.table, meta.data_key_column))
                    .table(self.qualified(backend, &meta.table))
                    .col(Alias::new(meta.data_key_column.as_str()))
                    .if_not_exists()
                    .to_owned()
            })
            .collect()
    }
}
