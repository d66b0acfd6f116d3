/// Errors that can occur during scoped query execution and flushes.
#[derive(thiserror::Error, Debug)]
pub enum ScopeError {
    /// Database error occurred during query execution.
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    /// Invalid use of the secure API.
    #[error("invalid scope: {0}")]
    Invalid(&'static str),

    /// Operation denied - no data key, or the row lives in another partition.
    #[error("access denied: {0}")]
    Denied(&'static str),

    /// The entity is not part of the context's tenant model.
    #[error("entity `{0}` is not registered in the tenant model")]
    NotRegistered(String),
}

/// Fatal configuration errors raised while building a tenant model.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error(
        "You haven't added a data key column to the entity {entity}: derive DataKeyed with #[data_key(col = \"...\")]"
    )]
    NotFilterable { entity: String },

    #[error("entity {entity}: data key column `{column}` must be a string column")]
    DataKeyColumnType { entity: String, column: String },

    #[error("entity {entity} is registered twice")]
    DuplicateEntity { entity: String },

    #[error("invalid schema name `{schema}`")]
    InvalidSchema { schema: String },

    #[error("tenant model has no entities")]
    Empty,
}
