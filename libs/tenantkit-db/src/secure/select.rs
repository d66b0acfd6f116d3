use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use std::marker::PhantomData;

use crate::secure::cond::build_data_key_condition;
use crate::secure::error::ScopeError;
use crate::secure::runner::DBRunner;
use crate::secure::{DataKey, DataKeyEntity};

/// Typestate marker: query has not yet been scoped.
/// Cannot execute queries in this state.
#[derive(Debug, Clone, Copy)]
pub struct Unscoped;

/// Typestate marker: query has been restricted to a data partition.
/// Can now execute queries safely.
#[derive(Debug, Clone, Copy)]
pub struct Scoped;

/// A type-safe wrapper around `SeaORM`'s `Select` that enforces data-key scoping.
///
/// Queries cannot be executed before `.scope_with()` has attached the data key
/// predicate.
///
/// # Type Parameters
/// - `E`: The `SeaORM` entity type
/// - `S`: The typestate (`Unscoped` or `Scoped`)
///
/// # Example
/// ```rust,ignore
/// let invoices = invoice::Entity::find()
///     .secure()              // SecureSelect<E, Unscoped>
///     .scope_with(&data_key) // SecureSelect<E, Scoped>
///     .all(&ctx)             // Now can execute
///     .await?;
/// ```
#[must_use]
#[derive(Clone, Debug)]
pub struct SecureSelect<E: EntityTrait, S> {
    pub(crate) inner: sea_orm::Select<E>,
    pub(crate) _state: PhantomData<S>,
}

/// Extension trait to convert a regular `SeaORM` `Select` into a `SecureSelect`.
pub trait SecureEntityExt<E: EntityTrait>: Sized {
    /// Convert this select query into a secure (unscoped) select.
    /// You must call `.scope_with()` before executing the query.
    fn secure(self) -> SecureSelect<E, Unscoped>;
}

impl<E> SecureEntityExt<E> for sea_orm::Select<E>
where
    E: EntityTrait,
{
    fn secure(self) -> SecureSelect<E, Unscoped> {
        SecureSelect {
            inner: self,
            _state: PhantomData,
        }
    }
}

impl<E> SecureSelect<E, Unscoped>
where
    E: DataKeyEntity + EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    /// Restrict this query to the given data partition.
    pub fn scope_with(self, key: &DataKey) -> SecureSelect<E, Scoped> {
        let cond = build_data_key_condition::<E>(key);
        SecureSelect {
            inner: self.inner.filter(cond),
            _state: PhantomData,
        }
    }
}

impl<E> SecureSelect<E, Scoped>
where
    E: EntityTrait,
{
    /// Execute the query and return all matching results.
    ///
    /// # Errors
    /// Returns `ScopeError::Db` if the database query fails.
    pub async fn all<R>(self, runner: &R) -> Result<Vec<E::Model>, ScopeError>
    where
        R: DBRunner,
    {
        Ok(self.inner.all(runner.as_seaorm()).await?)
    }

    /// Execute the query and return at most one result.
    ///
    /// # Errors
    /// Returns `ScopeError::Db` if the database query fails.
    pub async fn one<R>(self, runner: &R) -> Result<Option<E::Model>, ScopeError>
    where
        R: DBRunner,
    {
        Ok(self.inner.one(runner.as_seaorm()).await?)
    }

    /// Execute the query and return the number of matching results.
    ///
    /// # Errors
    /// Returns `ScopeError::Db` if the database query fails.
    pub async fn count<R>(self, runner: &R) -> Result<u64, ScopeError>
    where
        R: DBRunner,
        E::Model: sea_orm::FromQueryResult + Send + Sync,
    {
        Ok(self.inner.count(runner.as_seaorm()).await?)
    }

    /// Add additional filters to the scoped query.
    /// The data key condition remains in place.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: sea_orm::sea_query::IntoCondition,
    {
        self.inner = QueryFilter::filter(self.inner, filter);
        self
    }

    /// Add ordering to the scoped query.
    pub fn order_by<C>(mut self, col: C, order: sea_orm::Order) -> Self
    where
        C: sea_orm::IntoSimpleExpr,
    {
        self.inner = QueryOrder::order_by(self.inner, col, order);
        self
    }

    /// Add a limit to the scoped query.
    pub fn limit(mut self, limit: u64) -> Self {
        self.inner = QuerySelect::limit(self.inner, limit);
        self
    }

    /// Add an offset to the scoped query.
    pub fn offset(mut self, offset: u64) -> Self {
        self.inner = QuerySelect::offset(self.inner, offset);
        self
    }
}
