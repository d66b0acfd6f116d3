use sea_orm::{ColumnTrait, EntityTrait, IdenStatic, QueryFilter, sea_query::SimpleExpr};
use std::marker::PhantomData;

use crate::secure::cond::build_data_key_condition;
use crate::secure::error::ScopeError;
use crate::secure::runner::DBRunner;
use crate::secure::{DataKey, DataKeyEntity, Scoped, Unscoped};

/// A type-safe wrapper around `SeaORM`'s `UpdateMany` that enforces data-key scoping.
///
/// Once scoped, the data key column itself can no longer be assigned, so a bulk
/// update cannot move rows into another partition.
///
/// # Example
/// ```ignore
/// let result = ctx
///     .update_many::<invoice::Entity>()?
///     .col_expr(invoice::Column::InvoiceName, Expr::value("renamed"))?
///     .filter(invoice::Column::InvoiceId.eq(7))
///     .exec(&ctx)
///     .await?;
/// ```
#[derive(Clone, Debug)]
pub struct SecureUpdateMany<E: EntityTrait, S> {
    pub(crate) inner: sea_orm::UpdateMany<E>,
    pub(crate) _state: PhantomData<S>,
}

/// Extension trait to convert a regular `SeaORM` `UpdateMany` into a `SecureUpdateMany`.
pub trait SecureUpdateExt<E: EntityTrait>: Sized {
    /// Convert this update operation into a secure (unscoped) update.
    /// You must call `.scope_with()` before executing.
    fn secure(self) -> SecureUpdateMany<E, Unscoped>;
}

impl<E> SecureUpdateExt<E> for sea_orm::UpdateMany<E>
where
    E: EntityTrait,
{
    fn secure(self) -> SecureUpdateMany<E, Unscoped> {
        SecureUpdateMany {
            inner: self,
            _state: PhantomData,
        }
    }
}

impl<E> SecureUpdateMany<E, Unscoped>
where
    E: DataKeyEntity + EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    /// Restrict this update to the given data partition.
    #[must_use]
    pub fn scope_with(self, key: &DataKey) -> SecureUpdateMany<E, Scoped> {
        let cond = build_data_key_condition::<E>(key);
        SecureUpdateMany {
            inner: self.inner.filter(cond),
            _state: PhantomData,
        }
    }
}

impl<E> SecureUpdateMany<E, Scoped>
where
    E: DataKeyEntity + EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    /// Assign `expr` to `col` on every matched row.
    ///
    /// # Errors
    /// Returns `ScopeError::Denied` when `col` is the entity's data key column.
    pub fn col_expr(mut self, col: E::Column, expr: SimpleExpr) -> Result<Self, ScopeError> {
        if E::data_key_col().is_some_and(|dk| dk.as_str() == col.as_str()) {
            return Err(ScopeError::Denied("the data key column cannot be reassigned"));
        }
        self.inner = self.inner.col_expr(col, expr);
        Ok(self)
    }

    /// Add additional filters to the scoped update.
    /// The data key condition remains in place.
    #[must_use]
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: sea_orm::sea_query::IntoCondition,
    {
        self.inner = QueryFilter::filter(self.inner, filter);
        self
    }

    /// Execute the update operation.
    ///
    /// # Errors
    /// Returns `ScopeError::Db` if the database operation fails.
    pub async fn exec<R: DBRunner>(self, runner: &R) -> Result<sea_orm::UpdateResult, ScopeError> {
        Ok(self.inner.exec(runner.as_seaorm()).await?)
    }
}

/// A type-safe wrapper around `SeaORM`'s `DeleteMany` that enforces data-key scoping.
///
/// # Example
/// ```ignore
/// let result = ctx
///     .delete_many::<line_item::Entity>()?
///     .filter(line_item::Column::InvoiceId.eq(7))
///     .exec(&ctx)
///     .await?;
/// ```
#[derive(Clone, Debug)]
pub struct SecureDeleteMany<E: EntityTrait, S> {
    pub(crate) inner: sea_orm::DeleteMany<E>,
    pub(crate) _state: PhantomData<S>,
}

/// Extension trait to convert a regular `SeaORM` `DeleteMany` into a `SecureDeleteMany`.
pub trait SecureDeleteExt<E: EntityTrait>: Sized {
    /// Convert this delete operation into a secure (unscoped) delete.
    /// You must call `.scope_with()` before executing.
    fn secure(self) -> SecureDeleteMany<E, Unscoped>;
}

impl<E> SecureDeleteExt<E> for sea_orm::DeleteMany<E>
where
    E: EntityTrait,
{
    fn secure(self) -> SecureDeleteMany<E, Unscoped> {
        SecureDeleteMany {
            inner: self,
            _state: PhantomData,
        }
    }
}

impl<E> SecureDeleteMany<E, Unscoped>
where
    E: DataKeyEntity + EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    /// Restrict this delete to the given data partition.
    #[must_use]
    pub fn scope_with(self, key: &DataKey) -> SecureDeleteMany<E, Scoped> {
        let cond = build_data_key_condition::<E>(key);
        SecureDeleteMany {
            inner: self.inner.filter(cond),
            _state: PhantomData,
        }
    }
}

impl<E> SecureDeleteMany<E, Scoped>
where
    E: EntityTrait,
{
    /// Add additional filters to the scoped delete.
    /// The data key condition remains in place.
    #[must_use]
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: sea_orm::sea_query::IntoCondition,
    {
        self.inner = QueryFilter::filter(self.inner, filter);
        self
    }

    /// Execute the delete operation.
    ///
    /// # Errors
    /// Returns `ScopeError::Db` if the database operation fails.
    pub async fn exec<R: DBRunner>(self, runner: &R) -> Result<sea_orm::DeleteResult, ScopeError> {
        Ok(self.inner.exec(runner.as_seaorm()).await?)
    }
}
