//! Per-request persistence context bound to one data key.
//!
//! A `DataKeyContext` is what services get instead of a raw connection. It carries
//! the caller's [`DataKey`], resolved once at construction, and routes every read
//! and write through it:
//!
//! ```ignore
//! let mut ctx = DataKeyContext::new(conn.clone(), model.clone(), &resolver);
//!
//! let invoice = ctx.add::<invoice::Entity>(invoice::ActiveModel {
//!     invoice_name: Set("Inv-1".into()),
//!     date_created: Set(Utc::now()),
//!     ..Default::default()
//! })?;
//! ctx.add_child::<invoice::Entity, line_item::Entity, _>(&invoice, |inv| {
//!     line_item::ActiveModel {
//!         invoice_id: Set(inv.invoice_id),
//!         item_name: Set("Bolt".into()),
//!         ..Default::default()
//!     }
//! })?;
//! ctx.save_changes().await?;
//!
//! let visible = ctx.find::<invoice::Entity>()?.all(&ctx).await?;
//! ```

use std::fmt;
use std::sync::Arc;

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PrimaryKeyTrait, TransactionTrait,
};

use crate::secure::db_ops::{SecureDeleteExt, SecureDeleteMany, SecureUpdateExt, SecureUpdateMany};
use crate::secure::tracker::{
    PendingChange, PendingChildInsert, PendingDelete, PendingDeleteAll, PendingInsert,
    PendingUpdate,
};
use crate::secure::{
    DataKey, DataKeyEntity, DataKeyResolver, ScopeError, Scoped, SecureEntityExt, SecureSelect,
    TenantModel, Tracked,
};

/// Persistence context of one request, scoped to one data partition.
///
/// Not meant to be shared: create one per request or job. Contexts with different
/// keys can use the same connection pool concurrently.
pub struct DataKeyContext {
    conn: DatabaseConnection,
    model: Arc<TenantModel>,
    data_key: DataKey,
    pending: Vec<Box<dyn PendingChange>>,
}

impl fmt::Debug for DataKeyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataKeyContext")
            .field("has_data_key", &!self.data_key.is_no_access())
            .field("entities", &self.model.entity_names().len())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl DataKeyContext {
    /// Create a context, asking `resolver` for the caller's key.
    ///
    /// An unresolvable key yields a `NoAccess` context: reads return nothing and
    /// flushes are refused.
    #[must_use]
    pub fn new(
        conn: DatabaseConnection,
        model: Arc<TenantModel>,
        resolver: &dyn DataKeyResolver,
    ) -> Self {
        Self::with_data_key(conn, model, DataKey::resolve(resolver))
    }

    #[must_use]
    pub fn with_data_key(
        conn: DatabaseConnection,
        model: Arc<TenantModel>,
        data_key: DataKey,
    ) -> Self {
        tracing::trace!(has_data_key = !data_key.is_no_access(), "data key context created");
        Self {
            conn,
            model,
            data_key,
            pending: Vec::new(),
        }
    }

    #[must_use]
    pub fn data_key(&self) -> &DataKey {
        &self.data_key
    }

    #[must_use]
    pub fn model(&self) -> &TenantModel {
        &self.model
    }

    pub(crate) fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    fn ensure_registered<E: EntityTrait + 'static>(&self) -> Result<(), ScopeError> {
        if self.model.contains::<E>() {
            Ok(())
        } else {
            let entity = std::any::type_name::<E>();
            tracing::warn!(entity, "entity used outside of its tenant model");
            Err(ScopeError::NotRegistered(entity.to_owned()))
        }
    }

    fn ensure_writable(&self) -> Result<(), ScopeError> {
        if self.data_key.is_no_access() {
            Err(ScopeError::Denied("no data key: writes are not allowed"))
        } else {
            Ok(())
        }
    }

    /// Select every row of `E` in this context's partition.
    ///
    /// # Errors
    /// Returns `ScopeError::NotRegistered` if `E` is not part of the model.
    pub fn find<E>(&self) -> Result<SecureSelect<E, Scoped>, ScopeError>
    where
        E: DataKeyEntity + 'static,
        E::Column: ColumnTrait + Copy,
    {
        self.ensure_registered::<E>()?;
        Ok(E::find().secure().scope_with(&self.data_key))
    }

    /// Select one row of `E` by primary key, inside this context's partition.
    ///
    /// # Errors
    /// Returns `ScopeError::NotRegistered` if `E` is not part of the model.
    pub fn find_by_id<E, T>(&self, id: T) -> Result<SecureSelect<E, Scoped>, ScopeError>
    where
        E: DataKeyEntity + 'static,
        E::Column: ColumnTrait + Copy,
        T: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
    {
        self.ensure_registered::<E>()?;
        Ok(E::find_by_id(id).secure().scope_with(&self.data_key))
    }

    /// Bulk update of `E` restricted to this context's partition.
    ///
    /// # Errors
    /// Returns `ScopeError::NotRegistered` for unknown entities and
    /// `ScopeError::Denied` for a `NoAccess` context.
    pub fn update_many<E>(&self) -> Result<SecureUpdateMany<E, Scoped>, ScopeError>
    where
        E: DataKeyEntity + 'static,
        E::Column: ColumnTrait + Copy,
    {
        self.ensure_registered::<E>()?;
        self.ensure_writable()?;
        Ok(E::update_many().secure().scope_with(&self.data_key))
    }

    /// Bulk delete of `E` restricted to this context's partition.
    ///
    /// # Errors
    /// Returns `ScopeError::NotRegistered` for unknown entities and
    /// `ScopeError::Denied` for a `NoAccess` context.
    pub fn delete_many<E>(&self) -> Result<SecureDeleteMany<E, Scoped>, ScopeError>
    where
        E: DataKeyEntity + 'static,
        E::Column: ColumnTrait + Copy,
    {
        self.ensure_registered::<E>()?;
        self.ensure_writable()?;
        Ok(E::delete_many().secure().scope_with(&self.data_key))
    }

    /// Queue a new row. Its data key is set by the next flush.
    ///
    /// # Errors
    /// Returns `ScopeError::NotRegistered` if `E` is not part of the model.
    pub fn add<E>(&mut self, am: E::ActiveModel) -> Result<Tracked<E>, ScopeError>
    where
        E: DataKeyEntity + 'static,
        E::Column: ColumnTrait + Copy,
        E::Model: IntoActiveModel<E::ActiveModel> + Sync + 'static,
        E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync + 'static,
    {
        self.ensure_registered::<E>()?;
        let (change, tracked) = PendingInsert::<E>::new(am);
        self.pending.push(Box::new(change));
        Ok(tracked)
    }

    /// Queue a row built from a parent queued earlier on this context.
    ///
    /// `build` runs during the flush, after the parent has been inserted, so it can
    /// copy generated keys from the saved parent.
    ///
    /// # Errors
    /// - `ScopeError::NotRegistered` if either entity is not part of the model
    /// - `ScopeError::Invalid` if the parent was rolled back or discarded
    pub fn add_child<P, C, F>(
        &mut self,
        parent: &Tracked<P>,
        build: F,
    ) -> Result<Tracked<C>, ScopeError>
    where
        P: DataKeyEntity + 'static,
        P::Model: Sync + 'static,
        C: DataKeyEntity + 'static,
        C::Column: ColumnTrait + Copy,
        C::Model: IntoActiveModel<C::ActiveModel> + Sync + 'static,
        C::ActiveModel: ActiveModelTrait<Entity = C> + ActiveModelBehavior + Send + Sync + 'static,
        F: FnOnce(&P::Model) -> C::ActiveModel + Send + Sync + 'static,
    {
        self.ensure_registered::<P>()?;
        self.ensure_registered::<C>()?;
        if parent.is_dropped() {
            return Err(ScopeError::Invalid("parent row was rolled back or discarded"));
        }
        let (change, tracked) = PendingChildInsert::<P, C>::new(parent, Box::new(build));
        self.pending.push(Box::new(change));
        Ok(tracked)
    }

    /// Queue changes to an existing row. The primary key must be set.
    ///
    /// The flush overwrites the data key and only touches the row if it already
    /// lives in this context's partition.
    ///
    /// # Errors
    /// Returns `ScopeError::NotRegistered` if `E` is not part of the model.
    pub fn update<E>(&mut self, am: E::ActiveModel) -> Result<(), ScopeError>
    where
        E: DataKeyEntity + 'static,
        E::Column: ColumnTrait + Copy,
        E::Model: IntoActiveModel<E::ActiveModel> + Sync + 'static,
        E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync + 'static,
    {
        self.ensure_registered::<E>()?;
        self.pending.push(Box::new(PendingUpdate::<E>::new(am)));
        Ok(())
    }

    /// Queue the removal of a row. The primary key must be set.
    ///
    /// # Errors
    /// Returns `ScopeError::NotRegistered` if `E` is not part of the model.
    pub fn remove<E>(&mut self, am: E::ActiveModel) -> Result<(), ScopeError>
    where
        E: DataKeyEntity + 'static,
        E::Column: ColumnTrait + Copy,
        E::ActiveModel: ActiveModelTrait<Entity = E> + Send + Sync + 'static,
    {
        self.ensure_registered::<E>()?;
        self.pending.push(Box::new(PendingDelete::<E>::new(am)));
        Ok(())
    }

    /// Queue the removal of every row of `E` in this context's partition.
    ///
    /// Unlike [`delete_many`](Self::delete_many) the removal runs inside the next
    /// flush, so several of them either all happen or none does.
    ///
    /// # Errors
    /// Returns `ScopeError::NotRegistered` if `E` is not part of the model.
    pub fn remove_all<E>(&mut self) -> Result<(), ScopeError>
    where
        E: DataKeyEntity + 'static,
        E::Column: ColumnTrait + Copy,
    {
        self.ensure_registered::<E>()?;
        self.pending.push(Box::new(PendingDeleteAll::<E>::default()));
        Ok(())
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop every queued change without writing it.
    ///
    /// [`Tracked`] handles of discarded inserts are never saved.
    pub fn discard_changes(&mut self) {
        drop_all(&std::mem::take(&mut self.pending));
    }

    /// Stamp the context key onto every queued row.
    ///
    /// Runs before both flush paths. A `NoAccess` context discards its queue
    /// instead, so nothing it queued can ever be written.
    fn mark_with_data_key(&mut self) -> Result<String, ScopeError> {
        let Some(key) = self.data_key.as_tenant().map(str::to_owned) else {
            tracing::warn!(
                pending = self.pending.len(),
                "refusing to save changes without a data key"
            );
            drop_all(&std::mem::take(&mut self.pending));
            return Err(ScopeError::Denied("no data key: writes are not allowed"));
        };
        for change in &mut self.pending {
            change.stamp(&key);
        }
        Ok(key)
    }

    /// Write every queued change in one transaction.
    ///
    /// Returns the number of rows written. On error the transaction is rolled back
    /// and the queue is empty.
    ///
    /// # Errors
    /// - `ScopeError::Denied` for a `NoAccess` context, or when an update/delete
    ///   targets a row outside this partition
    /// - `ScopeError::Db` for database failures
    pub async fn save_changes(&mut self) -> Result<u64, ScopeError> {
        let key = self.mark_with_data_key()?;
        self.flush(&key).await
    }

    /// Blocking flavour of [`save_changes`](Self::save_changes) for synchronous
    /// callers.
    ///
    /// # Errors
    /// Same as [`save_changes`](Self::save_changes).
    ///
    /// # Panics
    /// Panics when called from a thread that is already driving a Tokio runtime,
    /// see [`Handle::block_on`](tokio::runtime::Handle::block_on).
    pub fn save_changes_blocking(
        &mut self,
        handle: &tokio::runtime::Handle,
    ) -> Result<u64, ScopeError> {
        let key = self.mark_with_data_key()?;
        handle.block_on(self.flush(&key))
    }

    async fn flush(&mut self, key: &str) -> Result<u64, ScopeError> {
        let mut pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Ok(0);
        }

        let count = pending.len();
        let txn = match self.conn.begin().await {
            Ok(txn) => txn,
            Err(e) => {
                drop_all(&pending);
                return Err(e.into());
            }
        };
        let mut rows = 0u64;
        let mut failure = None;
        for change in &mut pending {
            match change.apply(&txn, key).await {
                Ok(n) => rows += n,
                Err(e) => {
                    tracing::warn!(
                        entity = change.entity(),
                        error = %e,
                        "save failed, rolling back"
                    );
                    failure = Some(e);
                    break;
                }
            }
        }

        if let Some(e) = failure {
            if let Err(rollback) = txn.rollback().await {
                tracing::error!(error = %rollback, "rollback failed");
            }
            drop_all(&pending);
            return Err(e);
        }
        if let Err(e) = txn.commit().await {
            drop_all(&pending);
            return Err(e.into());
        }
        for change in &pending {
            change.committed();
        }

        tracing::debug!(changes = count, rows, "changes saved");
        Ok(rows)
    }
}

fn drop_all(changes: &[Box<dyn PendingChange>]) {
    for change in changes {
        change.dropped();
    }
}
