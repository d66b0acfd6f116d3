//! Pending changes queued on a [`DataKeyContext`](super::DataKeyContext).
//!
//! Each change is stamped with the context key right before the flush and then
//! applied inside the flush transaction. Updates and deletes carry the key
//! predicate as well, so a change can never reach a row of another partition.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, Value,
};

use crate::secure::{DataKeyEntity, ScopeError};

const QUEUED: u8 = 0;
const SAVED: u8 = 1;
const DROPPED: u8 = 2;

struct Slot<M> {
    model: OnceLock<M>,
    state: AtomicU8,
}

/// Handle to a row queued for insertion.
///
/// The stored model (with generated keys and the stamped data key) becomes
/// available once the owning context has committed the flush. A handle whose
/// change was rolled back or discarded is dropped for good: it is never saved and
/// children can no longer be queued against it.
pub struct Tracked<E: EntityTrait> {
    slot: Arc<Slot<E::Model>>,
}

impl<E: EntityTrait> Tracked<E> {
    fn new() -> Self {
        Self {
            slot: Arc::new(Slot {
                model: OnceLock::new(),
                state: AtomicU8::new(QUEUED),
            }),
        }
    }

    /// The saved row, or `None` until a flush containing it has committed.
    #[must_use]
    pub fn get(&self) -> Option<&E::Model> {
        if self.is_saved() {
            self.slot.model.get()
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_saved(&self) -> bool {
        self.slot.state.load(Ordering::Acquire) == SAVED
    }

    /// Whether the change behind this handle was rolled back or discarded.
    #[must_use]
    pub fn is_dropped(&self) -> bool {
        self.slot.state.load(Ordering::Acquire) == DROPPED
    }

    /// Row written in the running flush transaction or by an earlier committed
    /// flush. A row left over from a rolled back flush is never returned.
    fn staged(&self) -> Option<&E::Model> {
        if self.is_dropped() {
            None
        } else {
            self.slot.model.get()
        }
    }

    fn stage(&self, model: E::Model) {
        if self.slot.model.set(model).is_err() {
            tracing::debug!(entity = std::any::type_name::<E>(), "row staged twice");
        }
    }

    fn commit(&self) {
        self.settle(SAVED);
    }

    fn drop_change(&self) {
        self.settle(DROPPED);
    }

    // A handle is settled once; later transitions are ignored.
    fn settle(&self, state: u8) {
        if self
            .slot
            .state
            .compare_exchange(QUEUED, state, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(
                entity = std::any::type_name::<E>(),
                "tracked row already settled"
            );
        }
    }
}

impl<E: EntityTrait> Clone for Tracked<E> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<E: EntityTrait> fmt::Debug for Tracked<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("entity", &std::any::type_name::<E>())
            .field("saved", &self.is_saved())
            .finish()
    }
}

/// One queued write.
#[async_trait]
pub trait PendingChange: Send + Sync {
    fn entity(&self) -> &'static str;

    /// Overwrite the data key of the queued row.
    fn stamp(&mut self, key: &str);

    /// Apply the change inside `txn`, returning the number of rows written.
    async fn apply(&mut self, txn: &DatabaseTransaction, key: &str) -> Result<u64, ScopeError>;

    /// Called once the flush transaction has committed.
    fn committed(&self) {}

    /// Called when the change is thrown away: its flush rolled back, or the queue
    /// was discarded before a flush.
    fn dropped(&self) {}
}

const APPLIED_TWICE: ScopeError = ScopeError::Invalid("pending change applied twice");

fn stamp_active<E>(am: &mut E::ActiveModel, key: &str)
where
    E: DataKeyEntity,
    E::ActiveModel: ActiveModelTrait<Entity = E>,
{
    if let Some(col) = E::data_key_col() {
        am.set(col, Value::from(key.to_owned()));
    }
}

pub struct PendingInsert<E: EntityTrait> {
    am: Option<E::ActiveModel>,
    tracked: Tracked<E>,
}

impl<E: EntityTrait> PendingInsert<E> {
    pub fn new(am: E::ActiveModel) -> (Self, Tracked<E>) {
        let tracked = Tracked::new();
        (
            Self {
                am: Some(am),
                tracked: tracked.clone(),
            },
            tracked,
        )
    }
}

#[async_trait]
impl<E> PendingChange for PendingInsert<E>
where
    E: DataKeyEntity,
    E::Model: IntoActiveModel<E::ActiveModel> + Sync,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync,
{
    fn entity(&self) -> &'static str {
        std::any::type_name::<E>()
    }

    fn stamp(&mut self, key: &str) {
        if let Some(am) = self.am.as_mut() {
            stamp_active::<E>(am, key);
        }
    }

    async fn apply(&mut self, txn: &DatabaseTransaction, _key: &str) -> Result<u64, ScopeError> {
        let am = self.am.take().ok_or(APPLIED_TWICE)?;
        let model = am.insert(txn).await?;
        self.tracked.stage(model);
        Ok(1)
    }

    fn committed(&self) {
        self.tracked.commit();
    }

    fn dropped(&self) {
        self.tracked.drop_change();
    }
}

type ChildBuilder<P, C> =
    Box<dyn FnOnce(&<P as EntityTrait>::Model) -> <C as EntityTrait>::ActiveModel + Send + Sync>;

/// A child row whose contents depend on a parent inserted earlier in the same
/// flush (typically to copy the generated parent id).
pub struct PendingChildInsert<P: EntityTrait, C: EntityTrait> {
    parent: Tracked<P>,
    build: Option<ChildBuilder<P, C>>,
    tracked: Tracked<C>,
}

impl<P: EntityTrait, C: EntityTrait> PendingChildInsert<P, C> {
    pub fn new(parent: &Tracked<P>, build: ChildBuilder<P, C>) -> (Self, Tracked<C>) {
        let tracked = Tracked::new();
        (
            Self {
                parent: parent.clone(),
                build: Some(build),
                tracked: tracked.clone(),
            },
            tracked,
        )
    }
}

#[async_trait]
impl<P, C> PendingChange for PendingChildInsert<P, C>
where
    P: EntityTrait,
    P::Model: Sync,
    C: DataKeyEntity,
    C::Model: IntoActiveModel<C::ActiveModel> + Sync,
    C::ActiveModel: ActiveModelTrait<Entity = C> + ActiveModelBehavior + Send + Sync,
{
    fn entity(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    // The row does not exist until the parent is written; `apply` stamps it.
    fn stamp(&mut self, _key: &str) {}

    async fn apply(&mut self, txn: &DatabaseTransaction, key: &str) -> Result<u64, ScopeError> {
        let build = self.build.take().ok_or(APPLIED_TWICE)?;
        if self.parent.is_dropped() {
            return Err(ScopeError::Invalid(
                "parent row was rolled back or discarded",
            ));
        }
        let Some(parent) = self.parent.staged() else {
            return Err(ScopeError::Invalid(
                "child row queued before its parent was added to the context",
            ));
        };
        let mut am = build(parent);
        stamp_active::<C>(&mut am, key);
        let model = am.insert(txn).await?;
        self.tracked.stage(model);
        Ok(1)
    }

    fn committed(&self) {
        self.tracked.commit();
    }

    fn dropped(&self) {
        self.tracked.drop_change();
    }
}

pub struct PendingUpdate<E: EntityTrait> {
    am: Option<E::ActiveModel>,
}

impl<E: EntityTrait> PendingUpdate<E> {
    pub fn new(am: E::ActiveModel) -> Self {
        Self { am: Some(am) }
    }
}

#[async_trait]
impl<E> PendingChange for PendingUpdate<E>
where
    E: DataKeyEntity,
    E::Column: ColumnTrait + Copy,
    E::Model: IntoActiveModel<E::ActiveModel> + Sync,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync,
{
    fn entity(&self) -> &'static str {
        std::any::type_name::<E>()
    }

    fn stamp(&mut self, key: &str) {
        if let Some(am) = self.am.as_mut() {
            stamp_active::<E>(am, key);
        }
    }

    async fn apply(&mut self, txn: &DatabaseTransaction, key: &str) -> Result<u64, ScopeError> {
        let am = self.am.take().ok_or(APPLIED_TWICE)?;
        let Some(col) = E::data_key_col() else {
            return Err(ScopeError::Invalid("entity has no data key column"));
        };
        match E::update(am).filter(col.eq(key)).exec(txn).await {
            Ok(_) => Ok(1),
            Err(DbErr::RecordNotUpdated) => Err(ScopeError::Denied(
                "entity not found in the current data partition",
            )),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct PendingDelete<E: EntityTrait> {
    am: Option<E::ActiveModel>,
}

impl<E: EntityTrait> PendingDelete<E> {
    pub fn new(am: E::ActiveModel) -> Self {
        Self { am: Some(am) }
    }
}

#[async_trait]
impl<E> PendingChange for PendingDelete<E>
where
    E: DataKeyEntity,
    E::Column: ColumnTrait + Copy,
    E::ActiveModel: ActiveModelTrait<Entity = E> + Send + Sync,
{
    fn entity(&self) -> &'static str {
        std::any::type_name::<E>()
    }

    // Deleted rows keep their key; the predicate below decides whether they match.
    fn stamp(&mut self, _key: &str) {}

    async fn apply(&mut self, txn: &DatabaseTransaction, key: &str) -> Result<u64, ScopeError> {
        let am = self.am.take().ok_or(APPLIED_TWICE)?;
        let Some(col) = E::data_key_col() else {
            return Err(ScopeError::Invalid("entity has no data key column"));
        };
        let res = E::delete(am).filter(col.eq(key)).exec(txn).await?;
        if res.rows_affected == 0 {
            return Err(ScopeError::Denied(
                "entity not found in the current data partition",
            ));
        }
        Ok(res.rows_affected)
    }
}

/// Every row of the partition, removed as one step of the flush.
pub struct PendingDeleteAll<E: EntityTrait> {
    applied: bool,
    _entity: std::marker::PhantomData<fn() -> E>,
}

impl<E: EntityTrait> Default for PendingDeleteAll<E> {
    fn default() -> Self {
        Self {
            applied: false,
            _entity: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<E> PendingChange for PendingDeleteAll<E>
where
    E: DataKeyEntity,
    E::Column: ColumnTrait + Copy,
{
    fn entity(&self) -> &'static str {
        std::any::type_name::<E>()
    }

    fn stamp(&mut self, _key: &str) {}

    async fn apply(&mut self, txn: &DatabaseTransaction, key: &str) -> Result<u64, ScopeError> {
        if std::mem::replace(&mut self.applied, true) {
            return Err(APPLIED_TWICE);
        }
        let Some(col) = E::data_key_col() else {
            return Err(ScopeError::Invalid("entity has no data key column"));
        };
        let res = E::delete_many().filter(col.eq(key)).exec(txn).await?;
        Ok(res.rows_affected)
    }
}
