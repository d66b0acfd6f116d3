#![allow(clippy::unwrap_used, clippy::expect_used, clippy::use_debug)]
//! Flush behaviour: tracked updates and deletes, rollback, the no-key refusal and
//! the blocking flush path.

mod common;

use common::{WarningCapture, book, setup, shelf};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue::NotSet, Set};
use tenantkit_db::secure::ScopeError;
use tracing_subscriber::layer::SubscriberExt;

fn new_book(title: &str) -> book::ActiveModel {
    book::ActiveModel {
        title: Set(title.to_owned()),
        price: Set(Decimal::new(775, 2)),
        ..Default::default()
    }
}

#[tokio::test]
async fn update_is_stamped_and_scoped() {
    let db = setup().await.unwrap();
    let mut k1 = db.ctx("k1");
    let saved = k1.add::<book::Entity>(new_book("Draft")).unwrap();
    k1.save_changes().await.unwrap();
    let id = saved.get().unwrap().id;

    k1.update::<book::Entity>(book::ActiveModel {
        id: Set(id),
        title: Set("Final".to_owned()),
        data_key: Set("k9".to_owned()),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(k1.save_changes().await.unwrap(), 1);

    let row = k1.find_by_id::<book::Entity, _>(id).unwrap().one(&k1).await.unwrap().unwrap();
    assert_eq!(row.title, "Final");
    assert_eq!(row.data_key, "k1");
}

#[tokio::test]
async fn foreign_rows_cannot_be_updated_or_removed() {
    let db = setup().await.unwrap();
    let mut k2 = db.ctx("k2");
    let theirs = k2.add::<book::Entity>(new_book("Theirs")).unwrap();
    k2.save_changes().await.unwrap();
    let id = theirs.get().unwrap().id;

    let mut k1 = db.ctx("k1");
    k1.update::<book::Entity>(book::ActiveModel {
        id: Set(id),
        title: Set("Hijacked".to_owned()),
        ..Default::default()
    })
    .unwrap();
    assert!(matches!(k1.save_changes().await, Err(ScopeError::Denied(_))));

    k1.remove::<book::Entity>(book::ActiveModel {
        id: Set(id),
        ..Default::default()
    })
    .unwrap();
    assert!(matches!(k1.save_changes().await, Err(ScopeError::Denied(_))));

    let row = k2.find_by_id::<book::Entity, _>(id).unwrap().one(&k2).await.unwrap().unwrap();
    assert_eq!(row.title, "Theirs");
    assert_eq!(row.data_key, "k2");
}

#[tokio::test]
async fn remove_own_row() {
    let db = setup().await.unwrap();
    let mut k1 = db.ctx("k1");
    let saved = k1.add::<book::Entity>(new_book("Old")).unwrap();
    k1.save_changes().await.unwrap();

    k1.remove::<book::Entity>(book::ActiveModel {
        id: Set(saved.get().unwrap().id),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(k1.save_changes().await.unwrap(), 1);
    assert_eq!(k1.find::<book::Entity>().unwrap().count(&k1).await.unwrap(), 0);
}

#[tokio::test]
async fn failed_flush_rolls_back_everything() {
    let db = setup().await.unwrap();
    let mut k1 = db.ctx("k1");

    let added = k1.add::<book::Entity>(new_book("Kept?")).unwrap();
    k1.update::<book::Entity>(book::ActiveModel {
        id: Set(4242),
        title: Set("Ghost".to_owned()),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(k1.pending_count(), 2);

    assert!(k1.save_changes().await.is_err());
    assert_eq!(k1.pending_count(), 0);
    assert!(!added.is_saved());
    assert!(added.is_dropped());
    assert_eq!(k1.find::<book::Entity>().unwrap().count(&k1).await.unwrap(), 0);
}

#[tokio::test]
async fn rolled_back_parent_takes_no_children() {
    let db = setup().await.unwrap();
    let mut k1 = db.ctx("k1");
    let lost = k1
        .add::<shelf::Entity>(shelf::ActiveModel {
            id: NotSet,
            data_key: NotSet,
            label: Set("Lost".to_owned()),
        })
        .unwrap();
    k1.update::<book::Entity>(book::ActiveModel {
        id: Set(4242),
        title: Set("Ghost".to_owned()),
        ..Default::default()
    })
    .unwrap();

    // Queued elsewhere while the parent still looks pending.
    let mut other = db.ctx("k1");
    other
        .add_child::<shelf::Entity, book::Entity, _>(&lost, |s| book::ActiveModel {
            shelf_id: Set(Some(s.id)),
            ..new_book("Early orphan")
        })
        .unwrap();

    assert!(k1.save_changes().await.is_err());
    assert!(lost.is_dropped());
    assert!(!lost.is_saved());
    assert!(lost.get().is_none());

    let next = k1
        .add::<shelf::Entity>(shelf::ActiveModel {
            id: NotSet,
            data_key: NotSet,
            label: Set("Next".to_owned()),
        })
        .unwrap();
    k1.save_changes().await.unwrap();
    assert!(next.is_saved());

    assert!(matches!(
        other.save_changes().await,
        Err(ScopeError::Invalid(_))
    ));
    let late = k1.add_child::<shelf::Entity, book::Entity, _>(&lost, |s| book::ActiveModel {
        shelf_id: Set(Some(s.id)),
        ..new_book("Late orphan")
    });
    assert!(matches!(late, Err(ScopeError::Invalid(_))));

    assert_eq!(k1.find::<book::Entity>().unwrap().count(&k1).await.unwrap(), 0);
}

#[tokio::test]
async fn child_rows_see_their_saved_parent() {
    let db = setup().await.unwrap();
    let mut k1 = db.ctx("k1");

    let parent = k1
        .add::<shelf::Entity>(shelf::ActiveModel {
            id: NotSet,
            data_key: Set("k2".to_owned()),
            label: Set("Sci-fi".to_owned()),
        })
        .unwrap();
    let child = k1
        .add_child::<shelf::Entity, book::Entity, _>(&parent, |s| book::ActiveModel {
            shelf_id: Set(Some(s.id)),
            ..new_book("Solaris")
        })
        .unwrap();
    assert_eq!(k1.save_changes().await.unwrap(), 2);

    let shelf = parent.get().unwrap();
    let book = child.get().unwrap();
    assert_eq!(shelf.data_key, "k1");
    assert_eq!(book.data_key, "k1");
    assert_eq!(book.shelf_id, Some(shelf.id));
}

#[tokio::test]
async fn no_access_refuses_to_write() {
    let db = setup().await.unwrap();

    let capture = WarningCapture::default();
    let warnings = capture.warnings.clone();
    let subscriber = tracing_subscriber::registry().with(capture);
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut anon = db.no_access_ctx();
    anon.add::<book::Entity>(new_book("Sneaky")).unwrap();
    assert!(matches!(anon.save_changes().await, Err(ScopeError::Denied(_))));
    assert_eq!(anon.pending_count(), 0);

    for key in ["k1", "k2"] {
        let ctx = db.ctx(key);
        assert_eq!(ctx.find::<book::Entity>().unwrap().count(&ctx).await.unwrap(), 0);
    }

    let captured = warnings.lock().unwrap();
    assert!(
        captured.iter().any(|w| w.contains("without a data key")),
        "expected a refusal warning, got: {:?}",
        *captured
    );
}

#[test]
fn blocking_flush_applies_the_same_stamping() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let db = rt.block_on(setup()).unwrap();

    let mut k1 = db.ctx("k1");
    let tracked = k1
        .add::<book::Entity>(book::ActiveModel {
            data_key: Set("k2".to_owned()),
            ..new_book("Blocking")
        })
        .unwrap();
    assert_eq!(k1.save_changes_blocking(rt.handle()).unwrap(), 1);
    assert_eq!(tracked.get().unwrap().data_key, "k1");

    let mut anon = db.no_access_ctx();
    anon.add::<book::Entity>(new_book("Nope")).unwrap();
    assert!(matches!(
        anon.save_changes_blocking(rt.handle()),
        Err(ScopeError::Denied(_))
    ));

    let count = rt
        .block_on(async {
            let k2 = db.ctx("k2");
            k2.find::<book::Entity>().unwrap().count(&k2).await
        })
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn discarded_changes_are_never_written() {
    let db = setup().await.unwrap();
    let mut k1 = db.ctx("k1");
    let tracked = k1.add::<book::Entity>(new_book("Scratch")).unwrap();
    assert_eq!(k1.pending_count(), 1);

    k1.discard_changes();
    assert_eq!(k1.pending_count(), 0);
    assert_eq!(k1.save_changes().await.unwrap(), 0);
    assert!(!tracked.is_saved());
    assert!(tracked.is_dropped());
    assert_eq!(k1.find::<book::Entity>().unwrap().count(&k1).await.unwrap(), 0);
}

#[tokio::test]
async fn remove_all_clears_only_the_own_partition_in_one_flush() {
    let db = setup().await.unwrap();
    for key in ["k1", "k2"] {
        let mut ctx = db.ctx(key);
        ctx.add::<book::Entity>(new_book("Dune")).unwrap();
        ctx.add::<book::Entity>(new_book("Emma")).unwrap();
        ctx.save_changes().await.unwrap();
    }

    let mut k1 = db.ctx("k1");
    k1.remove_all::<book::Entity>().unwrap();
    k1.update::<book::Entity>(book::ActiveModel {
        id: Set(4242),
        title: Set("Ghost".to_owned()),
        ..Default::default()
    })
    .unwrap();
    assert!(k1.save_changes().await.is_err());
    assert_eq!(k1.find::<book::Entity>().unwrap().count(&k1).await.unwrap(), 2);

    k1.remove_all::<book::Entity>().unwrap();
    assert_eq!(k1.save_changes().await.unwrap(), 2);
    assert_eq!(k1.find::<book::Entity>().unwrap().count(&k1).await.unwrap(), 0);

    let k2 = db.ctx("k2");
    assert_eq!(k2.find::<book::Entity>().unwrap().count(&k2).await.unwrap(), 2);
}
