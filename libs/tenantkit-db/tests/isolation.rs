#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Reads, bulk writes and stamping across data partitions (sqlite, in memory).

mod common;

use common::{book, setup, shelf, stray};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, Set, sea_query::Expr};
use tenantkit_db::secure::{DataKeyContext, ScopeError};
use tenantkit_security::StaticDataKey;

fn new_book(title: &str, data_key: &str) -> book::ActiveModel {
    book::ActiveModel {
        title: Set(title.to_owned()),
        data_key: Set(data_key.to_owned()),
        price: Set(Decimal::new(1250, 2)),
        ..Default::default()
    }
}

#[tokio::test]
async fn stamping_overrides_caller_supplied_key() {
    let db = setup().await.unwrap();
    let mut ctx = db.ctx("k1");

    let tracked = ctx.add::<book::Entity>(new_book("Dune", "k2")).unwrap();
    assert!(!tracked.is_saved());
    assert_eq!(ctx.save_changes().await.unwrap(), 1);

    let saved = tracked.get().unwrap();
    assert_eq!(saved.data_key, "k1");

    let rows = ctx.find::<book::Entity>().unwrap().all(&ctx).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].data_key, "k1");

    // Nothing landed in the partition the caller tried to write to.
    let k2 = db.ctx("k2");
    assert_eq!(k2.find::<book::Entity>().unwrap().count(&k2).await.unwrap(), 0);
}

#[tokio::test]
async fn blank_key_is_stamped_too() {
    let db = setup().await.unwrap();
    let mut ctx = db.ctx("k1");

    ctx.add::<book::Entity>(book::ActiveModel {
        title: Set("No key set".to_owned()),
        price: Set(Decimal::new(325, 2)),
        ..Default::default()
    })
    .unwrap();
    ctx.save_changes().await.unwrap();

    let row = ctx.find::<book::Entity>().unwrap().one(&ctx).await.unwrap().unwrap();
    assert_eq!(row.data_key, "k1");
    assert_eq!(row.price, Decimal::new(325, 2));
}

#[tokio::test]
async fn partitions_never_see_each_other() {
    let db = setup().await.unwrap();

    let mut k1 = db.ctx("k1");
    k1.add::<book::Entity>(new_book("A", "")).unwrap();
    k1.add::<book::Entity>(new_book("B", "")).unwrap();
    k1.save_changes().await.unwrap();

    let mut k2 = db.ctx("k2");
    let other = k2.add::<book::Entity>(new_book("C", "")).unwrap();
    k2.save_changes().await.unwrap();
    let other_id = other.get().unwrap().id;

    let mine = k1.find::<book::Entity>().unwrap().all(&k1).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|b| b.data_key == "k1"));

    let by_id = k1
        .find_by_id::<book::Entity, _>(other_id)
        .unwrap()
        .one(&k1)
        .await
        .unwrap();
    assert!(by_id.is_none());

    let filtered = k1
        .find::<book::Entity>()
        .unwrap()
        .filter(book::Column::Title.eq("C"))
        .all(&k1)
        .await
        .unwrap();
    assert!(filtered.is_empty());

    let theirs = k2.find::<book::Entity>().unwrap().all(&k2).await.unwrap();
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].title, "C");
}

#[tokio::test]
async fn no_access_context_sees_nothing() {
    let db = setup().await.unwrap();
    let mut k1 = db.ctx("k1");
    k1.add::<book::Entity>(new_book("A", "")).unwrap();
    k1.add::<shelf::Entity>(shelf::ActiveModel {
        label: Set("top".to_owned()),
        ..Default::default()
    })
    .unwrap();
    k1.save_changes().await.unwrap();

    let anon = DataKeyContext::new(db.conn.clone(), db.model.clone(), &StaticDataKey::none());
    assert!(anon.data_key().is_no_access());
    assert!(anon.find::<book::Entity>().unwrap().all(&anon).await.unwrap().is_empty());
    assert!(anon.find::<shelf::Entity>().unwrap().all(&anon).await.unwrap().is_empty());
    assert_eq!(anon.find::<book::Entity>().unwrap().count(&anon).await.unwrap(), 0);
}

#[tokio::test]
async fn unregistered_entity_is_refused() {
    let db = setup().await.unwrap();
    let ctx = db.ctx("k1");
    assert!(matches!(
        ctx.find::<stray::Entity>(),
        Err(ScopeError::NotRegistered(name)) if name.contains("stray")
    ));
}

#[tokio::test]
async fn bulk_update_stays_in_partition() {
    let db = setup().await.unwrap();
    let mut k1 = db.ctx("k1");
    k1.add::<book::Entity>(new_book("A", "")).unwrap();
    k1.save_changes().await.unwrap();
    let mut k2 = db.ctx("k2");
    k2.add::<book::Entity>(new_book("A", "")).unwrap();
    k2.save_changes().await.unwrap();

    let res = k1
        .update_many::<book::Entity>()
        .unwrap()
        .col_expr(book::Column::Title, Expr::value("A (2nd ed.)"))
        .unwrap()
        .exec(&k1)
        .await
        .unwrap();
    assert_eq!(res.rows_affected, 1);

    let theirs = k2.find::<book::Entity>().unwrap().one(&k2).await.unwrap().unwrap();
    assert_eq!(theirs.title, "A");

    let moved = k1
        .update_many::<book::Entity>()
        .unwrap()
        .col_expr(book::Column::DataKey, Expr::value("k2"));
    assert!(matches!(moved, Err(ScopeError::Denied(_))));
}

#[tokio::test]
async fn bulk_delete_stays_in_partition() {
    let db = setup().await.unwrap();
    for key in ["k1", "k2"] {
        let mut ctx = db.ctx(key);
        ctx.add::<book::Entity>(new_book("A", "")).unwrap();
        ctx.add::<book::Entity>(new_book("B", "")).unwrap();
        ctx.save_changes().await.unwrap();
    }

    let k1 = db.ctx("k1");
    let res = k1
        .delete_many::<book::Entity>()
        .unwrap()
        .filter(book::Column::Title.eq("A"))
        .exec(&k1)
        .await
        .unwrap();
    assert_eq!(res.rows_affected, 1);

    let k2 = db.ctx("k2");
    assert_eq!(k2.find::<book::Entity>().unwrap().count(&k2).await.unwrap(), 2);

    assert!(matches!(
        db.no_access_ctx().delete_many::<book::Entity>(),
        Err(ScopeError::Denied(_))
    ));
}
