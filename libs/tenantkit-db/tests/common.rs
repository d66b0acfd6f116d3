#![allow(clippy::unwrap_used, clippy::expect_used, clippy::use_debug)]
#![allow(dead_code)]
use std::sync::{Arc, Mutex};

use anyhow::Result;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use tenantkit_db::secure::{DataKey, DataKeyContext, TenantModel};
use tenantkit_db::{DbConfig, connect};

pub mod shelf {
    use sea_orm::entity::prelude::*;
    use tenantkit_db::secure::DataKeyed;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, DataKeyed)]
    #[sea_orm(table_name = "shelves")]
    #[data_key(col = "data_key")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub data_key: String,
        pub label: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod book {
    use sea_orm::entity::prelude::*;
    use tenantkit_db::secure::DataKeyed;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, DataKeyed)]
    #[sea_orm(table_name = "books")]
    #[data_key(col = "data_key")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub data_key: String,
        pub shelf_id: Option<i32>,
        pub title: String,
        pub price: Decimal,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Registered nowhere; used to check the registration guard.
pub mod stray {
    use sea_orm::entity::prelude::*;
    use tenantkit_db::secure::DataKeyed;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, DataKeyed)]
    #[sea_orm(table_name = "strays")]
    #[data_key(col = "data_key")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub data_key: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub struct TestDb {
    pub conn: DatabaseConnection,
    pub model: Arc<TenantModel>,
}

impl TestDb {
    pub fn ctx(&self, key: &str) -> DataKeyContext {
        DataKeyContext::with_data_key(
            self.conn.clone(),
            Arc::clone(&self.model),
            DataKey::tenant(key),
        )
    }

    pub fn no_access_ctx(&self) -> DataKeyContext {
        DataKeyContext::with_data_key(
            self.conn.clone(),
            Arc::clone(&self.model),
            DataKey::NoAccess,
        )
    }
}

/// Fresh in-memory database with the library tables created.
pub async fn setup() -> Result<TestDb> {
    let conn = connect(&DbConfig::default()).await?;
    let model = Arc::new(
        TenantModel::builder()
            .entity::<shelf::Entity>()
            .entity::<book::Entity>()
            .build()?,
    );

    let backend = conn.get_database_backend();
    for stmt in model.create_table_statements(backend) {
        conn.execute(backend.build(&stmt)).await?;
    }
    for stmt in model.create_index_statements(backend) {
        conn.execute(backend.build(&stmt)).await?;
    }

    Ok(TestDb { conn, model })
}

/// Collects the messages of WARN events.
#[derive(Clone, Default)]
pub struct WarningCapture {
    pub warnings: Arc<Mutex<Vec<String>>>,
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarningCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::WARN {
            let mut visitor = MessageVisitor(String::new());
            event.record(&mut visitor);
            self.warnings.lock().unwrap().push(visitor.0);
        }
    }
}

struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}
