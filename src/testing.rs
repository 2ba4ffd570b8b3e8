// Shared fixtures for unit tests: an in-memory database and a scripted gateway

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use entities::{books, sessions, users};
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use uuid::Uuid;

use crate::gate::payment::{
    GatewayError, PaymentGateway, TransactionStatus, TransactionVerification,
};

pub async fn test_db() -> Arc<DatabaseConnection> {
    // one connection: every pooled connection to :memory: would be its own database
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Arc::new(db)
}

/// SQLite file shared by a pool of `connections`, so concurrent writes really
/// overlap. The file is removed on drop.
pub struct FileDb {
    pub db: Arc<DatabaseConnection>,
    path: PathBuf,
}

impl Drop for FileDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

pub async fn file_db(connections: u32) -> FileDb {
    let path = std::env::temp_dir().join(format!("bookgate-test-{}.db", Uuid::new_v4()));
    let mut opts = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
    opts.max_connections(connections)
        .min_connections(connections)
        .sqlx_logging(false);
    let db = Database::connect(opts).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    FileDb {
        db: Arc::new(db),
        path,
    }
}

pub async fn seed_user(db: &DatabaseConnection) -> Uuid {
    let id = Uuid::new_v4();
    users::ActiveModel {
        id: Set(id),
        username: Set(format!("reader-{id}")),
        email: Set(None),
        role: Set("user".into()),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap();
    id
}

pub async fn seed_book(db: &DatabaseConnection, page_count: i32, price_minor: i64) -> Uuid {
    let id = Uuid::new_v4();
    books::ActiveModel {
        id: Set(id),
        title: Set(format!("Book {id}")),
        page_count: Set(page_count),
        price_minor: Set(price_minor),
        currency: Set("NGN".into()),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap();
    id
}

pub async fn seed_session(
    db: &DatabaseConnection,
    user_id: Uuid,
    token: &str,
    expires_at: DateTime<Utc>,
) {
    sessions::ActiveModel {
        token: Set(token.to_string()),
        user_id: Set(user_id),
        expires_at: Set(expires_at),
    }
    .insert(db)
    .await
    .unwrap();
}

/// Answers from a fixed table; unknown references come back as failed transactions.
#[derive(Default)]
pub struct FakeGateway {
    responses: Mutex<HashMap<String, Result<TransactionVerification, GatewayError>>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl FakeGateway {
    pub fn respond(&self, reference: &str, result: Result<TransactionVerification, GatewayError>) {
        self.responses
            .lock()
            .unwrap()
            .insert(reference.to_string(), result);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PaymentGateway for FakeGateway {
    async fn verify_transaction(
        &self,
        reference: &str,
    ) -> Result<TransactionVerification, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.responses.lock().unwrap().get(reference).cloned();
        scripted.unwrap_or_else(|| {
            Ok(TransactionVerification {
                status: TransactionStatus::Failure,
                attributed_amount: 0,
                attributed_reference: reference.to_string(),
                currency: None,
                attributed_viewer: None,
                attributed_document: None,
            })
        })
    }
}
