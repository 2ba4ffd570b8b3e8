use std::sync::Arc;

use chrono::Utc;
use entities::{books, reading_progress, sessions};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set, SqlErr,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use super::{CatalogStore, ProgressStore, StoreError, StoreResult};
use crate::{
    domain::{
        mapping::{map_book_to_document, map_progress, page_to_column},
        models::{Document, DocumentId, ReadingProgress, ViewerId},
    },
    gate::session::Authenticator,
};

pub struct SeaOrmProgressStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmProgressStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn conflict_target() -> OnConflict {
        OnConflict::columns([
            reading_progress::Column::UserId,
            reading_progress::Column::BookId,
        ])
    }

    async fn fetch_written(
        &self,
        viewer_id: ViewerId,
        document_id: DocumentId,
    ) -> StoreResult<ReadingProgress> {
        self.get(viewer_id, document_id).await?.ok_or_else(|| {
            StoreError::Unavailable(format!(
                "progress row for viewer {viewer_id} and book {document_id} missing after write"
            ))
        })
    }

    /// Inserts a paid row, or flips an existing unpaid one. Returns the number
    /// of rows that became paid.
    async fn write_paid(
        &self,
        viewer_id: ViewerId,
        document_id: DocumentId,
        payment_reference: &str,
    ) -> Result<u64, DbErr> {
        let now = Utc::now();
        let seed = reading_progress::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(viewer_id),
            book_id: Set(document_id),
            current_page: Set(1),
            has_paid: Set(true),
            payment_reference: Set(Some(payment_reference.to_string())),
            paid_at: Set(Some(now)),
            last_accessed_at: Set(now),
        };

        let inserted = reading_progress::Entity::insert(seed)
            .on_conflict(Self::conflict_target().do_nothing().to_owned())
            .exec_without_returning(self.db.as_ref())
            .await?;
        if inserted > 0 {
            return Ok(inserted);
        }

        // Compare-and-set on has_paid: only an unpaid row is flipped, and only
        // the paid columns are written.
        let updated = reading_progress::Entity::update_many()
            .col_expr(reading_progress::Column::HasPaid, Expr::value(true))
            .col_expr(
                reading_progress::Column::PaymentReference,
                Expr::value(payment_reference.to_string()),
            )
            .col_expr(reading_progress::Column::PaidAt, Expr::value(now))
            .filter(reading_progress::Column::UserId.eq(viewer_id))
            .filter(reading_progress::Column::BookId.eq(document_id))
            .filter(reading_progress::Column::HasPaid.eq(false))
            .exec(self.db.as_ref())
            .await?;
        Ok(updated.rows_affected)
    }
}

#[async_trait::async_trait]
impl ProgressStore for SeaOrmProgressStore {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn get(
        &self,
        viewer_id: ViewerId,
        document_id: DocumentId,
    ) -> StoreResult<Option<ReadingProgress>> {
        let row = reading_progress::Entity::find()
            .filter(reading_progress::Column::UserId.eq(viewer_id))
            .filter(reading_progress::Column::BookId.eq(document_id))
            .one(self.db.as_ref())
            .await?;
        Ok(row.map(map_progress))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn advance_page(
        &self,
        viewer_id: ViewerId,
        document_id: DocumentId,
        page: u32,
    ) -> StoreResult<ReadingProgress> {
        let now = Utc::now();
        let row = reading_progress::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(viewer_id),
            book_id: Set(document_id),
            current_page: Set(page_to_column(page.max(1))),
            has_paid: Set(false),
            payment_reference: Set(None),
            paid_at: Set(None),
            last_accessed_at: Set(now),
        };

        // Single upsert; on conflict only the page columns move so a concurrent
        // mark_paid cannot be undone.
        reading_progress::Entity::insert(row)
            .on_conflict(
                Self::conflict_target()
                    .update_columns([
                        reading_progress::Column::CurrentPage,
                        reading_progress::Column::LastAccessedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;

        tracing::debug!(%viewer_id, %document_id, page, "recorded reading progress");
        self.fetch_written(viewer_id, document_id).await
    }

    #[tracing::instrument(level = "debug", skip(self, payment_reference))]
    async fn mark_paid(
        &self,
        viewer_id: ViewerId,
        document_id: DocumentId,
        payment_reference: &str,
    ) -> StoreResult<ReadingProgress> {
        if let Some(existing) = self.get(viewer_id, document_id).await? {
            if existing.has_paid {
                tracing::debug!(%viewer_id, %document_id, "book already paid, record left unchanged");
                return Ok(existing);
            }
        }

        match self.write_paid(viewer_id, document_id, payment_reference).await {
            Ok(0) => {
                tracing::debug!(%viewer_id, %document_id, "book already paid, record left unchanged");
            }
            Ok(_) => tracing::info!(%viewer_id, %document_id, "marked book as paid"),
            Err(err) if is_unique_violation(&err) => {
                // Either a concurrent confirmation for this pair got there first,
                // or the reference belongs to another row.
                if let Some(progress) = self.get(viewer_id, document_id).await? {
                    if progress.has_paid {
                        return Ok(progress);
                    }
                }
                tracing::warn!(%viewer_id, %document_id, "payment reference already recorded elsewhere");
                return Err(StoreError::ReferenceInUse(payment_reference.to_string()));
            }
            Err(err) => return Err(err.into()),
        }
        self.fetch_written(viewer_id, document_id).await
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub struct SeaOrmCatalogStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmCatalogStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl CatalogStore for SeaOrmCatalogStore {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_document(&self, document_id: DocumentId) -> StoreResult<Option<Document>> {
        let book = books::Entity::find_by_id(document_id)
            .one(self.db.as_ref())
            .await?;
        Ok(book.map(map_book_to_document))
    }
}

/// Resolves bearer tokens against the `sessions` table.
pub struct SeaOrmSessionStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmSessionStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl Authenticator for SeaOrmSessionStore {
    #[tracing::instrument(level = "debug", skip(self, token))]
    async fn identify(&self, token: &str) -> StoreResult<Option<ViewerId>> {
        let session = sessions::Entity::find_by_id(token.to_string())
            .filter(sessions::Column::ExpiresAt.gt(Utc::now()))
            .one(self.db.as_ref())
            .await?;
        Ok(session.map(|s| s.user_id))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::testing::{file_db, seed_book, seed_session, seed_user, test_db};

    #[tokio::test]
    async fn get_on_miss_is_none() {
        let db = test_db().await;
        let store = SeaOrmProgressStore::new(db.clone());
        let user = seed_user(&db).await;
        let book = seed_book(&db, 10, 150_000).await;

        assert_eq!(store.get(user, book).await.unwrap(), None);
    }

    #[tokio::test]
    async fn advance_page_creates_then_updates() {
        let db = test_db().await;
        let store = SeaOrmProgressStore::new(db.clone());
        let user = seed_user(&db).await;
        let book = seed_book(&db, 10, 150_000).await;

        let created = store.advance_page(user, book, 2).await.unwrap();
        assert_eq!(created.current_page, 2);
        assert!(!created.has_paid);
        assert_eq!(created.payment_reference, None);

        let updated = store.advance_page(user, book, 3).await.unwrap();
        assert_eq!(updated.current_page, 3);
        assert!(updated.last_accessed_at >= created.last_accessed_at);
        assert_eq!(store.get(user, book).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn mark_paid_without_row_creates_paid_record_on_page_one() {
        let db = test_db().await;
        let store = SeaOrmProgressStore::new(db.clone());
        let user = seed_user(&db).await;
        let book = seed_book(&db, 10, 150_000).await;

        let paid = store.mark_paid(user, book, "ref-123").await.unwrap();
        assert_eq!(paid.current_page, 1);
        assert!(paid.has_paid);
        assert_eq!(paid.payment_reference.as_deref(), Some("ref-123"));
        assert!(paid.paid_at.is_some());
    }

    #[tokio::test]
    async fn mark_paid_keeps_current_page() {
        let db = test_db().await;
        let store = SeaOrmProgressStore::new(db.clone());
        let user = seed_user(&db).await;
        let book = seed_book(&db, 10, 150_000).await;

        store.advance_page(user, book, 3).await.unwrap();
        let paid = store.mark_paid(user, book, "ref-123").await.unwrap();
        assert_eq!(paid.current_page, 3);
        assert!(paid.has_paid);
    }

    #[tokio::test]
    async fn mark_paid_is_idempotent() {
        let db = test_db().await;
        let store = SeaOrmProgressStore::new(db.clone());
        let user = seed_user(&db).await;
        let book = seed_book(&db, 10, 150_000).await;

        let once = store.mark_paid(user, book, "ref-123").await.unwrap();
        let twice = store.mark_paid(user, book, "ref-123").await.unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn mark_paid_never_overwrites_reference() {
        let db = test_db().await;
        let store = SeaOrmProgressStore::new(db.clone());
        let user = seed_user(&db).await;
        let book = seed_book(&db, 10, 150_000).await;

        let first = store.mark_paid(user, book, "ref-first").await.unwrap();
        let second = store.mark_paid(user, book, "ref-second").await.unwrap();
        assert_eq!(second.payment_reference.as_deref(), Some("ref-first"));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn advancing_never_clears_paid_flag() {
        let db = test_db().await;
        let store = SeaOrmProgressStore::new(db.clone());
        let user = seed_user(&db).await;
        let book = seed_book(&db, 10, 150_000).await;

        store.mark_paid(user, book, "ref-123").await.unwrap();
        for page in [1, 7, 2, 10] {
            let p = store.advance_page(user, book, page).await.unwrap();
            assert!(p.has_paid);
            assert_eq!(p.current_page, page);
            assert_eq!(p.payment_reference.as_deref(), Some("ref-123"));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_advance_and_mark_paid_lose_nothing() {
        let file = file_db(4).await;
        let store = Arc::new(SeaOrmProgressStore::new(file.db.clone()));

        for round in 0..25u32 {
            let user = seed_user(&file.db).await;
            let book = seed_book(&file.db, 10, 150_000).await;
            let page = round % 10 + 1;
            let reference = format!("ref-race-{round}");

            let advance = tokio::spawn({
                let store = store.clone();
                async move { store.advance_page(user, book, page).await }
            });
            let pay = tokio::spawn({
                let store = store.clone();
                let reference = reference.clone();
                async move { store.mark_paid(user, book, &reference).await }
            });
            advance.await.unwrap().unwrap();
            pay.await.unwrap().unwrap();

            let last = store.get(user, book).await.unwrap().unwrap();
            assert!(last.has_paid, "round {round} lost the payment");
            assert_eq!(last.current_page, page, "round {round} lost the page");
            assert_eq!(last.payment_reference.as_deref(), Some(reference.as_str()));
        }
    }

    #[tokio::test]
    async fn reference_unlocks_a_single_record() {
        let db = test_db().await;
        let store = SeaOrmProgressStore::new(db.clone());
        let alice = seed_user(&db).await;
        let bob = seed_user(&db).await;
        let book_a = seed_book(&db, 10, 150_000).await;
        let book_b = seed_book(&db, 10, 100_000).await;

        store.mark_paid(alice, book_a, "ref-a").await.unwrap();

        assert_eq!(
            store.mark_paid(alice, book_b, "ref-a").await.unwrap_err(),
            StoreError::ReferenceInUse("ref-a".into())
        );
        assert_eq!(store.get(alice, book_b).await.unwrap(), None);

        store.advance_page(bob, book_a, 2).await.unwrap();
        assert_eq!(
            store.mark_paid(bob, book_a, "ref-a").await.unwrap_err(),
            StoreError::ReferenceInUse("ref-a".into())
        );
        let bob_progress = store.get(bob, book_a).await.unwrap().unwrap();
        assert!(!bob_progress.has_paid);
        assert_eq!(bob_progress.payment_reference, None);
        assert_eq!(bob_progress.current_page, 2);

        // the owner can still retry
        assert!(store.mark_paid(alice, book_a, "ref-a").await.unwrap().has_paid);
    }

    #[tokio::test]
    async fn records_are_per_viewer_and_book() {
        let db = test_db().await;
        let store = SeaOrmProgressStore::new(db.clone());
        let alice = seed_user(&db).await;
        let bob = seed_user(&db).await;
        let book_a = seed_book(&db, 10, 150_000).await;
        let book_b = seed_book(&db, 10, 150_000).await;

        store.mark_paid(alice, book_a, "ref-a").await.unwrap();
        store.advance_page(bob, book_a, 2).await.unwrap();

        assert!(!store.get(bob, book_a).await.unwrap().unwrap().has_paid);
        assert_eq!(store.get(alice, book_b).await.unwrap(), None);
    }

    #[tokio::test]
    async fn catalog_lookup() {
        let db = test_db().await;
        let catalog = SeaOrmCatalogStore::new(db.clone());
        let book = seed_book(&db, 42, 250_000).await;

        let doc = catalog.get_document(book).await.unwrap().unwrap();
        assert_eq!(doc.page_count, 42);
        assert_eq!(doc.price_minor, 250_000);
        assert_eq!(catalog.get_document(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn sessions_resolve_until_expiry() {
        let db = test_db().await;
        let sessions = SeaOrmSessionStore::new(db.clone());
        let user = seed_user(&db).await;
        seed_session(&db, user, "live-token", Utc::now() + Duration::hours(1)).await;
        seed_session(&db, user, "stale-token", Utc::now() - Duration::hours(1)).await;

        assert_eq!(sessions.identify("live-token").await.unwrap(), Some(user));
        assert_eq!(sessions.identify("stale-token").await.unwrap(), None);
        assert_eq!(sessions.identify("unknown").await.unwrap(), None);
    }
}
