// Persistence seams for the access gate; sea-orm implementations live in `sea`

use thiserror::Error;

use crate::domain::models::{Document, DocumentId, ReadingProgress, ViewerId};

pub mod sea;

pub use sea::{SeaOrmCatalogStore, SeaOrmProgressStore, SeaOrmSessionStore};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Read or write could not be completed; nothing may be assumed written.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The payment reference is already recorded against another record.
    #[error("payment reference {0} already used")]
    ReferenceInUse(String),
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// One reading-progress record per (viewer, document).
///
/// `advance_page` and `mark_paid` are the only write paths. Neither re-checks
/// the access policy; callers decide before writing.
#[async_trait::async_trait]
pub trait ProgressStore: Send + Sync {
    async fn get(
        &self,
        viewer_id: ViewerId,
        document_id: DocumentId,
    ) -> StoreResult<Option<ReadingProgress>>;

    /// Creates the row (unpaid) on first call, otherwise moves `current_page`.
    /// Never touches the paid columns.
    async fn advance_page(
        &self,
        viewer_id: ViewerId,
        document_id: DocumentId,
        page: u32,
    ) -> StoreResult<ReadingProgress>;

    /// Idempotent. An already-paid record is returned unchanged, including its
    /// first payment reference. A reference recorded against any other
    /// (viewer, document) fails with `StoreError::ReferenceInUse`.
    async fn mark_paid(
        &self,
        viewer_id: ViewerId,
        document_id: DocumentId,
        payment_reference: &str,
    ) -> StoreResult<ReadingProgress>;
}

#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_document(&self, document_id: DocumentId) -> StoreResult<Option<Document>>;
}
