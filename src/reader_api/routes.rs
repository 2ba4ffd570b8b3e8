use std::sync::Arc;

use poem::Request;
use poem_openapi::{
    OpenApi,
    param::Path,
    payload::{Json, PlainText},
};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use super::models::{
    BookProgressResponse, PageAccessResponse, ProgressUpdateRequestDto, ProgressUpdateResponse,
    VerifyPaymentRequestDto, VerifyPaymentResponse,
};
use super::services::{health::HealthService, payment::PaymentService, reading::ReadingService};
use crate::{
    domain::models::Viewer,
    gate::{
        AccessGate,
        session::{Authenticator, RequestContext, resolve_viewer},
    },
};

pub struct BookGateApi {
    pub gate: Arc<AccessGate>,
    pub authenticator: Arc<dyn Authenticator>,
    pub db: Arc<DatabaseConnection>,
}

impl BookGateApi {
    async fn viewer(&self, req: &Request) -> Viewer {
        let ctx = RequestContext {
            authorization: req.header("Authorization"),
        };
        resolve_viewer(self.authenticator.as_ref(), ctx).await
    }
}

#[OpenApi]
impl BookGateApi {
    #[oai(path = "/health", method = "get")]
    #[tracing::instrument(level = "debug", skip(self))]
    async fn health(&self) -> PlainText<String> {
        HealthService::new(&self.db).status_text().await
    }

    /// Whether the current reader may view a page
    #[oai(path = "/api/books/:book_id/pages/:page", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, req, book_id, page))]
    async fn check_page(&self, req: &Request, book_id: Path<Uuid>, page: Path<i64>) -> PageAccessResponse {
        let viewer = self.viewer(req).await;
        ReadingService::new(&self.gate)
            .check_page(viewer, book_id.0, page.0)
            .await
    }

    /// Reading progress of the current reader for a book
    #[oai(path = "/api/book-purchase/:book_id", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, req, book_id))]
    async fn get_progress(&self, req: &Request, book_id: Path<Uuid>) -> BookProgressResponse {
        let viewer = self.viewer(req).await;
        ReadingService::new(&self.gate)
            .get_progress(viewer, book_id.0)
            .await
    }

    /// Record the page the reader moved to
    #[oai(path = "/api/book-purchase/progress", method = "put")]
    #[tracing::instrument(level = "debug", skip(self, req, body))]
    async fn update_progress(
        &self,
        req: &Request,
        body: Json<ProgressUpdateRequestDto>,
    ) -> ProgressUpdateResponse {
        let viewer = self.viewer(req).await;
        ReadingService::new(&self.gate)
            .update_progress(viewer, body.0)
            .await
    }

    /// Verify a completed gateway payment and unlock the book
    #[oai(path = "/api/verify-book-payment", method = "post")]
    #[tracing::instrument(level = "debug", skip(self, req, body))]
    async fn verify_book_payment(
        &self,
        req: &Request,
        body: Json<VerifyPaymentRequestDto>,
    ) -> VerifyPaymentResponse {
        let viewer = self.viewer(req).await;
        PaymentService::new(&self.gate).verify(viewer, body.0).await
    }
}
