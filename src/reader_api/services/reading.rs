use poem_openapi::payload::Json;
use uuid::Uuid;

use super::{message, page_from_request, unavailable};
use crate::{
    domain::models::Viewer,
    gate::{AccessGate, GateError, PageAdvance},
    reader_api::models::{
        BookProgressDto, BookProgressResponse, PageAccessResponse, ProgressUpdateRequestDto,
        ProgressUpdateResponse, ReadingProgressDto,
    },
};

pub struct ReadingService<'a> {
    pub gate: &'a AccessGate,
}

impl<'a> ReadingService<'a> {
    pub fn new(gate: &'a AccessGate) -> Self {
        Self { gate }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn check_page(&self, viewer: Viewer, book_id: Uuid, page: i64) -> PageAccessResponse {
        let page = match page_from_request(page) {
            Ok(page) => page,
            Err(e) => return PageAccessResponse::BadRequest(Json(e)),
        };
        match self.gate.check_page(viewer, book_id, page).await {
            Ok(decision) => PageAccessResponse::Ok(Json(decision.into())),
            Err(e @ GateError::InvalidPageRequest { .. }) => {
                PageAccessResponse::BadRequest(Json(message(&e)))
            }
            Err(e @ GateError::DocumentNotFound(_)) => PageAccessResponse::NotFound(Json(message(&e))),
            Err(e) => PageAccessResponse::ServiceUnavailable(Json(unavailable(&e))),
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_progress(&self, viewer: Viewer, book_id: Uuid) -> BookProgressResponse {
        match self.gate.progress_for(viewer, book_id).await {
            Ok(progress) => BookProgressResponse::Ok(Json(BookProgressDto {
                book_id,
                progress: progress.map(Into::into),
            })),
            Err(e @ GateError::DocumentNotFound(_)) => {
                BookProgressResponse::NotFound(Json(message(&e)))
            }
            Err(e) => BookProgressResponse::ServiceUnavailable(Json(unavailable(&e))),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, req))]
    pub async fn update_progress(
        &self,
        viewer: Viewer,
        req: ProgressUpdateRequestDto,
    ) -> ProgressUpdateResponse {
        let page = match page_from_request(req.current_page) {
            Ok(page) => page,
            Err(e) => return ProgressUpdateResponse::BadRequest(Json(e)),
        };
        tracing::debug!(book_id = %req.book_id, page, "handling progress update");
        match self.gate.record_page(viewer, req.book_id, page).await {
            Ok(PageAdvance::Recorded(progress)) => ProgressUpdateResponse::Ok(Json(progress.into())),
            Ok(PageAdvance::Ephemeral { page }) => {
                ProgressUpdateResponse::Ok(Json(ReadingProgressDto::ephemeral(req.book_id, page)))
            }
            Ok(PageAdvance::Denied(decision)) => {
                ProgressUpdateResponse::PaymentRequired(Json(decision.into()))
            }
            Err(e @ GateError::InvalidPageRequest { .. }) => {
                ProgressUpdateResponse::BadRequest(Json(message(&e)))
            }
            Err(e @ GateError::DocumentNotFound(_)) => {
                ProgressUpdateResponse::NotFound(Json(message(&e)))
            }
            Err(e) => ProgressUpdateResponse::ServiceUnavailable(Json(unavailable(&e))),
        }
    }
}
