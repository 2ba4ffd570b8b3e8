use poem_openapi::payload::Json;

use super::{message, unavailable};
use crate::{
    domain::models::Viewer,
    gate::{AccessGate, GateError},
    reader_api::models::{ErrorDto, VerifyPaymentRequestDto, VerifyPaymentResponse},
};

pub struct PaymentService<'a> {
    pub gate: &'a AccessGate,
}

impl<'a> PaymentService<'a> {
    pub fn new(gate: &'a AccessGate) -> Self {
        Self { gate }
    }

    #[tracing::instrument(level = "debug", skip(self, req), fields(book_id = %req.book_id))]
    pub async fn verify(&self, viewer: Viewer, req: VerifyPaymentRequestDto) -> VerifyPaymentResponse {
        let reference = req.reference.trim();
        if reference.is_empty() {
            return VerifyPaymentResponse::BadRequest(Json(ErrorDto {
                message: "Payment reference is required".into(),
            }));
        }

        match self
            .gate
            .confirm_payment_for(reference, viewer, req.book_id)
            .await
        {
            Ok(confirmation) if confirmation.success() => {
                VerifyPaymentResponse::Ok(Json(confirmation.into()))
            }
            Ok(confirmation) => VerifyPaymentResponse::PaymentRequired(Json(confirmation.into())),
            Err(GateError::NotIdentified) => VerifyPaymentResponse::Unauthorized(Json(ErrorDto {
                message: "Please login to purchase this book".into(),
            })),
            Err(e @ GateError::DocumentNotFound(_)) => {
                VerifyPaymentResponse::NotFound(Json(message(&e)))
            }
            Err(e @ GateError::InvalidPageRequest { .. }) => {
                VerifyPaymentResponse::BadRequest(Json(message(&e)))
            }
            Err(e) => VerifyPaymentResponse::ServiceUnavailable(Json(unavailable(&e))),
        }
    }
}
