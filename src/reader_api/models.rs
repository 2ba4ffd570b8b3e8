use chrono::{DateTime, Utc};
use poem_openapi::{ApiResponse, Enum, Object, payload::Json};
use uuid::Uuid;

use crate::{
    domain::models::{AccessDecision, AccessState, ReadingProgress},
    gate::payment::PaymentConfirmation,
};

#[derive(Debug, Clone, Object)]
pub struct ErrorDto {
    /// Human-readable error message
    pub message: String,
}

impl From<String> for ErrorDto {
    fn from(message: String) -> Self {
        ErrorDto { message }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
#[oai(rename_all = "lowercase")]
pub enum AccessStateDto {
    Browsing,
    Gated,
    Unlocked,
}

impl From<AccessState> for AccessStateDto {
    fn from(state: AccessState) -> Self {
        match state {
            AccessState::Browsing => AccessStateDto::Browsing,
            AccessState::Gated => AccessStateDto::Gated,
            AccessState::Unlocked => AccessStateDto::Unlocked,
        }
    }
}

#[derive(Debug, Clone, Object)]
#[oai(rename_all = "camelCase")]
pub struct ReadingProgressDto {
    pub book_id: Uuid,
    pub current_page: u32,
    pub has_paid: bool,
    pub payment_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    /// False for anonymous readers, whose progress only lives in the client
    pub persisted: bool,
}

impl ReadingProgressDto {
    pub fn ephemeral(book_id: Uuid, page: u32) -> Self {
        Self {
            book_id,
            current_page: page,
            has_paid: false,
            payment_reference: None,
            paid_at: None,
            last_accessed_at: None,
            persisted: false,
        }
    }
}

impl From<ReadingProgress> for ReadingProgressDto {
    fn from(p: ReadingProgress) -> Self {
        Self {
            book_id: p.document_id,
            current_page: p.current_page,
            has_paid: p.has_paid,
            payment_reference: p.payment_reference,
            paid_at: p.paid_at,
            last_accessed_at: Some(p.last_accessed_at),
            persisted: true,
        }
    }
}

#[derive(Debug, Clone, Object)]
#[oai(rename_all = "camelCase")]
pub struct AccessDecisionDto {
    pub book_id: Uuid,
    pub page: u32,
    pub allowed: bool,
    pub state: AccessStateDto,
    pub free_page_limit: u32,
    pub has_paid: bool,
    pub current_page: Option<u32>,
}

impl From<AccessDecision> for AccessDecisionDto {
    fn from(d: AccessDecision) -> Self {
        Self {
            book_id: d.document_id,
            page: d.page,
            allowed: d.allowed,
            state: d.state.into(),
            free_page_limit: d.free_page_limit,
            has_paid: d.progress.as_ref().is_some_and(|p| p.has_paid),
            current_page: d.progress.as_ref().map(|p| p.current_page),
        }
    }
}

#[derive(Debug, Clone, Object)]
#[oai(rename_all = "camelCase")]
pub struct BookProgressDto {
    pub book_id: Uuid,
    /// Absent for anonymous readers and for books never opened
    pub progress: Option<ReadingProgressDto>,
}

#[derive(Debug, Clone, Object)]
#[oai(rename_all = "camelCase")]
pub struct ProgressUpdateRequestDto {
    pub book_id: Uuid,
    pub current_page: i64,
}

#[derive(Debug, Clone, Object)]
#[oai(rename_all = "camelCase")]
pub struct VerifyPaymentRequestDto {
    /// Gateway transaction reference
    pub reference: String,
    pub book_id: Uuid,
}

#[derive(Debug, Clone, Object)]
#[oai(rename_all = "camelCase")]
pub struct PaymentConfirmationDto {
    pub success: bool,
    /// Failure reason, for support and diagnostics
    pub reason: Option<String>,
    pub progress: Option<ReadingProgressDto>,
}

impl From<PaymentConfirmation> for PaymentConfirmationDto {
    fn from(c: PaymentConfirmation) -> Self {
        match c {
            PaymentConfirmation::Confirmed(progress) => Self {
                success: true,
                reason: None,
                progress: Some(progress.into()),
            },
            PaymentConfirmation::Failed(failure) => Self {
                success: false,
                reason: Some(failure.as_str().to_string()),
                progress: None,
            },
        }
    }
}

#[derive(ApiResponse)]
pub enum PageAccessResponse {
    /// Access decision; `allowed` is false when the page is behind the paywall
    #[oai(status = 200)]
    Ok(Json<AccessDecisionDto>),

    /// Page outside the book
    #[oai(status = 400)]
    BadRequest(Json<ErrorDto>),

    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),

    /// Progress store unavailable, try again
    #[oai(status = 503)]
    ServiceUnavailable(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum BookProgressResponse {
    /// Progress for the current reader, if any
    #[oai(status = 200)]
    Ok(Json<BookProgressDto>),

    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),

    #[oai(status = 503)]
    ServiceUnavailable(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum ProgressUpdateResponse {
    /// Page recorded (or echoed back for anonymous readers)
    #[oai(status = 200)]
    Ok(Json<ReadingProgressDto>),

    #[oai(status = 400)]
    BadRequest(Json<ErrorDto>),

    /// Page is behind the paywall; nothing recorded
    #[oai(status = 402)]
    PaymentRequired(Json<AccessDecisionDto>),

    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),

    #[oai(status = 503)]
    ServiceUnavailable(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum VerifyPaymentResponse {
    /// Payment verified, book unlocked
    #[oai(status = 200)]
    Ok(Json<PaymentConfirmationDto>),

    #[oai(status = 400)]
    BadRequest(Json<ErrorDto>),

    /// Sign in required to buy a book
    #[oai(status = 401)]
    Unauthorized(Json<ErrorDto>),

    /// Payment could not be verified; the reader may retry
    #[oai(status = 402)]
    PaymentRequired(Json<PaymentConfirmationDto>),

    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),

    #[oai(status = 503)]
    ServiceUnavailable(Json<ErrorDto>),
}
