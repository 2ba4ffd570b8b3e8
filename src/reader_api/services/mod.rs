pub mod health;
pub mod payment;
pub mod reading;

use crate::{gate::GateError, reader_api::models::ErrorDto};

/// Generic message for store outages; the reader is asked to retry rather than
/// being granted or denied on stale data.
pub(crate) fn unavailable(err: &GateError) -> ErrorDto {
    tracing::error!(error = %err, "progress store unavailable");
    ErrorDto {
        message: "Reading progress is temporarily unavailable, please try again".into(),
    }
}

pub(crate) fn message(err: &GateError) -> ErrorDto {
    ErrorDto {
        message: err.to_string(),
    }
}

/// Negative or oversized pages can never be in a book; they are refused with
/// the value the client sent.
pub(crate) fn page_from_request(page: i64) -> Result<u32, ErrorDto> {
    u32::try_from(page).map_err(|_| ErrorDto {
        message: format!("page {page} is not a valid page number"),
    })
}
