//! Payment gateway seam and the rules for accepting a verified transaction.

use thiserror::Error;

use uuid::Uuid;

use crate::domain::models::{Document, ReadingProgress, ViewerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Success,
    Failure,
}

/// What the gateway says about one transaction reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionVerification {
    pub status: TransactionStatus,
    /// Smallest currency unit
    pub attributed_amount: i64,
    pub attributed_reference: String,
    pub currency: Option<String>,
    /// Purchase the payment was started for, as carried in the transaction metadata.
    pub attributed_viewer: Option<String>,
    pub attributed_document: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Transport failure or timeout
    #[error("payment gateway unreachable: {0}")]
    Unreachable(String),
    #[error("malformed payment gateway response: {0}")]
    Malformed(String),
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn verify_transaction(
        &self,
        reference: &str,
    ) -> Result<TransactionVerification, GatewayError>;
}

/// Why a confirmation did not unlock the book. Only used for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentFailure {
    Rejected,
    ReferenceMismatch,
    Underpaid { paid: i64, required: i64 },
    CurrencyMismatch { paid: Option<String>, required: String },
    /// Paid for another book.
    DocumentMismatch,
    /// Paid by or for another reader.
    ViewerMismatch,
    /// Reference already unlocked some other purchase.
    ReferenceAlreadyUsed,
    Unreachable,
    Malformed,
}

impl PaymentFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentFailure::Rejected => "rejected",
            PaymentFailure::ReferenceMismatch => "reference_mismatch",
            PaymentFailure::Underpaid { .. } => "underpaid",
            PaymentFailure::CurrencyMismatch { .. } => "currency_mismatch",
            PaymentFailure::DocumentMismatch => "document_mismatch",
            PaymentFailure::ViewerMismatch => "viewer_mismatch",
            PaymentFailure::ReferenceAlreadyUsed => "reference_already_used",
            PaymentFailure::Unreachable => "unreachable",
            PaymentFailure::Malformed => "malformed",
        }
    }
}

impl From<&GatewayError> for PaymentFailure {
    fn from(err: &GatewayError) -> Self {
        match err {
            GatewayError::Unreachable(_) => PaymentFailure::Unreachable,
            GatewayError::Malformed(_) => PaymentFailure::Malformed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentConfirmation {
    Confirmed(ReadingProgress),
    Failed(PaymentFailure),
}

impl PaymentConfirmation {
    pub fn success(&self) -> bool {
        matches!(self, PaymentConfirmation::Confirmed(_))
    }

    pub fn progress(&self) -> Option<&ReadingProgress> {
        match self {
            PaymentConfirmation::Confirmed(p) => Some(p),
            PaymentConfirmation::Failed(_) => None,
        }
    }
}

fn attributed_to(attributed: Option<&str>, expected: Uuid) -> bool {
    attributed
        .and_then(|id| Uuid::parse_str(id.trim()).ok())
        .is_some_and(|id| id == expected)
}

/// Anything short of a successful, fully paid transaction made for this
/// viewer and this book, in the book's currency, is a failure.
pub fn judge_verification(
    reference: &str,
    viewer_id: ViewerId,
    document: &Document,
    verification: &TransactionVerification,
) -> Result<(), PaymentFailure> {
    if verification.status != TransactionStatus::Success {
        return Err(PaymentFailure::Rejected);
    }
    if verification.attributed_reference != reference {
        return Err(PaymentFailure::ReferenceMismatch);
    }
    let currency_matches = verification
        .currency
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case(&document.currency));
    if !currency_matches {
        return Err(PaymentFailure::CurrencyMismatch {
            paid: verification.currency.clone(),
            required: document.currency.clone(),
        });
    }
    if verification.attributed_amount < document.price_minor {
        return Err(PaymentFailure::Underpaid {
            paid: verification.attributed_amount,
            required: document.price_minor,
        });
    }
    if !attributed_to(verification.attributed_document.as_deref(), document.id) {
        return Err(PaymentFailure::DocumentMismatch);
    }
    if !attributed_to(verification.attributed_viewer.as_deref(), viewer_id) {
        return Err(PaymentFailure::ViewerMismatch);
    }
    Ok(())
}
