//! The access gate: who may read which page, and how payment unlocks the rest.

use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::{
    domain::models::{AccessDecision, Document, DocumentId, ReadingProgress, Viewer, ViewerId},
    storage::{CatalogStore, ProgressStore, StoreError},
};

pub mod payment;
pub mod policy;
pub mod session;

use payment::{PaymentConfirmation, PaymentFailure, PaymentGateway, judge_verification};
use policy::{access_state, can_view};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
    #[error("page {page} is outside 1..={page_count}")]
    InvalidPageRequest { page: u32, page_count: u32 },
    #[error("book {0} not found")]
    DocumentNotFound(DocumentId),
    #[error("viewer is not signed in")]
    NotIdentified,
}

/// Result of asking to record a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageAdvance {
    /// Identified viewer, progress persisted.
    Recorded(ReadingProgress),
    /// Anonymous viewer; allowed but nothing is stored.
    Ephemeral { page: u32 },
    /// Policy said no; nothing is stored.
    Denied(AccessDecision),
}

pub struct AccessGate {
    progress: Arc<dyn ProgressStore>,
    catalog: Arc<dyn CatalogStore>,
    gateway: Arc<dyn PaymentGateway>,
    free_page_limit: u32,
    gateway_timeout: Duration,
}

impl AccessGate {
    pub fn new(
        progress: Arc<dyn ProgressStore>,
        catalog: Arc<dyn CatalogStore>,
        gateway: Arc<dyn PaymentGateway>,
        free_page_limit: u32,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            progress,
            catalog,
            gateway,
            free_page_limit,
            gateway_timeout,
        }
    }

    async fn document(&self, document_id: DocumentId) -> Result<Document, GateError> {
        self.catalog
            .get_document(document_id)
            .await?
            .ok_or(GateError::DocumentNotFound(document_id))
    }

    fn validate_page(document: &Document, page: u32) -> Result<(), GateError> {
        if document.contains_page(page) {
            Ok(())
        } else {
            Err(GateError::InvalidPageRequest {
                page,
                page_count: document.page_count,
            })
        }
    }

    /// Anonymous viewers never reach the store.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn progress_for(
        &self,
        viewer: Viewer,
        document_id: DocumentId,
    ) -> Result<Option<ReadingProgress>, GateError> {
        self.document(document_id).await?;
        match viewer {
            Viewer::Identified(viewer_id) => Ok(self.progress.get(viewer_id, document_id).await?),
            Viewer::Anonymous => Ok(None),
        }
    }

    fn decide(
        &self,
        viewer: &Viewer,
        document_id: DocumentId,
        progress: Option<ReadingProgress>,
        page: u32,
    ) -> AccessDecision {
        let allowed = can_view(viewer, progress.as_ref(), page, self.free_page_limit);
        let state = access_state(viewer, progress.as_ref(), page, self.free_page_limit);
        tracing::debug!(?viewer, %document_id, page, allowed, ?state, "access decision");
        AccessDecision {
            document_id,
            page,
            allowed,
            state,
            free_page_limit: self.free_page_limit,
            progress,
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn check_page(
        &self,
        viewer: Viewer,
        document_id: DocumentId,
        page: u32,
    ) -> Result<AccessDecision, GateError> {
        let document = self.document(document_id).await?;
        Self::validate_page(&document, page)?;
        let progress = match viewer {
            Viewer::Identified(viewer_id) => self.progress.get(viewer_id, document_id).await?,
            Viewer::Anonymous => None,
        };
        Ok(self.decide(&viewer, document_id, progress, page))
    }

    /// Records `page` as the viewer's current page, but only once the policy allows it.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn record_page(
        &self,
        viewer: Viewer,
        document_id: DocumentId,
        page: u32,
    ) -> Result<PageAdvance, GateError> {
        let decision = self.check_page(viewer, document_id, page).await?;
        if !decision.allowed {
            tracing::info!(?viewer, %document_id, page, "page gated, progress not recorded");
            return Ok(PageAdvance::Denied(decision));
        }
        match viewer {
            Viewer::Identified(viewer_id) => {
                let progress = self.progress.advance_page(viewer_id, document_id, page).await?;
                Ok(PageAdvance::Recorded(progress))
            }
            Viewer::Anonymous => Ok(PageAdvance::Ephemeral { page }),
        }
    }

    /// Verifies `reference` with the gateway and unlocks the book on success.
    ///
    /// Gateway trouble of any kind, including the call outliving the configured
    /// timeout, is a failed confirmation and leaves the store untouched. Store
    /// failures while recording a verified payment are returned as errors.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn confirm_payment(
        &self,
        reference: &str,
        viewer_id: ViewerId,
        document_id: DocumentId,
    ) -> Result<PaymentConfirmation, GateError> {
        let document = self.document(document_id).await?;

        let verification = match tokio::time::timeout(
            self.gateway_timeout,
            self.gateway.verify_transaction(reference),
        )
        .await
        {
            Ok(Ok(v)) => v,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, %reference, "payment verification failed");
                return Ok(PaymentConfirmation::Failed(PaymentFailure::from(&e)));
            }
            Err(_) => {
                tracing::warn!(
                    %reference,
                    timeout_ms = self.gateway_timeout.as_millis() as u64,
                    "payment verification timed out"
                );
                return Ok(PaymentConfirmation::Failed(PaymentFailure::Unreachable));
            }
        };

        if let Err(failure) = judge_verification(reference, viewer_id, &document, &verification) {
            tracing::warn!(
                %reference,
                %viewer_id,
                %document_id,
                reason = failure.as_str(),
                "payment not accepted"
            );
            return Ok(PaymentConfirmation::Failed(failure));
        }

        let progress = match self.progress.mark_paid(viewer_id, document_id, reference).await {
            Ok(progress) => progress,
            Err(StoreError::ReferenceInUse(_)) => {
                tracing::warn!(%reference, %viewer_id, %document_id, "payment reference already used");
                return Ok(PaymentConfirmation::Failed(PaymentFailure::ReferenceAlreadyUsed));
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(%reference, %viewer_id, %document_id, "payment confirmed");
        Ok(PaymentConfirmation::Confirmed(progress))
    }

    /// `confirm_payment` for a resolved viewer. Anonymous viewers cannot own a purchase.
    pub async fn confirm_payment_for(
        &self,
        reference: &str,
        viewer: Viewer,
        document_id: DocumentId,
    ) -> Result<PaymentConfirmation, GateError> {
        match viewer {
            Viewer::Identified(viewer_id) => {
                self.confirm_payment(reference, viewer_id, document_id).await
            }
            Viewer::Anonymous => Err(GateError::NotIdentified),
        }
    }
}
