// Domain models, independent of the database rows and the HTTP DTOs

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub type ViewerId = Uuid;
pub type DocumentId = Uuid;

/// Who is asking. Only identified viewers ever get persisted progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Identified(ViewerId),
    Anonymous,
}

impl Viewer {
    pub fn id(&self) -> Option<ViewerId> {
        match self {
            Viewer::Identified(id) => Some(*id),
            Viewer::Anonymous => None,
        }
    }

    pub fn is_identified(&self) -> bool {
        self.id().is_some()
    }
}

/// A readable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub page_count: u32,
    /// Smallest currency unit (kobo for NGN)
    pub price_minor: i64,
    pub currency: String,
}

impl Document {
    pub fn contains_page(&self, page: u32) -> bool {
        (1..=self.page_count).contains(&page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingProgress {
    pub viewer_id: ViewerId,
    pub document_id: DocumentId,
    /// Last page reached, always >= 1
    pub current_page: u32,
    /// Flips false -> true once and stays there
    pub has_paid: bool,
    pub payment_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub last_accessed_at: DateTime<Utc>,
}

/// Where a viewer stands for one document and one requested page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    /// Requested page is within the free page limit and nothing has been paid.
    Browsing,
    /// Requested page is beyond the free page limit and nothing has been paid.
    Gated,
    /// Paid; every page is open.
    Unlocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub document_id: DocumentId,
    pub page: u32,
    pub allowed: bool,
    pub state: AccessState,
    pub free_page_limit: u32,
    pub progress: Option<ReadingProgress>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_identity() {
        let id = Uuid::new_v4();
        assert_eq!(Viewer::Identified(id).id(), Some(id));
        assert!(Viewer::Identified(id).is_identified());
        assert_eq!(Viewer::Anonymous.id(), None);
        assert!(!Viewer::Anonymous.is_identified());
    }

    #[test]
    fn document_page_bounds() {
        let doc = Document {
            id: Uuid::new_v4(),
            title: "Bounds".into(),
            page_count: 10,
            price_minor: 150_000,
            currency: "NGN".into(),
        };
        assert!(!doc.contains_page(0));
        assert!(doc.contains_page(1));
        assert!(doc.contains_page(10));
        assert!(!doc.contains_page(11));
    }
}
